//! GDAL Configuration Functions
//!
//! Runtime configuration of the GDAL library and the bridge that forwards GDAL's
//! own diagnostics into `tracing`.
//!
//! ```
//! use gdal_retile::config::*;
//!
//! set_config_option("GDAL_CACHEMAX", "512").unwrap();
//! ```

use std::ffi::{c_char, CString};

use gdal_sys::{CPLErr, CPLErrorNum};

use crate::errors::{CplErrType, Result};
use crate::utils::_string;

/// Set a GDAL library configuration option
///
/// Refer to [GDAL `ConfigOptions`](https://gdal.org/user/configoptions.html) for
/// a full list of options.
pub fn set_config_option(key: &str, value: &str) -> Result<()> {
    let c_key = CString::new(key.as_bytes())?;
    let c_val = CString::new(value.as_bytes())?;
    unsafe {
        gdal_sys::CPLSetConfigOption(c_key.as_ptr(), c_val.as_ptr());
    };
    Ok(())
}

unsafe extern "C" fn tracing_error_handler(
    error_type: CPLErr::Type,
    error_num: CPLErrorNum,
    error_msg_ptr: *const c_char,
) {
    let msg = _string(error_msg_ptr);
    match CplErrType::from(error_type) {
        CplErrType::None => {}
        CplErrType::Debug => tracing::debug!(target: "gdal", code = error_num, "{msg}"),
        CplErrType::Warning => tracing::warn!(target: "gdal", code = error_num, "{msg}"),
        CplErrType::Failure | CplErrType::Fatal => {
            tracing::error!(target: "gdal", code = error_num, "{msg}")
        }
    }
}

/// Route every message GDAL reports through its CPL error handler into `tracing`,
/// replacing the default handler that prints to stderr.
pub fn install_tracing_error_handler() {
    unsafe {
        gdal_sys::CPLSetErrorHandler(Some(tracing_error_handler));
    };
}

/// Uninstall the `tracing` bridge. GDAL messages are no longer forwarded.
pub fn remove_error_handler() {
    unsafe {
        gdal_sys::CPLSetErrorHandler(None);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_value(key: &str) -> String {
        let c_key = CString::new(key).unwrap();
        let c_default = CString::new("DEFAULT").unwrap();
        _string(unsafe { gdal_sys::CPLGetConfigOption(c_key.as_ptr(), c_default.as_ptr()) })
    }

    #[test]
    fn test_set_option() {
        assert_eq!(current_value("GDAL_RETILE_TEST_OPTION"), "DEFAULT");
        assert!(set_config_option("GDAL_RETILE_TEST_OPTION", "ON").is_ok());
        assert_eq!(current_value("GDAL_RETILE_TEST_OPTION"), "ON");
        assert!(set_config_option("BAD\0KEY", "ON").is_err());
    }
}
