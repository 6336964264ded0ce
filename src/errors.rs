use std::ffi::NulError;
use std::path::PathBuf;

use gdal_sys::{CPLErr, OGRErr};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetileError>;

#[derive(Debug, Error)]
pub enum RetileError {
    #[error("FfiNulError")]
    FfiNulError(#[from] NulError),
    #[error("FfiIntoStringError")]
    FfiIntoStringError(#[from] std::ffi::IntoStringError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("CPL error class: '{class:?}', error number: '{number}', error msg: '{msg}'")]
    CplError {
        class: CplErrType,
        number: i32,
        msg: String,
    },
    #[error("GDAL method '{method_name}' returned a NULL pointer. Error msg: '{msg}'")]
    NullPointer {
        method_name: &'static str,
        msg: String,
    },
    #[error("OGR method '{method_name}' returned error: '{err:?}'")]
    OgrError {
        err: OGRErr::Type,
        method_name: &'static str,
    },
    #[error("Bad argument: {0}")]
    BadArgument(String),
    #[error("'{}' has no usable north-up geotransform", path.display())]
    InvalidGeoTransform { path: PathBuf },
    #[error("No input files to retile")]
    NoInputs,
    #[error("Reprojection failed for '{tile}': {msg}")]
    ReprojectFailed { tile: String, msg: String },
}

/// Severity of a message reported by GDAL's CPL error machinery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CplErrType {
    None,
    Debug,
    Warning,
    Failure,
    Fatal,
}

impl From<CPLErr::Type> for CplErrType {
    fn from(error_type: CPLErr::Type) -> Self {
        match error_type {
            CPLErr::CE_None => Self::None,
            CPLErr::CE_Debug => Self::Debug,
            CPLErr::CE_Warning => Self::Warning,
            CPLErr::CE_Failure => Self::Failure,
            CPLErr::CE_Fatal => Self::Fatal,
            _ => Self::None,
        }
    }
}
