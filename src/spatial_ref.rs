use std::ffi::{c_char, c_void, CString};
use std::ptr;

use gdal_sys::{OGRErr, OGRSpatialReferenceH};

use crate::errors::*;
use crate::utils::{_last_null_pointer_err, _string};

/// An OGR spatial reference system. Released with `OSRRelease` on drop.
#[derive(Debug)]
pub struct SpatialRef(OGRSpatialReferenceH);

impl Drop for SpatialRef {
    fn drop(&mut self) {
        unsafe { gdal_sys::OSRRelease(self.0) };
        self.0 = ptr::null_mut();
    }
}

impl Clone for SpatialRef {
    fn clone(&self) -> SpatialRef {
        let n_obj = unsafe { gdal_sys::OSRClone(self.0) };
        SpatialRef(n_obj)
    }
}

impl SpatialRef {
    /// Parse anything `OSRSetFromUserInput` accepts: `EPSG:4326`, WKT, PROJ strings,
    /// or the path of a `.prj` file.
    pub fn from_definition(definition: &str) -> Result<SpatialRef> {
        let c_obj = unsafe { gdal_sys::OSRNewSpatialReference(ptr::null()) };
        if c_obj.is_null() {
            return Err(_last_null_pointer_err("OSRNewSpatialReference"));
        }
        let srs = SpatialRef(c_obj);
        let c_definition = CString::new(definition)?;
        let rv = unsafe { gdal_sys::OSRSetFromUserInput(srs.0, c_definition.as_ptr()) };
        if rv != OGRErr::OGRERR_NONE {
            return Err(RetileError::OgrError {
                err: rv,
                method_name: "OSRSetFromUserInput",
            });
        }
        Ok(srs)
    }

    pub fn from_wkt(wkt: &str) -> Result<SpatialRef> {
        let c_str = CString::new(wkt)?;
        let c_obj = unsafe { gdal_sys::OSRNewSpatialReference(c_str.as_ptr()) };
        if c_obj.is_null() {
            return Err(_last_null_pointer_err("OSRNewSpatialReference"));
        }
        Ok(SpatialRef(c_obj))
    }

    pub fn to_wkt(&self) -> Result<String> {
        let mut c_wkt: *mut c_char = ptr::null_mut();
        let rv = unsafe { gdal_sys::OSRExportToWkt(self.0, &mut c_wkt) };
        let res = if rv != OGRErr::OGRERR_NONE {
            Err(RetileError::OgrError {
                err: rv,
                method_name: "OSRExportToWkt",
            })
        } else {
            Ok(_string(c_wkt))
        };
        unsafe { gdal_sys::VSIFree(c_wkt as *mut c_void) };
        res
    }

    /// Returns the wrapped C pointer
    ///
    /// # Safety
    /// The handle stays owned by `self`.
    pub unsafe fn to_c_hsrs(&self) -> OGRSpatialReferenceH {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_definition() {
        let srs = SpatialRef::from_definition("EPSG:4326").unwrap();
        let wkt = srs.to_wkt().unwrap();
        assert!(wkt.starts_with("GEOGCS[\"WGS 84\""));

        let copy = SpatialRef::from_wkt(&wkt).unwrap().clone();
        assert_eq!(copy.to_wkt().unwrap(), wkt);
    }

    #[test]
    fn test_bad_definition() {
        let _quiet = crate::test_utils::SuppressGDALErrorLog::new();
        assert!(SpatialRef::from_definition("not a srs").is_err());
    }
}
