use std::ffi::CString;
use std::path::Path;
use std::ptr;
use std::sync::Once;

use gdal_sys::{self, CPLErr, GDALDriverH};

use crate::cpl::CslStringList;
use crate::dataset::Dataset;
use crate::raster::DataType;
use crate::utils::{_last_cpl_err, _last_null_pointer_err, _path_to_c_string, _string};

use crate::errors::*;

static START: Once = Once::new();

pub fn _register_drivers() {
    START.call_once(|| unsafe {
        gdal_sys::GDALAllRegister();
    });
}

/// A GDAL format driver, looked up by its short name (`GTiff`, `MEM`, `PNG`, ...).
#[allow(missing_copy_implementations)]
pub struct Driver {
    c_driver: GDALDriverH,
}

impl Driver {
    pub fn get_by_name(name: &str) -> Result<Driver> {
        _register_drivers();
        let c_name = CString::new(name)?;
        let c_driver = unsafe { gdal_sys::GDALGetDriverByName(c_name.as_ptr()) };
        if c_driver.is_null() {
            return Err(_last_null_pointer_err("GDALGetDriverByName"));
        };
        Ok(Driver { c_driver })
    }

    /// Creates a new Driver object by wrapping a C pointer
    ///
    /// # Safety
    /// This method operates on a raw C pointer
    pub unsafe fn from_c_driver(c_driver: GDALDriverH) -> Driver {
        Driver { c_driver }
    }

    pub fn short_name(&self) -> String {
        let rv = unsafe { gdal_sys::GDALGetDriverShortName(self.c_driver) };
        _string(rv)
    }

    pub fn metadata_item(&self, key: &str) -> Option<String> {
        let c_key = CString::new(key).ok()?;
        let c_res =
            unsafe { gdal_sys::GDALGetMetadataItem(self.c_driver, c_key.as_ptr(), ptr::null()) };
        if c_res.is_null() {
            None
        } else {
            Some(_string(c_res))
        }
    }

    /// The file extension this driver writes, without the leading dot.
    /// `None` for drivers that do not advertise one.
    pub fn extension(&self) -> Option<String> {
        self.metadata_item("DMD_EXTENSION")
            .filter(|extension| !extension.is_empty())
    }

    /// Whether the driver implements `Create`. Drivers without it (PNG, JPEG, ...)
    /// can only be written through [`Driver::create_copy`].
    pub fn supports_create(&self) -> bool {
        self.metadata_item("DCAP_CREATE")
            .is_some_and(|value| value.eq_ignore_ascii_case("YES"))
    }

    pub fn create<P: AsRef<Path>>(
        &self,
        filename: P,
        size: (usize, usize),
        bands: usize,
        data_type: DataType,
        options: &CslStringList,
    ) -> Result<Dataset> {
        let c_filename = _path_to_c_string(filename)?;
        let c_dataset = unsafe {
            gdal_sys::GDALCreate(
                self.c_driver,
                c_filename.as_ptr(),
                size.0 as i32,
                size.1 as i32,
                bands as i32,
                data_type.gdal_type(),
                options.as_ptr(),
            )
        };

        if c_dataset.is_null() {
            return Err(_last_null_pointer_err("GDALCreate"));
        };

        Ok(unsafe { Dataset::from_c_dataset(c_dataset) })
    }

    /// Create an in-memory style dataset with no name, used with the `MEM` driver.
    pub fn create_anonymous(
        &self,
        size: (usize, usize),
        bands: usize,
        data_type: DataType,
    ) -> Result<Dataset> {
        self.create("", size, bands, data_type, &CslStringList::new())
    }

    pub fn create_vector_only<P: AsRef<Path>>(&self, filename: P) -> Result<Dataset> {
        self.create(
            filename,
            (0, 0),
            0,
            DataType::unknown(),
            &CslStringList::new(),
        )
    }

    pub fn create_copy<P: AsRef<Path>>(
        &self,
        filename: P,
        source: &Dataset,
        options: &CslStringList,
    ) -> Result<Dataset> {
        let c_filename = _path_to_c_string(filename)?;
        let c_dataset = unsafe {
            gdal_sys::GDALCreateCopy(
                self.c_driver,
                c_filename.as_ptr(),
                source.c_dataset(),
                0,
                options.as_ptr(),
                None,
                ptr::null_mut(),
            )
        };
        if c_dataset.is_null() {
            return Err(_last_null_pointer_err("GDALCreateCopy"));
        }
        Ok(unsafe { Dataset::from_c_dataset(c_dataset) })
    }

    /// Delete a dataset and all its sidecar files (`.shx`, `.dbf`, ... for shapefiles).
    pub fn delete<P: AsRef<Path>>(&self, filename: P) -> Result<()> {
        let c_filename = _path_to_c_string(filename)?;
        let rv = unsafe { gdal_sys::GDALDeleteDataset(self.c_driver, c_filename.as_ptr()) };
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Driver({})", self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_driver() {
        let driver = Driver::get_by_name("GTiff").unwrap();
        assert_eq!(driver.short_name(), "GTiff");
        assert_eq!(driver.extension().as_deref(), Some("tif"));
        assert!(driver.supports_create());
    }

    #[test]
    fn test_missing_driver() {
        assert!(Driver::get_by_name("NoSuchDriver").is_err());
    }

    #[test]
    fn test_mem_driver_has_no_extension() {
        let driver = Driver::get_by_name("MEM").unwrap();
        assert_eq!(driver.extension(), None);
    }
}
