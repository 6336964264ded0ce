use std::ffi::CString;
use std::path::Path;

use gdal_sys::{self, CPLErr, GDALAccess, GDALDatasetH};

use crate::driver::{Driver, _register_drivers};
use crate::geo_transform::GeoTransform;
use crate::raster::RasterBand;
use crate::utils::{_last_cpl_err, _last_null_pointer_err, _path_to_c_string, _string};

use crate::errors::*;

/// An open GDAL dataset. Closed with `GDALClose` when dropped.
#[derive(Debug)]
pub struct Dataset {
    c_dataset: GDALDatasetH,
}

// GDAL Docs state: The returned dataset should only be accessed by one thread at a time.
unsafe impl Send for Dataset {}

impl Dataset {
    /// Returns the wrapped C pointer
    ///
    /// # Safety
    /// This method returns a raw C pointer
    pub unsafe fn c_dataset(&self) -> GDALDatasetH {
        self.c_dataset
    }

    /// Creates a new Dataset by wrapping a C pointer
    ///
    /// # Safety
    /// This method operates on a raw C pointer
    pub unsafe fn from_c_dataset(c_dataset: GDALDatasetH) -> Dataset {
        Dataset { c_dataset }
    }

    /// Open a dataset read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        _register_drivers();
        let c_filename = _path_to_c_string(path)?;
        let c_dataset =
            unsafe { gdal_sys::GDALOpen(c_filename.as_ptr(), GDALAccess::GA_ReadOnly) };
        if c_dataset.is_null() {
            return Err(_last_null_pointer_err("GDALOpen"));
        }
        Ok(Dataset { c_dataset })
    }

    pub fn driver(&self) -> Driver {
        unsafe {
            let c_driver = gdal_sys::GDALGetDatasetDriver(self.c_dataset);
            Driver::from_c_driver(c_driver)
        }
    }

    pub fn projection(&self) -> String {
        let rv = unsafe { gdal_sys::GDALGetProjectionRef(self.c_dataset) };
        _string(rv)
    }

    pub fn set_projection(&self, projection: &str) -> Result<()> {
        let c_projection = CString::new(projection)?;
        let rv = unsafe { gdal_sys::GDALSetProjection(self.c_dataset, c_projection.as_ptr()) };
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }
        Ok(())
    }

    /// Fetch a band object for a dataset. Band indices start at 1.
    pub fn rasterband(&self, band_index: usize) -> Result<RasterBand> {
        unsafe {
            let c_band = gdal_sys::GDALGetRasterBand(self.c_dataset, band_index as i32);
            if c_band.is_null() {
                return Err(_last_null_pointer_err("GDALGetRasterBand"));
            }
            Ok(RasterBand::from_c_rasterband(self, c_band))
        }
    }

    pub fn raster_count(&self) -> usize {
        (unsafe { gdal_sys::GDALGetRasterCount(self.c_dataset) }) as usize
    }

    pub fn raster_size(&self) -> (usize, usize) {
        let size_x = unsafe { gdal_sys::GDALGetRasterXSize(self.c_dataset) } as usize;
        let size_y = unsafe { gdal_sys::GDALGetRasterYSize(self.c_dataset) } as usize;
        (size_x, size_y)
    }

    /// Set the affine transformation coefficients.
    ///
    /// See [`GeoTransform`] for the meaning of the six coefficients.
    pub fn set_geo_transform(&self, transformation: &GeoTransform) -> Result<()> {
        let rv = unsafe {
            gdal_sys::GDALSetGeoTransform(self.c_dataset, transformation.as_ptr() as *mut f64)
        };
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }
        Ok(())
    }

    /// Get the affine transformation coefficients.
    ///
    /// Fails for datasets that carry no georeferencing.
    pub fn geo_transform(&self) -> Result<GeoTransform> {
        let mut transformation = GeoTransform::default();
        let rv =
            unsafe { gdal_sys::GDALGetGeoTransform(self.c_dataset, transformation.as_mut_ptr()) };

        // check if the dataset has a GeoTransform
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }
        Ok(transformation)
    }

    /// Write any cached blocks to disk.
    pub fn flush_cache(&self) {
        unsafe {
            gdal_sys::GDALFlushCache(self.c_dataset);
        }
    }
}

impl Drop for Dataset {
    fn drop(&mut self) {
        unsafe {
            gdal_sys::GDALClose(self.c_dataset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::DataType;

    #[test]
    fn test_open_missing() {
        let _quiet = crate::test_utils::SuppressGDALErrorLog::new();
        assert!(Dataset::open("/no/such/file.tif").is_err());
    }

    #[test]
    fn test_geo_transform_round_trip() {
        let driver = Driver::get_by_name("MEM").unwrap();
        let dataset = driver
            .create_anonymous((20, 10), 2, DataType::from_name("Byte").unwrap())
            .unwrap();
        assert_eq!(dataset.raster_size(), (20, 10));
        assert_eq!(dataset.raster_count(), 2);

        let transform = [100.0, 2.0, 0.0, 50.0, 0.0, -2.0];
        dataset.set_geo_transform(&transform).unwrap();
        assert_eq!(dataset.geo_transform().unwrap(), transform);
        assert_eq!(dataset.driver().short_name(), "MEM");
    }
}
