use std::ffi::c_void;
use std::marker::PhantomData;
use std::path::Path;

use crate::cpl::CslStringList;
use crate::dataset::Dataset;
use crate::driver::Driver;
use crate::raster::{DataType, RasterBuffer};

/// Scoped value for temporarily suppressing thread-local GDAL log messages.
///
/// Useful for tests that expect GDAL errors and want to keep the output log clean
/// of distracting yet expected error messages.
pub(crate) struct SuppressGDALErrorLog {
    // Make !Sync and !Send, and force use of `new`.
    _private: PhantomData<*mut c_void>,
}

impl SuppressGDALErrorLog {
    pub(crate) fn new() -> Self {
        unsafe { gdal_sys::CPLPushErrorHandler(Some(gdal_sys::CPLQuietErrorHandler)) };
        SuppressGDALErrorLog {
            _private: PhantomData,
        }
    }
}

impl Drop for SuppressGDALErrorLog {
    fn drop(&mut self) {
        unsafe { gdal_sys::CPLPopErrorHandler() };
    }
}

/// Write a single band north-up Byte GeoTIFF with unit pixels, its upper-left corner
/// at `origin` and every pixel set to `value`. Zero is declared as nodata.
pub(crate) fn write_byte_raster(
    path: &Path,
    origin: (f64, f64),
    size: (usize, usize),
    value: u8,
) -> Dataset {
    let driver = Driver::get_by_name("GTiff").unwrap();
    let byte = DataType::from_name("Byte").unwrap();
    let dataset = driver
        .create(path, size, 1, byte, &CslStringList::new())
        .unwrap();
    dataset
        .set_geo_transform(&[origin.0, 1.0, 0.0, origin.1, 0.0, -1.0])
        .unwrap();
    let band = dataset.rasterband(1).unwrap();
    band.set_no_data_value(0.0).unwrap();
    let buffer = RasterBuffer::new(size, byte, vec![value; size.0 * size.1]);
    band.write_window((0, 0), size, &buffer).unwrap();
    dataset.flush_cache();
    dataset
}
