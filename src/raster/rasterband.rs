use std::ffi::c_void;
use std::marker::PhantomData;

use gdal_sys::{
    self, CPLErr, GDALColorInterp, GDALColorTableH, GDALRWFlag, GDALRasterBandH,
};

use crate::dataset::Dataset;
use crate::raster::DataType;
use crate::utils::{_last_cpl_err, _last_null_pointer_err};

use crate::errors::*;

/// Represents a single band of a dataset.
///
/// This object carries the lifetime of the dataset that
/// contains it. This is necessary to prevent the dataset
/// from being dropped before the band.
pub struct RasterBand<'a> {
    c_rasterband: GDALRasterBandH,
    phantom: PhantomData<&'a Dataset>,
}

impl<'a> RasterBand<'a> {
    /// Create a RasterBand from a wrapped C pointer
    ///
    /// # Safety
    /// This method operates on a raw C pointer
    pub unsafe fn from_c_rasterband(_: &'a Dataset, c_rasterband: GDALRasterBandH) -> Self {
        RasterBand {
            c_rasterband,
            phantom: PhantomData,
        }
    }

    pub fn data_type(&self) -> Option<DataType> {
        DataType::from_gdal(unsafe { gdal_sys::GDALGetRasterDataType(self.c_rasterband) })
    }

    /// Read a window of this band into a buffer of `data_type` pixels.
    ///
    /// # Arguments
    /// * window - the window position from top left
    /// * window_size - the window size (GDAL will resample if window_size != size)
    /// * size - the size of the returned buffer
    /// * data_type - the pixel type of the returned buffer
    pub fn read_window(
        &self,
        window: (usize, usize),
        window_size: (usize, usize),
        size: (usize, usize),
        data_type: DataType,
    ) -> Result<RasterBuffer> {
        let mut data = vec![0u8; size.0 * size.1 * data_type.size_bytes()];
        let rv = unsafe {
            gdal_sys::GDALRasterIO(
                self.c_rasterband,
                GDALRWFlag::GF_Read,
                window.0 as i32,
                window.1 as i32,
                window_size.0 as i32,
                window_size.1 as i32,
                data.as_mut_ptr() as *mut c_void,
                size.0 as i32,
                size.1 as i32,
                data_type.gdal_type(),
                0,
                0,
            )
        };
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }

        Ok(RasterBuffer {
            size,
            data_type,
            data,
        })
    }

    /// Write a buffer into a window of this band.
    ///
    /// # Arguments
    /// * window - the window position from top left
    /// * window_size - the window size (GDAL will resample if window_size != buffer.size)
    /// * buffer - the pixels to write
    pub fn write_window(
        &self,
        window: (usize, usize),
        window_size: (usize, usize),
        buffer: &RasterBuffer,
    ) -> Result<()> {
        if buffer.data.len() != buffer.size.0 * buffer.size.1 * buffer.data_type.size_bytes() {
            return Err(RetileError::BadArgument(format!(
                "Buffer of {} bytes does not hold {}x{} {} pixels",
                buffer.data.len(),
                buffer.size.0,
                buffer.size.1,
                buffer.data_type
            )));
        }
        let rv = unsafe {
            gdal_sys::GDALRasterIO(
                self.c_rasterband,
                GDALRWFlag::GF_Write,
                window.0 as i32,
                window.1 as i32,
                window_size.0 as i32,
                window_size.1 as i32,
                buffer.data.as_ptr() as *mut c_void,
                buffer.size.0 as i32,
                buffer.size.1 as i32,
                buffer.data_type.gdal_type(),
                0,
                0,
            )
        };
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }
        Ok(())
    }

    pub fn no_data_value(&self) -> Option<f64> {
        let mut pb_success = 1;
        let no_data =
            unsafe { gdal_sys::GDALGetRasterNoDataValue(self.c_rasterband, &mut pb_success) };
        if pb_success == 1 {
            return Some(no_data);
        }
        None
    }

    pub fn set_no_data_value(&self, no_data: f64) -> Result<()> {
        let rv = unsafe { gdal_sys::GDALSetRasterNoDataValue(self.c_rasterband, no_data) };
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }
        Ok(())
    }

    /// Fill the whole band with a constant value.
    pub fn fill(&self, value: f64) -> Result<()> {
        let rv = unsafe { gdal_sys::GDALFillRaster(self.c_rasterband, value, 0.0) };
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }
        Ok(())
    }

    pub fn color_interpretation(&self) -> ColorInterpretation {
        let c_interp = unsafe { gdal_sys::GDALGetRasterColorInterpretation(self.c_rasterband) };
        ColorInterpretation(c_interp)
    }

    pub fn set_color_interpretation(&self, interpretation: ColorInterpretation) -> Result<()> {
        let rv = unsafe {
            gdal_sys::GDALSetRasterColorInterpretation(self.c_rasterband, interpretation.0)
        };
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }
        Ok(())
    }

    /// A copy of the band's palette, if it has one.
    pub fn color_table(&self) -> Option<ColorTable> {
        let c_color_table = unsafe { gdal_sys::GDALGetRasterColorTable(self.c_rasterband) };
        if c_color_table.is_null() {
            return None;
        }
        let c_clone = unsafe { gdal_sys::GDALCloneColorTable(c_color_table) };
        if c_clone.is_null() {
            return None;
        }
        Some(ColorTable { c_color_table: c_clone })
    }

    pub fn set_color_table(&self, color_table: &ColorTable) -> Result<()> {
        let rv = unsafe {
            gdal_sys::GDALSetRasterColorTable(self.c_rasterband, color_table.c_color_table)
        };
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }
        Ok(())
    }
}

/// Pixels read from or written to a band window.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterBuffer {
    pub size: (usize, usize),
    pub data_type: DataType,
    pub data: Vec<u8>,
}

impl RasterBuffer {
    pub fn new(size: (usize, usize), data_type: DataType, data: Vec<u8>) -> Self {
        RasterBuffer {
            size,
            data_type,
            data,
        }
    }
}

/// How the values of a band are to be read (gray, red, palette index, alpha, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorInterpretation(GDALColorInterp::Type);

impl ColorInterpretation {
    pub fn palette_index() -> Self {
        ColorInterpretation(GDALColorInterp::GCI_PaletteIndex)
    }

    pub fn gray() -> Self {
        ColorInterpretation(GDALColorInterp::GCI_GrayIndex)
    }
}

/// An owned palette. Cloned out of the band it came from and destroyed on drop.
pub struct ColorTable {
    c_color_table: GDALColorTableH,
}

impl ColorTable {
    /// Build a palette from RGBA entries.
    pub fn from_entries(entries: &[(i16, i16, i16, i16)]) -> Result<Self> {
        let c_color_table =
            unsafe { gdal_sys::GDALCreateColorTable(gdal_sys::GDALPaletteInterp::GPI_RGB) };
        if c_color_table.is_null() {
            return Err(_last_null_pointer_err("GDALCreateColorTable"));
        }
        for (index, &(c1, c2, c3, c4)) in entries.iter().enumerate() {
            let entry = gdal_sys::GDALColorEntry { c1, c2, c3, c4 };
            unsafe { gdal_sys::GDALSetColorEntry(c_color_table, index as i32, &entry) };
        }
        Ok(ColorTable { c_color_table })
    }

    pub fn entry_count(&self) -> usize {
        (unsafe { gdal_sys::GDALGetColorEntryCount(self.c_color_table) }) as usize
    }

    /// RGBA components of entry `index`.
    pub fn entry(&self, index: usize) -> Option<(i16, i16, i16, i16)> {
        let c_entry = unsafe { gdal_sys::GDALGetColorEntry(self.c_color_table, index as i32) };
        if c_entry.is_null() {
            return None;
        }
        let entry = unsafe { *c_entry };
        Some((entry.c1, entry.c2, entry.c3, entry.c4))
    }
}

impl Clone for ColorTable {
    fn clone(&self) -> Self {
        let c_color_table = unsafe { gdal_sys::GDALCloneColorTable(self.c_color_table) };
        ColorTable { c_color_table }
    }
}

impl Drop for ColorTable {
    fn drop(&mut self) {
        unsafe { gdal_sys::GDALDestroyColorTable(self.c_color_table) };
    }
}

impl std::fmt::Debug for ColorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ColorTable({} entries)", self.entry_count())
    }
}
