//! GDAL Raster Data

mod rasterband;
mod types;
mod warp;

pub use rasterband::{ColorInterpretation, ColorTable, RasterBand, RasterBuffer};
pub use types::{DataType, GDALDataType};
pub use warp::{reproject_into, ResampleAlg};
