//! Split one or more georeferenced rasters into a grid of tiles and build a pyramid of
//! downsampled tile levels on top of it, using [GDAL](http://gdal.org/).
//!
//! The inputs are treated as a single mosaic. Each level is written as a set of tile
//! files, optionally described by a polygon shapefile index and/or a CSV index.
//!
//! ## Use
//!
//! ```rust, no_run
//! use gdal_retile::{retile, RetileOptions};
//!
//! let options = RetileOptions::new("tiles/")
//!     .with_inputs(["north.tif", "south.tif"])
//!     .with_tile_size(256, 256)
//!     .with_levels(3)
//!     .with_tile_index("tiles");
//! let summary = retile(options).unwrap();
//! println!("{} tiles written", summary.tiles_written);
//! ```

#![crate_name = "gdal_retile"]
#![crate_type = "lib"]

pub mod cache;
pub mod config;
pub mod cpl;
mod dataset;
mod driver;
pub mod errors;
mod geo_transform;
pub mod mosaic;
pub mod options;
pub mod raster;
pub mod retile;
pub mod spatial_ref;
pub mod tile_index;
pub mod tiling;
mod utils;
pub mod vector;

pub use dataset::Dataset;
pub use driver::Driver;
pub use errors::{Result, RetileError};
pub use geo_transform::{AffineGrid, GeoTransform, GeoTransformEx};
pub use options::RetileOptions;
pub use retile::{retile, RetileSummary, Retiler, TileNamer};

#[cfg(test)]
mod test_utils;
