//! A set of indexed rasters treated as one seamless raster.

use std::path::{Path, PathBuf};

use geo_types::Rect;
use tracing::{debug, trace};

use crate::cache::DatasetCache;
use crate::dataset::Dataset;
use crate::driver::Driver;
use crate::errors::{Result, RetileError};
use crate::geo_transform::AffineGrid;
use crate::raster::{ColorInterpretation, ColorTable, DataType};
use crate::tile_index::{footprint_of, TileIndex};
use crate::tiling::{pixel_windows, raster_size_for, GridFootprint};

/// Properties shared by all rasters of a mosaic, taken from its first member, plus the
/// mosaic's overall grid and size.
#[derive(Debug)]
pub struct MosaicInfo {
    /// The path tile names are derived from.
    pub name: PathBuf,
    pub bands: usize,
    pub data_type: DataType,
    pub projection: String,
    pub color_table: Option<ColorTable>,
    pub color_interpretations: Vec<ColorInterpretation>,
    pub no_data: Option<f64>,
    /// Origin at the upper-left corner of the mosaic's extent.
    pub grid: AffineGrid,
    pub extent: Rect<f64>,
    pub x_size: usize,
    pub y_size: usize,
    index: TileIndex,
}

impl MosaicInfo {
    pub fn new<P: AsRef<Path>>(
        name: P,
        index: TileIndex,
        cache: &mut DatasetCache,
    ) -> Result<Self> {
        let first = index.first().ok_or(RetileError::NoInputs)?;
        let extent = index.extent().ok_or(RetileError::NoInputs)?;
        let first_location = first.location.clone();

        let footprint = footprint_of(&first_location, cache)?;
        let dataset = cache.get(&first_location)?;
        let bands = dataset.raster_count();
        if bands == 0 {
            return Err(RetileError::BadArgument(format!(
                "'{}' has no raster bands",
                first_location.display()
            )));
        }
        let first_band = dataset.rasterband(1)?;
        let data_type = first_band.data_type().ok_or_else(|| {
            RetileError::BadArgument(format!(
                "'{}' has an unsupported data type",
                first_location.display()
            ))
        })?;
        let color_table = first_band.color_table();
        let no_data = first_band.no_data_value();
        let color_interpretations = (1..=bands)
            .map(|band| Ok(dataset.rasterband(band)?.color_interpretation()))
            .collect::<Result<Vec<_>>>()?;
        let projection = dataset.projection();

        let scale_x = footprint.grid.scale_x;
        let scale_y = footprint.grid.scale_y;
        let uly = if scale_y < 0.0 {
            extent.max().y
        } else {
            extent.min().y
        };
        let grid = AffineGrid::new(extent.min().x, uly, scale_x, scale_y);
        let (x_size, y_size) = raster_size_for(&extent, scale_x, scale_y);

        Ok(MosaicInfo {
            name: name.as_ref().to_path_buf(),
            bands,
            data_type,
            projection,
            color_table,
            color_interpretations,
            no_data,
            grid,
            extent,
            x_size,
            y_size,
            index,
        })
    }

    pub fn index(&self) -> &TileIndex {
        &self.index
    }

    /// Assemble the part of the mosaic covering `area` into an in-memory dataset at the
    /// mosaic's resolution. Returns `None` when no member raster intersects `area`.
    ///
    /// The dataset carries no projection, so resampling from it only applies
    /// geotransforms whatever spatial reference the tiles are given.
    pub fn dataset_for(
        &self,
        area: &Rect<f64>,
        cache: &mut DatasetCache,
    ) -> Result<Option<Dataset>> {
        let members: Vec<PathBuf> = self
            .index
            .intersecting(area)
            .map(|entry| entry.location.clone())
            .collect();
        if members.is_empty() {
            debug!(?area, "no input intersects tile");
            return Ok(None);
        }

        let uly = if self.grid.scale_y < 0.0 {
            area.max().y
        } else {
            area.min().y
        };
        let target_grid = AffineGrid::new(area.min().x, uly, self.grid.scale_x, self.grid.scale_y);
        let (width, height) = raster_size_for(area, self.grid.scale_x, self.grid.scale_y);
        let target = GridFootprint::new(target_grid, width, height);

        let mem_driver = Driver::get_by_name("MEM")?;
        let result = mem_driver.create_anonymous((width, height), self.bands, self.data_type)?;
        result.set_geo_transform(&target_grid.to_geo_transform())?;
        for band_index in 1..=self.bands {
            let band = result.rasterband(band_index)?;
            if let Some(no_data) = self.no_data {
                band.fill(no_data)?;
                band.set_no_data_value(no_data)?;
            }
        }

        for location in members {
            let footprint = footprint_of(&location, cache)?;
            let Some((src_window, dst_window)) = pixel_windows(&footprint, &target) else {
                trace!(path = %location.display(), "input only touches tile");
                continue;
            };
            let source = cache.get(&location)?;
            let band_count = source.raster_count().min(self.bands);
            for band_index in 1..=band_count {
                let source_band = source.rasterband(band_index)?;
                let target_band = result.rasterband(band_index)?;
                if let Some(color_table) = &self.color_table {
                    target_band.set_color_table(color_table)?;
                }
                target_band.set_color_interpretation(self.color_interpretations[band_index - 1])?;
                let buffer = source_band.read_window(
                    src_window.offset(),
                    src_window.size(),
                    dst_window.size(),
                    self.data_type,
                )?;
                target_band.write_window(dst_window.offset(), dst_window.size(), &buffer)?;
            }
        }

        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_byte_raster;

    #[test]
    fn test_mosaic_of_two_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let left = dir.path().join("left.tif");
        let right = dir.path().join("right.tif");
        write_byte_raster(&left, (0.0, 10.0), (10, 10), 1);
        write_byte_raster(&right, (10.0, 10.0), (10, 10), 2);

        let mut cache = DatasetCache::default();
        let index = TileIndex::from_files(&[&left, &right], &mut cache).unwrap();
        let mosaic = MosaicInfo::new(&left, index, &mut cache).unwrap();
        assert_eq!((mosaic.x_size, mosaic.y_size), (20, 10));
        assert_eq!(mosaic.bands, 1);
        assert_eq!(mosaic.no_data, Some(0.0));
        assert_eq!(mosaic.grid, AffineGrid::new(0.0, 10.0, 1.0, -1.0));

        // A window straddling both inputs.
        let area = mosaic.grid.bounds_for(8, 0, 4, 2);
        let dataset = mosaic.dataset_for(&area, &mut cache).unwrap().unwrap();
        assert_eq!(dataset.raster_size(), (4, 2));
        let band = dataset.rasterband(1).unwrap();
        let buffer = band
            .read_window((0, 0), (4, 2), (4, 2), mosaic.data_type)
            .unwrap();
        assert_eq!(buffer.data, vec![1, 1, 2, 2, 1, 1, 2, 2]);
    }

    #[test]
    fn test_window_outside_mosaic() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.tif");
        write_byte_raster(&input, (0.0, 10.0), (10, 10), 7);

        let mut cache = DatasetCache::default();
        let index = TileIndex::from_files(&[&input], &mut cache).unwrap();
        let mosaic = MosaicInfo::new(&input, index, &mut cache).unwrap();
        let far = AffineGrid::new(100.0, 100.0, 1.0, -1.0).bounds_for(0, 0, 5, 5);
        assert!(mosaic.dataset_for(&far, &mut cache).unwrap().is_none());
    }
}
