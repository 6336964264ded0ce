//! Cutting a mosaic into tiles and building pyramid levels on top of them.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cache::DatasetCache;
use crate::dataset::Dataset;
use crate::driver::Driver;
use crate::errors::{Result, RetileError};
use crate::geo_transform::AffineGrid;
use crate::mosaic::MosaicInfo;
use crate::options::RetileOptions;
use crate::raster::{reproject_into, DataType};
use crate::spatial_ref::SpatialRef;
use crate::tile_index::TileIndex;
use crate::tiling::{TileGrid, TileWindow};

/// What a run produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetileSummary {
    /// Tiles created, across all levels.
    pub tiles_written: usize,
    /// Existing tiles kept because of `resume`.
    pub tiles_resumed: usize,
    /// Tiles skipped because no input covers them.
    pub tiles_empty: usize,
    /// Pyramid levels built, not counting level 0.
    pub levels_built: usize,
}

/// Naming scheme for output tiles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileNamer {
    target_dir: PathBuf,
    stem: String,
    extension: Option<String>,
    dir_for_each_row: bool,
}

impl TileNamer {
    /// `source_name` provides the file stem. A leading `@` (file list syntax) is dropped.
    pub fn new(
        target_dir: &Path,
        source_name: &Path,
        extension: Option<String>,
        dir_for_each_row: bool,
    ) -> Self {
        let stem = source_name
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = stem.strip_prefix('@').map(str::to_string).unwrap_or(stem);
        TileNamer {
            target_dir: target_dir.to_path_buf(),
            stem,
            extension,
            dir_for_each_row,
        }
    }

    /// Directory holding the tiles (or, with one directory per row, the row
    /// directories) of `level`. Level 0 tiles sit directly in the target directory
    /// unless rows get their own directories.
    pub fn level_dir(&self, level: usize) -> PathBuf {
        if level == 0 && !self.dir_for_each_row {
            self.target_dir.clone()
        } else {
            self.target_dir.join(level.to_string())
        }
    }

    /// Row and column are zero padded in the file name only; row directories use the
    /// plain row number.
    pub fn tile_path(&self, grid: &TileGrid, tile: &TileWindow, level: usize) -> PathBuf {
        let digits = grid.index_digits();
        let mut file_name = format!("{}_{:0digits$}_{:0digits$}", self.stem, tile.row, tile.col);
        if let Some(extension) = &self.extension {
            file_name.push('.');
            file_name.push_str(extension);
        }
        let dir = self.level_dir(level);
        if self.dir_for_each_row {
            dir.join(tile.row.to_string()).join(file_name)
        } else {
            dir.join(file_name)
        }
    }
}

/// Drives a retiling run described by [`RetileOptions`].
pub struct Retiler {
    options: RetileOptions,
    cache: DatasetCache,
    target_driver: Driver,
    /// Present when the target driver cannot `Create`; tiles are then assembled in
    /// memory and written with `CreateCopy`.
    mem_driver: Option<Driver>,
    srs_override: Option<String>,
    summary: RetileSummary,
}

impl Retiler {
    pub fn new(options: RetileOptions) -> Result<Self> {
        options.validate()?;
        let target_driver = Driver::get_by_name(&options.format)?;
        let mem_driver = if target_driver.supports_create() {
            None
        } else {
            Some(Driver::get_by_name("MEM")?)
        };
        let srs_override = options
            .source_srs
            .as_ref()
            .map(SpatialRef::to_wkt)
            .transpose()?;
        let cache = DatasetCache::new(options.cache_size);
        Ok(Retiler {
            options,
            cache,
            target_driver,
            mem_driver,
            srs_override,
            summary: RetileSummary::default(),
        })
    }

    pub fn run(mut self) -> Result<RetileSummary> {
        let name = self.options.inputs[0].clone();
        let namer = TileNamer::new(
            &self.options.target_dir,
            &name,
            self.target_driver.extension(),
            self.options.use_dir_for_each_row,
        );

        let input_index = TileIndex::from_files(&self.options.inputs, &mut self.cache)?;
        let mosaic = MosaicInfo::new(&name, input_index, &mut self.cache)?;
        info!(
            inputs = mosaic.index().len(),
            x_size = mosaic.x_size,
            y_size = mosaic.y_size,
            bands = mosaic.bands,
            data_type = %mosaic.data_type,
            "mosaic"
        );

        let mut level_index = if self.options.pyramid_only {
            mosaic.index().clone()
        } else {
            let grid = TileGrid::new(
                mosaic.x_size,
                mosaic.y_size,
                self.options.tile_width,
                self.options.tile_height,
                self.options.overlap,
            )?;
            let index = self.build_level(&mosaic, &grid, &namer, 0)?;
            self.write_indexes(&index, &mosaic, &namer.level_dir(0))?;
            index
        };

        for level in 1..=self.options.levels {
            if level_index.is_empty() {
                warn!(level, "previous level produced no tiles, stopping");
                break;
            }
            let level_mosaic = MosaicInfo::new(&name, level_index, &mut self.cache)?;
            let (width, height) = (level_mosaic.x_size / 2, level_mosaic.y_size / 2);
            if width == 0 || height == 0 {
                warn!(level, "mosaic too small for another pyramid level, stopping");
                break;
            }
            let grid = TileGrid::new(
                width,
                height,
                self.options.tile_width,
                self.options.tile_height,
                self.options.overlap,
            )?;
            level_index = self.build_level(&level_mosaic, &grid, &namer, level)?;
            self.write_indexes(&level_index, &level_mosaic, &namer.level_dir(level))?;
            self.summary.levels_built += 1;
        }

        Ok(self.summary)
    }

    /// Produce every tile of one level and return the index of the tiles that exist
    /// afterwards. Level 0 copies pixels at the mosaic's resolution, higher levels
    /// resample the previous level at half resolution.
    fn build_level(
        &mut self,
        mosaic: &MosaicInfo,
        grid: &TileGrid,
        namer: &TileNamer,
        level: usize,
    ) -> Result<TileIndex> {
        let level_grid = if level == 0 {
            mosaic.grid
        } else {
            mosaic.grid.scaled(2.0)
        };
        info!(
            level,
            tiles = grid.len(),
            columns = grid.count_x,
            rows = grid.count_y,
            "building level"
        );

        let mut index = TileIndex::new();
        for tile in grid.tiles() {
            let path = namer.tile_path(grid, &tile, level);
            let bounds = tile.bounds(&level_grid);

            if self.options.resume && path.exists() {
                info!(tile = %path.display(), "tile exists, resuming");
                self.summary.tiles_resumed += 1;
                index.push(path, bounds);
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            let written = discard_on_error(&path, || {
                if level == 0 {
                    self.create_tile(mosaic, &level_grid, &tile, &path)
                } else {
                    self.create_pyramid_tile(mosaic, &level_grid, &tile, &path)
                }
            })?;
            if written {
                info!(
                    tile = %path.display(),
                    x_off = tile.x_off,
                    y_off = tile.y_off,
                    width = tile.width,
                    height = tile.height,
                    "tile written"
                );
                self.summary.tiles_written += 1;
                index.push(path, bounds);
            } else {
                self.summary.tiles_empty += 1;
            }
        }
        Ok(index)
    }

    /// Copy one window of the mosaic into a tile. Returns `false` when no input covers it.
    fn create_tile(
        &mut self,
        mosaic: &MosaicInfo,
        level_grid: &AffineGrid,
        tile: &TileWindow,
        path: &Path,
    ) -> Result<bool> {
        let bounds = tile.bounds(level_grid);
        let Some(source) = mosaic.dataset_for(&bounds, &mut self.cache)? else {
            return Ok(false);
        };

        let data_type = self.output_type(mosaic);
        let target = self.open_tile(path, (tile.width, tile.height), mosaic.bands, data_type)?;
        self.prepare_tile(&target, mosaic, level_grid, tile)?;

        let (source_width, source_height) = source.raster_size();
        let read_size = (
            source_width.min(tile.width),
            source_height.min(tile.height),
        );
        for band_index in 1..=mosaic.bands {
            let buffer = source
                .rasterband(band_index)?
                .read_window((0, 0), read_size, read_size, data_type)?;
            target
                .rasterband(band_index)?
                .write_window((0, 0), read_size, &buffer)?;
        }

        self.finish_tile(path, target)?;
        Ok(true)
    }

    /// Resample a window of the previous level into a tile at half its resolution.
    fn create_pyramid_tile(
        &mut self,
        mosaic: &MosaicInfo,
        level_grid: &AffineGrid,
        tile: &TileWindow,
        path: &Path,
    ) -> Result<bool> {
        let bounds = tile.bounds(level_grid);
        let Some(source) = mosaic.dataset_for(&bounds, &mut self.cache)? else {
            return Ok(false);
        };

        let data_type = self.output_type(mosaic);
        let target = self.open_tile(path, (tile.width, tile.height), mosaic.bands, data_type)?;
        self.prepare_tile(&target, mosaic, level_grid, tile)?;

        reproject_into(&source, &target, self.options.resampling).map_err(|err| {
            RetileError::ReprojectFailed {
                tile: path.display().to_string(),
                msg: err.to_string(),
            }
        })?;

        self.finish_tile(path, target)?;
        Ok(true)
    }

    fn output_type(&self, mosaic: &MosaicInfo) -> DataType {
        self.options.data_type.unwrap_or(mosaic.data_type)
    }

    fn open_tile(
        &self,
        path: &Path,
        size: (usize, usize),
        bands: usize,
        data_type: DataType,
    ) -> Result<Dataset> {
        match &self.mem_driver {
            Some(mem_driver) => mem_driver.create_anonymous(size, bands, data_type),
            None => self.target_driver.create(
                path,
                size,
                bands,
                data_type,
                &self.options.creation_options,
            ),
        }
    }

    /// Georeference a fresh tile and copy the mosaic's band properties onto it.
    fn prepare_tile(
        &self,
        target: &Dataset,
        mosaic: &MosaicInfo,
        level_grid: &AffineGrid,
        tile: &TileWindow,
    ) -> Result<()> {
        target.set_geo_transform(&level_grid.window_transform(tile.x_off, tile.y_off))?;
        let projection = self.srs_override.as_deref().unwrap_or(&mosaic.projection);
        if !projection.is_empty() {
            target.set_projection(projection)?;
        }
        for band_index in 1..=mosaic.bands {
            let band = target.rasterband(band_index)?;
            if let Some(color_table) = &mosaic.color_table {
                if let Err(err) = band.set_color_table(color_table) {
                    warn!(band = band_index, %err, "color table not supported by output");
                }
            }
            if let Some(interpretation) = mosaic.color_interpretations.get(band_index - 1) {
                if let Err(err) = band.set_color_interpretation(*interpretation) {
                    warn!(band = band_index, %err, "color interpretation not supported by output");
                }
            }
            if let Some(no_data) = mosaic.no_data {
                band.set_no_data_value(no_data)?;
            }
        }
        Ok(())
    }

    fn finish_tile(&self, path: &Path, target: Dataset) -> Result<()> {
        if self.mem_driver.is_some() {
            self.target_driver
                .create_copy(path, &target, &self.options.creation_options)?;
        } else {
            target.flush_cache();
        }
        Ok(())
    }

    fn write_indexes(&self, index: &TileIndex, mosaic: &MosaicInfo, dir: &Path) -> Result<()> {
        if let Some(name) = &self.options.tile_index {
            fs::create_dir_all(dir)?;
            let srs = self.index_srs(mosaic)?;
            let path = dir.join(name);
            index.write_shapefile(&path, &self.options.tile_index_field, srs.as_ref())?;
            info!(path = %path.display(), tiles = index.len(), "tile index written");
        }
        if let Some(name) = &self.options.csv {
            fs::create_dir_all(dir)?;
            let path = dir.join(name);
            index.write_csv(&path, self.options.csv_delimiter_byte()?)?;
            info!(path = %path.display(), tiles = index.len(), "csv index written");
        }
        Ok(())
    }

    fn index_srs(&self, mosaic: &MosaicInfo) -> Result<Option<SpatialRef>> {
        if let Some(srs) = &self.options.source_srs {
            return Ok(Some(srs.clone()));
        }
        if mosaic.projection.is_empty() {
            return Ok(None);
        }
        SpatialRef::from_wkt(&mosaic.projection).map(Some)
    }
}

/// Run `build`, which writes the tile at `path`. When it fails, whatever part of the
/// tile reached the disk is removed so that a resumed run builds it again.
fn discard_on_error<T, F>(path: &Path, build: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let result = build();
    if result.is_err() && path.exists() {
        if let Err(err) = fs::remove_file(path) {
            warn!(tile = %path.display(), %err, "could not remove partial tile");
        } else {
            warn!(tile = %path.display(), "removed partial tile");
        }
    }
    result
}

/// Run a whole retiling job.
pub fn retile(options: RetileOptions) -> Result<RetileSummary> {
    Retiler::new(options)?.run()
}
