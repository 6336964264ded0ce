//! The footprint list of a set of rasters: where each file is and what it covers.

use std::path::{Path, PathBuf};

use geo_types::Rect;
use tracing::debug;

use crate::cache::DatasetCache;
use crate::errors::{Result, RetileError};
use crate::geo_transform::AffineGrid;
use crate::spatial_ref::SpatialRef;
use crate::tiling::GridFootprint;
use crate::vector;

/// Driver used to persist a tile index.
pub const TILE_INDEX_DRIVER: &str = "ESRI Shapefile";

#[derive(Clone, Debug, PartialEq)]
pub struct TileIndexEntry {
    pub location: PathBuf,
    pub bounds: Rect<f64>,
}

/// An ordered list of raster footprints with rectangle queries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileIndex {
    entries: Vec<TileIndexEntry>,
}

impl TileIndex {
    pub fn new() -> Self {
        TileIndex::default()
    }

    /// Index the given rasters. Each input must be north-up.
    pub fn from_files<P: AsRef<Path>>(paths: &[P], cache: &mut DatasetCache) -> Result<Self> {
        let mut index = TileIndex::new();
        for path in paths {
            let path = path.as_ref();
            let footprint = footprint_of(path, cache)?;
            debug!(path = %path.display(), ?footprint, "indexed input");
            index.push(path, footprint.bounds());
        }
        Ok(index)
    }

    pub fn push<P: Into<PathBuf>>(&mut self, location: P, bounds: Rect<f64>) {
        self.entries.push(TileIndexEntry {
            location: location.into(),
            bounds,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&TileIndexEntry> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileIndexEntry> {
        self.entries.iter()
    }

    /// Union of all footprints.
    pub fn extent(&self) -> Option<Rect<f64>> {
        self.entries
            .iter()
            .map(|entry| entry.bounds)
            .reduce(|a, b| {
                Rect::new(
                    (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                    (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
                )
            })
    }

    /// Entries whose footprint intersects `area`. Footprints that merely touch it are
    /// included.
    pub fn intersecting<'a>(
        &'a self,
        area: &'a Rect<f64>,
    ) -> impl Iterator<Item = &'a TileIndexEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| rects_intersect(&entry.bounds, area))
    }

    /// Persist as a polygon shapefile with one `field_name` attribute per tile,
    /// replacing an existing file of the same name.
    pub fn write_shapefile<P: AsRef<Path>>(
        &self,
        path: P,
        field_name: &str,
        srs: Option<&SpatialRef>,
    ) -> Result<()> {
        let locations: Vec<String> = self
            .entries
            .iter()
            .map(|entry| entry.location.to_string_lossy().into_owned())
            .collect();
        vector::write_polygon_layer(
            TILE_INDEX_DRIVER,
            path,
            field_name,
            srs,
            locations
                .iter()
                .map(String::as_str)
                .zip(self.entries.iter().map(|entry| &entry.bounds)),
        )
    }

    /// Persist as delimited text: `location, minx, maxx, miny, maxy` per line, no header.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P, delimiter: u8) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_path(path)?;
        for entry in &self.entries {
            let (min, max) = (entry.bounds.min(), entry.bounds.max());
            writer.write_record([
                entry.location.to_string_lossy().into_owned(),
                min.x.to_string(),
                max.x.to_string(),
                min.y.to_string(),
                max.y.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn rects_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x
        && b.min().x <= a.max().x
        && a.min().y <= b.max().y
        && b.min().y <= a.max().y
}

/// Grid and size of the raster at `path`.
pub fn footprint_of(path: &Path, cache: &mut DatasetCache) -> Result<GridFootprint> {
    let dataset = cache.get(path)?;
    let transform = dataset
        .geo_transform()
        .map_err(|_| RetileError::InvalidGeoTransform {
            path: path.to_path_buf(),
        })?;
    let grid = AffineGrid::from_geo_transform(&transform).ok_or_else(|| {
        RetileError::InvalidGeoTransform {
            path: path.to_path_buf(),
        }
    })?;
    let (width, height) = dataset.raster_size();
    Ok(GridFootprint::new(grid, width, height))
}
