use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_CAPACITY;
use crate::cpl::CslStringList;
use crate::errors::{Result, RetileError};
use crate::raster::{DataType, ResampleAlg};
use crate::spatial_ref::SpatialRef;

pub const DEFAULT_FORMAT: &str = "GTiff";
pub const DEFAULT_TILE_SIZE: usize = 256;
pub const DEFAULT_TILE_INDEX_FIELD: &str = "location";
pub const DEFAULT_CSV_DELIMITER: char = ';';

/// Everything that controls a retiling run.
///
/// ```rust, no_run
/// use gdal_retile::RetileOptions;
///
/// let options = RetileOptions::new("tiles/")
///     .with_inputs(["a.tif", "b.tif"])
///     .with_tile_size(512, 512)
///     .with_levels(2);
/// ```
#[derive(Clone, Debug)]
pub struct RetileOptions {
    pub inputs: Vec<PathBuf>,
    pub target_dir: PathBuf,
    pub format: String,
    pub creation_options: CslStringList,
    pub data_type: Option<DataType>,
    pub tile_width: usize,
    pub tile_height: usize,
    pub overlap: usize,
    pub levels: usize,
    pub resampling: ResampleAlg,
    pub tile_index: Option<String>,
    pub tile_index_field: String,
    pub csv: Option<String>,
    pub csv_delimiter: char,
    pub source_srs: Option<SpatialRef>,
    pub pyramid_only: bool,
    pub use_dir_for_each_row: bool,
    pub resume: bool,
    pub cache_size: usize,
}

impl RetileOptions {
    pub fn new<P: Into<PathBuf>>(target_dir: P) -> Self {
        RetileOptions {
            inputs: Vec::new(),
            target_dir: target_dir.into(),
            format: DEFAULT_FORMAT.to_string(),
            creation_options: CslStringList::new(),
            data_type: None,
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            overlap: 0,
            levels: 0,
            resampling: ResampleAlg::default(),
            tile_index: None,
            tile_index_field: DEFAULT_TILE_INDEX_FIELD.to_string(),
            csv: None,
            csv_delimiter: DEFAULT_CSV_DELIMITER,
            source_srs: None,
            pyramid_only: false,
            use_dir_for_each_row: false,
            resume: false,
            cache_size: DEFAULT_CAPACITY,
        }
    }

    pub fn with_inputs<I, P>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    pub fn with_creation_options(mut self, creation_options: CslStringList) -> Self {
        self.creation_options = creation_options;
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_tile_size(mut self, tile_width: usize, tile_height: usize) -> Self {
        self.tile_width = tile_width;
        self.tile_height = tile_height;
        self
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_resampling(mut self, resampling: ResampleAlg) -> Self {
        self.resampling = resampling;
        self
    }

    /// Write a shapefile index of each level's tiles. `.shp` is appended when the name
    /// has no extension.
    pub fn with_tile_index(mut self, name: &str) -> Self {
        let name = if Path::new(name).extension().is_none() {
            format!("{name}.shp")
        } else {
            name.to_string()
        };
        self.tile_index = Some(name);
        self
    }

    pub fn with_tile_index_field(mut self, field: &str) -> Self {
        self.tile_index_field = field.to_string();
        self
    }

    /// Write a CSV index of each level's tiles. `.csv` is appended when missing.
    pub fn with_csv(mut self, name: &str) -> Self {
        let name = if name.to_ascii_lowercase().ends_with(".csv") {
            name.to_string()
        } else {
            format!("{name}.csv")
        };
        self.csv = Some(name);
        self
    }

    pub fn with_csv_delimiter(mut self, delimiter: char) -> Self {
        self.csv_delimiter = delimiter;
        self
    }

    pub fn with_source_srs(mut self, srs: SpatialRef) -> Self {
        self.source_srs = Some(srs);
        self
    }

    pub fn with_pyramid_only(mut self, pyramid_only: bool) -> Self {
        self.pyramid_only = pyramid_only;
        self
    }

    pub fn with_dir_for_each_row(mut self, use_dir_for_each_row: bool) -> Self {
        self.use_dir_for_each_row = use_dir_for_each_row;
        self
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// The CSV delimiter as the single byte the writer needs.
    pub fn csv_delimiter_byte(&self) -> Result<u8> {
        if self.csv_delimiter.is_ascii() {
            Ok(self.csv_delimiter as u8)
        } else {
            Err(RetileError::BadArgument(format!(
                "CSV delimiter must be a single ASCII character, got '{}'",
                self.csv_delimiter
            )))
        }
    }

    /// Check the options for consistency before any file is touched.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(RetileError::NoInputs);
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(RetileError::BadArgument(format!(
                "Invalid tile dimension {},{}",
                self.tile_width, self.tile_height
            )));
        }
        if self.overlap >= self.tile_width || self.overlap >= self.tile_height {
            return Err(RetileError::BadArgument(format!(
                "Overlap {} too big w.r.t. tile dimension {},{}",
                self.overlap, self.tile_width, self.tile_height
            )));
        }
        if self.pyramid_only && self.levels == 0 {
            return Err(RetileError::BadArgument(
                "Pyramid only mode needs at least one pyramid level".to_string(),
            ));
        }
        if !self.target_dir.is_dir() {
            return Err(RetileError::BadArgument(format!(
                "Target directory '{}' does not exist",
                self.target_dir.display()
            )));
        }
        if self.tile_index_field.is_empty() {
            return Err(RetileError::BadArgument(
                "Tile index field name must not be empty".to_string(),
            ));
        }
        if self.csv.is_some() {
            self.csv_delimiter_byte()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> (tempfile::TempDir, RetileOptions) {
        let dir = tempfile::tempdir().unwrap();
        let options = RetileOptions::new(dir.path()).with_inputs(["input.tif"]);
        (dir, options)
    }

    #[test]
    fn test_defaults_validate() {
        let (_dir, options) = valid();
        assert!(options.validate().is_ok());
        assert_eq!(options.format, "GTiff");
        assert_eq!((options.tile_width, options.tile_height), (256, 256));
        assert_eq!(options.tile_index_field, "location");
        assert_eq!(options.csv_delimiter, ';');
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let (_dir, options) = valid();
        assert!(options.clone().with_tile_size(0, 256).validate().is_err());
        assert!(options
            .clone()
            .with_tile_size(64, 64)
            .with_overlap(64)
            .validate()
            .is_err());
        assert!(options
            .with_tile_size(64, 64)
            .with_overlap(63)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_pyramid_only_needs_levels() {
        let (_dir, options) = valid();
        assert!(options.clone().with_pyramid_only(true).validate().is_err());
        assert!(options
            .with_pyramid_only(true)
            .with_levels(1)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_missing_inputs_and_target() {
        let (_dir, options) = valid();
        let no_inputs = RetileOptions::new(&options.target_dir);
        assert!(matches!(no_inputs.validate(), Err(RetileError::NoInputs)));

        let missing = RetileOptions::new("/no/such/target/dir").with_inputs(["input.tif"]);
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_index_names_get_extensions() {
        let options = RetileOptions::new(".")
            .with_tile_index("index")
            .with_csv("tiles");
        assert_eq!(options.tile_index.as_deref(), Some("index.shp"));
        assert_eq!(options.csv.as_deref(), Some("tiles.csv"));

        let options = RetileOptions::new(".")
            .with_tile_index("index.shp")
            .with_csv("tiles.CSV");
        assert_eq!(options.tile_index.as_deref(), Some("index.shp"));
        assert_eq!(options.csv.as_deref(), Some("tiles.CSV"));
    }

    #[test]
    fn test_csv_delimiter_must_be_ascii() {
        let (_dir, options) = valid();
        let options = options.with_csv("tiles").with_csv_delimiter('§');
        assert!(options.validate().is_err());
        assert_eq!(options.with_csv_delimiter(',').csv_delimiter_byte().unwrap(), b',');
    }
}
