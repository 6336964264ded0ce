use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use gdal_retile::config::{install_tracing_error_handler, set_config_option};
use gdal_retile::cpl::CslStringList;
use gdal_retile::raster::{DataType, ResampleAlg};
use gdal_retile::spatial_ref::SpatialRef;
use gdal_retile::{retile, Result, RetileError, RetileOptions};

/// Tile a set of rasters and build pyramid levels of tiles.
#[derive(Parser, Debug)]
#[command(name = "gdal_retile")]
#[command(version)]
struct Cli {
    /// Existing directory the tiles are written to
    #[arg(long)]
    target_dir: PathBuf,

    /// Output raster driver
    #[arg(short = 'f', long, default_value = gdal_retile::options::DEFAULT_FORMAT)]
    format: String,

    /// Creation option passed to the output driver, NAME=VALUE
    #[arg(long = "co", value_name = "NAME=VALUE")]
    creation_options: Vec<String>,

    /// Output data type, by GDAL name (Byte, Int16, Float32, ...)
    #[arg(long = "ot", value_name = "TYPE")]
    data_type: Option<String>,

    /// Tile size in pixels
    #[arg(long = "ps", num_args = 2, value_names = ["WIDTH", "HEIGHT"])]
    tile_size: Option<Vec<usize>>,

    /// Overlap in pixels between neighbouring tiles
    #[arg(long, default_value = "0")]
    overlap: usize,

    /// Number of pyramid levels to build
    #[arg(long, default_value = "0")]
    levels: usize,

    /// Resampling used for pyramid levels
    #[arg(short = 'r', long, default_value = "near")]
    resampling: String,

    /// Write a shapefile index of the tiles of each level
    #[arg(long)]
    tile_index: Option<String>,

    /// Attribute holding the tile location in the shapefile index
    #[arg(long, default_value = gdal_retile::options::DEFAULT_TILE_INDEX_FIELD)]
    tile_index_field: String,

    /// Write a CSV index of the tiles of each level
    #[arg(long)]
    csv: Option<String>,

    /// CSV delimiter
    #[arg(long = "csv-delim", default_value_t = gdal_retile::options::DEFAULT_CSV_DELIMITER)]
    csv_delimiter: char,

    /// Spatial reference assigned to the output, in any form GDAL accepts
    #[arg(long = "s-srs", value_name = "SRS")]
    source_srs: Option<String>,

    /// Only build the pyramid levels
    #[arg(long)]
    pyramid_only: bool,

    /// Write the tiles of each row into their own directory
    #[arg(long)]
    use_dir_for_each_row: bool,

    /// Keep tiles that already exist
    #[arg(long)]
    resume: bool,

    /// GDAL configuration option
    #[arg(
        long = "config",
        num_args = 2,
        value_names = ["KEY", "VALUE"],
        action = ArgAction::Append
    )]
    config: Vec<String>,

    /// File listing further inputs, one per line
    #[arg(long)]
    optfile: Option<PathBuf>,

    /// Log every tile written
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Input rasters
    inputs: Vec<PathBuf>,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "info"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    fn into_options(self) -> Result<RetileOptions> {
        let mut inputs = self.inputs;
        if let Some(optfile) = &self.optfile {
            inputs.extend(read_optfile(&fs::read_to_string(optfile)?));
        }

        let mut creation_options = CslStringList::new();
        for option in &self.creation_options {
            creation_options.add_string(option)?;
        }

        let (tile_width, tile_height) = match self.tile_size.as_deref() {
            Some([width, height]) => (*width, *height),
            Some(other) => {
                return Err(RetileError::BadArgument(format!(
                    "--ps expects a width and a height, got {other:?}"
                )))
            }
            None => (
                gdal_retile::options::DEFAULT_TILE_SIZE,
                gdal_retile::options::DEFAULT_TILE_SIZE,
            ),
        };

        let mut options = RetileOptions::new(self.target_dir)
            .with_inputs(inputs)
            .with_format(&self.format)
            .with_creation_options(creation_options)
            .with_tile_size(tile_width, tile_height)
            .with_overlap(self.overlap)
            .with_levels(self.levels)
            .with_resampling(self.resampling.parse::<ResampleAlg>()?)
            .with_tile_index_field(&self.tile_index_field)
            .with_csv_delimiter(self.csv_delimiter)
            .with_pyramid_only(self.pyramid_only)
            .with_dir_for_each_row(self.use_dir_for_each_row)
            .with_resume(self.resume);
        if let Some(name) = &self.data_type {
            options = options.with_data_type(name.parse::<DataType>()?);
        }
        if let Some(name) = &self.tile_index {
            options = options.with_tile_index(name);
        }
        if let Some(name) = &self.csv {
            options = options.with_csv(name);
        }
        if let Some(definition) = &self.source_srs {
            options = options.with_source_srs(SpatialRef::from_definition(definition)?);
        }
        Ok(options)
    }
}

/// Input paths listed in an option file. Blank lines and `#` comments are skipped.
fn read_optfile(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect()
}

fn run(cli: Cli) -> Result<()> {
    for pair in cli.config.chunks(2) {
        if let [key, value] = pair {
            set_config_option(key, value)?;
        }
    }

    let options = cli.into_options()?;
    let summary = retile(options)?;
    info!(
        written = summary.tiles_written,
        resumed = summary.tiles_resumed,
        empty = summary.tiles_empty,
        levels = summary.levels_built,
        "done"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    fmt().with_env_filter(filter).with_target(false).init();
    install_tracing_error_handler();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
