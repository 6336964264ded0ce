use std::fmt::{Display, Formatter};
use std::ptr;
use std::str::FromStr;

use gdal_sys::{CPLErr, GDALResampleAlg};

use crate::dataset::Dataset;
use crate::errors::*;
use crate::utils::_last_cpl_err;

/// Resampling kernels offered when building pyramid levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResampleAlg {
    /// Nearest neighbour
    #[default]
    NearestNeighbour,
    /// Bilinear (2x2 kernel)
    Bilinear,
    /// Cubic convolution approximation (4x4 kernel)
    Cubic,
    /// Cubic B-Spline approximation (4x4 kernel)
    CubicSpline,
    /// Lanczos windowed sinc interpolation (6x6 kernel)
    Lanczos,
    /// Average of all non-NODATA contributing pixels
    Average,
    /// Selects the value which appears most often of all the sampled points
    Mode,
}

impl ResampleAlg {
    pub fn to_gdal(&self) -> GDALResampleAlg::Type {
        match self {
            ResampleAlg::NearestNeighbour => GDALResampleAlg::GRA_NearestNeighbour,
            ResampleAlg::Bilinear => GDALResampleAlg::GRA_Bilinear,
            ResampleAlg::Cubic => GDALResampleAlg::GRA_Cubic,
            ResampleAlg::CubicSpline => GDALResampleAlg::GRA_CubicSpline,
            ResampleAlg::Lanczos => GDALResampleAlg::GRA_Lanczos,
            ResampleAlg::Average => GDALResampleAlg::GRA_Average,
            ResampleAlg::Mode => GDALResampleAlg::GRA_Mode,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResampleAlg::NearestNeighbour => "near",
            ResampleAlg::Bilinear => "bilinear",
            ResampleAlg::Cubic => "cubic",
            ResampleAlg::CubicSpline => "cubicspline",
            ResampleAlg::Lanczos => "lanczos",
            ResampleAlg::Average => "average",
            ResampleAlg::Mode => "mode",
        }
    }
}

impl FromStr for ResampleAlg {
    type Err = RetileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "near" | "nearest" => Ok(ResampleAlg::NearestNeighbour),
            "bilinear" => Ok(ResampleAlg::Bilinear),
            "cubic" => Ok(ResampleAlg::Cubic),
            "cubicspline" => Ok(ResampleAlg::CubicSpline),
            "lanczos" => Ok(ResampleAlg::Lanczos),
            "average" => Ok(ResampleAlg::Average),
            "mode" => Ok(ResampleAlg::Mode),
            _ => Err(RetileError::BadArgument(format!(
                "Unknown resampling method: '{s}'"
            ))),
        }
    }
}

impl Display for ResampleAlg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resample `src` into the already georeferenced `dst`.
///
/// Both datasets keep their own spatial reference, so this reduces to a change of
/// resolution and extent when they share one. Wraps `GDALReprojectImage`.
pub fn reproject_into(src: &Dataset, dst: &Dataset, alg: ResampleAlg) -> Result<()> {
    let rv = unsafe {
        gdal_sys::GDALReprojectImage(
            src.c_dataset(),
            ptr::null(),
            dst.c_dataset(),
            ptr::null(),
            alg.to_gdal(),
            0.0,
            0.0,
            None,
            ptr::null_mut(),
            ptr::null_mut(),
        )
    };
    if rv != CPLErr::CE_None {
        return Err(_last_cpl_err(rv));
    }
    Ok(())
}
