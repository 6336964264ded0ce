use std::mem::MaybeUninit;

use geo_types::{coord, Rect};

use crate::errors::{Result, RetileError};

/// An affine transform.
///
/// A six-element array storing the coefficients of an [affine transform]
/// used in mapping coordinates between pixel/line `(P, L)` (raster) space,
/// and `(Xp,Yp)` (georeferenced) space.
///
///   * `GeoTransform[0]`: x-coordinate of the upper-left corner of the upper-left pixel.
///   * `GeoTransform[1]`: W-E pixel resolution (pixel width).
///   * `GeoTransform[2]`: row rotation (typically zero).
///   * `GeoTransform[3]`: y-coordinate of the upper-left corner of the upper-left pixel.
///   * `GeoTransform[4]`: column rotation (typically zero).
///   * `GeoTransform[5]`: N-S pixel resolution (pixel height), negative value for a North-up image.
///
/// [affine transform]: https://en.wikipedia.org/wiki/Affine_transformation
pub type GeoTransform = [f64; 6];

/// Extension methods on [`GeoTransform`]
pub trait GeoTransformEx {
    /// Apply GeoTransform to x/y coordinate.
    ///
    /// Wraps [GDALApplyGeoTransform].
    ///
    /// [GDALApplyGeoTransform]: https://gdal.org/api/raster_c_api.html#_CPPv421GDALApplyGeoTransformPdddPdPd
    fn apply(&self, pixel: f64, line: f64) -> (f64, f64);

    /// Invert a [`GeoTransform`].
    ///
    /// Wraps [GDALInvGeoTransform].
    ///
    /// [GDALInvGeoTransform]: https://gdal.org/api/raster_c_api.html#_CPPv419GDALInvGeoTransformPdPd
    fn invert(&self) -> Result<GeoTransform>;

    /// `true` when both rotation terms are zero.
    fn is_axis_aligned(&self) -> bool;
}

impl GeoTransformEx for GeoTransform {
    fn apply(&self, pixel: f64, line: f64) -> (f64, f64) {
        let mut geo_x = MaybeUninit::<f64>::uninit();
        let mut geo_y = MaybeUninit::<f64>::uninit();
        unsafe {
            gdal_sys::GDALApplyGeoTransform(
                self.as_ptr() as *mut f64,
                pixel,
                line,
                geo_x.as_mut_ptr(),
                geo_y.as_mut_ptr(),
            );
            (geo_x.assume_init(), geo_y.assume_init())
        }
    }

    fn invert(&self) -> Result<GeoTransform> {
        let mut gt_out = MaybeUninit::<GeoTransform>::uninit();
        let rv = unsafe {
            gdal_sys::GDALInvGeoTransform(
                self.as_ptr() as *mut f64,
                (*gt_out.as_mut_ptr()).as_mut_ptr(),
            )
        };
        if rv == 0 {
            return Err(RetileError::BadArgument(
                "Geo transform is uninvertible".to_string(),
            ));
        }
        let result = unsafe { gt_out.assume_init() };
        Ok(result)
    }

    fn is_axis_aligned(&self) -> bool {
        self[2] == 0.0 && self[4] == 0.0
    }
}

/// The north-up grid a mosaic or a tile lives on: an origin and a signed pixel size.
///
/// `scale_y` is usually negative (rows run southwards) but positive grids are handled
/// everywhere the grid is used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineGrid {
    pub ulx: f64,
    pub uly: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl AffineGrid {
    pub fn new(ulx: f64, uly: f64, scale_x: f64, scale_y: f64) -> Self {
        AffineGrid {
            ulx,
            uly,
            scale_x,
            scale_y,
        }
    }

    /// Build a grid from a geotransform, rejecting rotated transforms.
    pub fn from_geo_transform(transform: &GeoTransform) -> Option<Self> {
        if !transform.is_axis_aligned() || transform[1] == 0.0 || transform[5] == 0.0 {
            return None;
        }
        Some(AffineGrid::new(
            transform[0],
            transform[3],
            transform[1],
            transform[5],
        ))
    }

    pub fn to_geo_transform(&self) -> GeoTransform {
        [self.ulx, self.scale_x, 0.0, self.uly, 0.0, self.scale_y]
    }

    /// Same origin, pixels `factor` times as large.
    pub fn scaled(&self, factor: f64) -> Self {
        AffineGrid::new(
            self.ulx,
            self.uly,
            self.scale_x * factor,
            self.scale_y * factor,
        )
    }

    /// Georeferenced corner `(x, y)` of pixel `(x_off, y_off)`.
    pub fn corner(&self, x_off: usize, y_off: usize) -> (f64, f64) {
        self.to_geo_transform().apply(x_off as f64, y_off as f64)
    }

    /// Upper-left and lower-right corners of a pixel window.
    pub fn corners_for(
        &self,
        x_off: usize,
        y_off: usize,
        width: usize,
        height: usize,
    ) -> ((f64, f64), (f64, f64)) {
        let upper_left = self.corner(x_off, y_off);
        let lower_right = self.corner(x_off + width, y_off + height);
        (upper_left, lower_right)
    }

    /// Georeferenced bounding rectangle of a pixel window.
    pub fn bounds_for(&self, x_off: usize, y_off: usize, width: usize, height: usize) -> Rect<f64> {
        let ((ulx, uly), (lrx, lry)) = self.corners_for(x_off, y_off, width, height);
        Rect::new(coord! { x: ulx, y: uly }, coord! { x: lrx, y: lry })
    }

    /// Geotransform of a window whose upper-left pixel is `(x_off, y_off)`.
    pub fn window_transform(&self, x_off: usize, y_off: usize) -> GeoTransform {
        let (ulx, uly) = self.corner(x_off, y_off);
        AffineGrid::new(ulx, uly, self.scale_x, self.scale_y).to_geo_transform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_and_invert() {
        let transform: GeoTransform = [1000.0, 10.0, 0.0, 2000.0, 0.0, -10.0];
        let (x, y) = transform.apply(3.0, 4.0);
        assert_eq!((x, y), (1030.0, 1960.0));
        let inverse = transform.invert().unwrap();
        assert_eq!(inverse.apply(x, y), (3.0, 4.0));
    }

    #[test]
    fn test_grid_rejects_rotation() {
        assert!(AffineGrid::from_geo_transform(&[0.0, 1.0, 0.5, 0.0, 0.0, -1.0]).is_none());
        assert!(AffineGrid::from_geo_transform(&[0.0, 1.0, 0.0, 0.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn test_bounds_for_window() {
        let grid = AffineGrid::new(100.0, 500.0, 2.0, -2.0);
        let bounds = grid.bounds_for(10, 20, 5, 5);
        assert_eq!(bounds.min().x, 120.0);
        assert_eq!(bounds.max().x, 130.0);
        assert_eq!(bounds.min().y, 450.0);
        assert_eq!(bounds.max().y, 460.0);

        assert_eq!(
            grid.window_transform(10, 20),
            [120.0, 2.0, 0.0, 460.0, 0.0, -2.0]
        );
        assert_eq!(grid.scaled(2.0).scale_y, -4.0);
    }
}
