//! Tile grid layout and the pixel window arithmetic used to assemble tiles from a mosaic.

use geo_types::Rect;

use crate::errors::{Result, RetileError};
use crate::geo_transform::{AffineGrid, GeoTransformEx};

/// How a raster of `width` x `height` pixels is cut into tiles of at most
/// `tile_width` x `tile_height` pixels, neighbours sharing `overlap` pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub width: usize,
    pub height: usize,
    pub tile_width: usize,
    pub tile_height: usize,
    pub overlap: usize,
    pub count_x: usize,
    pub count_y: usize,
}

impl TileGrid {
    pub fn new(
        width: usize,
        height: usize,
        tile_width: usize,
        tile_height: usize,
        overlap: usize,
    ) -> Result<Self> {
        if tile_width == 0 || tile_height == 0 {
            return Err(RetileError::BadArgument(format!(
                "Invalid tile dimension {tile_width},{tile_height}"
            )));
        }
        if overlap >= tile_width || overlap >= tile_height {
            return Err(RetileError::BadArgument(format!(
                "Overlap {overlap} too big w.r.t. tile dimension {tile_width},{tile_height}"
            )));
        }
        Ok(TileGrid {
            width,
            height,
            tile_width,
            tile_height,
            overlap,
            count_x: tile_count(width, tile_width, overlap),
            count_y: tile_count(height, tile_height, overlap),
        })
    }

    /// Number of digits needed to print the largest row or column index.
    pub fn index_digits(&self) -> usize {
        self.count_x.max(self.count_y).to_string().len()
    }

    pub fn len(&self) -> usize {
        self.count_x * self.count_y
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All tiles, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = TileWindow> + '_ {
        (1..=self.count_y)
            .flat_map(move |row| (1..=self.count_x).map(move |col| self.tile(row, col)))
    }

    /// The window of the tile at 1-based `row` and `col`, clipped to the raster.
    pub fn tile(&self, row: usize, col: usize) -> TileWindow {
        let x_off = (col - 1) * (self.tile_width - self.overlap);
        let y_off = (row - 1) * (self.tile_height - self.overlap);
        TileWindow {
            row,
            col,
            x_off,
            y_off,
            width: self.tile_width.min(self.width.saturating_sub(x_off)),
            height: self.tile_height.min(self.height.saturating_sub(y_off)),
        }
    }
}

fn tile_count(size: usize, tile_size: usize, overlap: usize) -> usize {
    if size <= tile_size {
        return 1;
    }
    let step = tile_size - overlap;
    1 + (size - tile_size + step - 1) / step
}

/// One tile of a [`TileGrid`]: its 1-based position and its pixel window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileWindow {
    pub row: usize,
    pub col: usize,
    pub x_off: usize,
    pub y_off: usize,
    pub width: usize,
    pub height: usize,
}

impl TileWindow {
    /// Georeferenced extent of this tile on `grid`.
    pub fn bounds(&self, grid: &AffineGrid) -> Rect<f64> {
        grid.bounds_for(self.x_off, self.y_off, self.width, self.height)
    }
}

/// A rectangle of pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelWindow {
    pub x_off: usize,
    pub y_off: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn offset(&self) -> (usize, usize) {
        (self.x_off, self.y_off)
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// A georeferenced raster as seen by the window arithmetic: its grid and pixel size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridFootprint {
    pub grid: AffineGrid,
    pub width: usize,
    pub height: usize,
}

impl GridFootprint {
    pub fn new(grid: AffineGrid, width: usize, height: usize) -> Self {
        GridFootprint {
            grid,
            width,
            height,
        }
    }

    /// Georeferenced extent of the whole raster.
    pub fn bounds(&self) -> Rect<f64> {
        self.grid.bounds_for(0, 0, self.width, self.height)
    }

    fn lower_right(&self) -> (f64, f64) {
        self.grid.corner(self.width, self.height)
    }
}

/// Rounds the way the mosaic arithmetic always has: add one half and truncate towards
/// zero. Negative results are kept so callers can detect empty windows.
fn round_half(value: f64) -> i64 {
    (value + 0.5) as i64
}

/// The part of `source` that falls inside `target`, as a pair of pixel windows:
/// where to read in the source and where to write in the target.
///
/// Both rasters must share the orientation of their y axis. Returns `None` when the
/// intersection is empty in either raster.
pub fn pixel_windows(
    source: &GridFootprint,
    target: &GridFootprint,
) -> Option<(PixelWindow, PixelWindow)> {
    let src = &source.grid;
    let dst = &target.grid;
    let (src_lrx, src_lry) = source.lower_right();
    let (dst_lrx, dst_lry) = target.lower_right();

    let ulx = src.ulx.max(dst.ulx);
    let lrx = src_lrx.min(dst_lrx);
    let (uly, lry) = if dst.scale_y < 0.0 {
        (src.uly.min(dst.uly), src_lry.max(dst_lry))
    } else {
        (src.uly.max(dst.uly), src_lry.min(dst_lry))
    };

    let src_window = window_in(source, ulx, uly, lrx, lry)?;
    let dst_window = window_in(target, ulx, uly, lrx, lry)?;
    Some((src_window, dst_window))
}

fn window_in(
    raster: &GridFootprint,
    ulx: f64,
    uly: f64,
    lrx: f64,
    lry: f64,
) -> Option<PixelWindow> {
    let to_pixel = raster.grid.to_geo_transform().invert().ok()?;
    let (left, top) = to_pixel.apply(ulx, uly);
    let (right, bottom) = to_pixel.apply(lrx, lry);
    let x_off = round_half(left);
    let y_off = round_half(top);
    let x_end = round_half(right).min(raster.width as i64);
    let y_end = round_half(bottom).min(raster.height as i64);
    let width = x_end - x_off;
    let height = y_end - y_off;
    if width <= 0 || height <= 0 || x_off < 0 || y_off < 0 {
        return None;
    }
    Some(PixelWindow {
        x_off: x_off as usize,
        y_off: y_off as usize,
        width: width as usize,
        height: height as usize,
    })
}

/// Pixel size of the raster covering `[minx, maxx] x [miny, maxy]` on a grid with the
/// given pixel size.
pub fn raster_size_for(extent: &Rect<f64>, scale_x: f64, scale_y: f64) -> (usize, usize) {
    let width = round_half(extent.width() / scale_x.abs()).max(0) as usize;
    let height = round_half(extent.height() / scale_y.abs()).max(0) as usize;
    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::coord;

    #[test]
    fn test_tile_count_without_overlap() {
        let grid = TileGrid::new(1000, 600, 256, 256, 0).unwrap();
        assert_eq!((grid.count_x, grid.count_y), (4, 3));
        assert_eq!(grid.len(), 12);

        let exact = TileGrid::new(512, 256, 256, 256, 0).unwrap();
        assert_eq!((exact.count_x, exact.count_y), (2, 1));

        let small = TileGrid::new(10, 10, 256, 256, 0).unwrap();
        assert_eq!((small.count_x, small.count_y), (1, 1));
    }

    #[test]
    fn test_tile_count_with_overlap() {
        // Steps of 90 pixels: tiles start at 0, 90, 180 and the last one covers 180..280.
        let grid = TileGrid::new(280, 100, 100, 100, 10).unwrap();
        assert_eq!(grid.count_x, 3);
        assert_eq!(grid.count_y, 1);
        let last = grid.tile(1, 3);
        assert_eq!(last.x_off, 180);
        assert_eq!(last.width, 100);

        let grid = TileGrid::new(300, 100, 100, 100, 10).unwrap();
        assert_eq!(grid.count_x, 4);
        assert_eq!(grid.tile(1, 4).x_off, 270);
        assert_eq!(grid.tile(1, 4).width, 30);
    }

    #[test]
    fn test_tiles_are_row_major_and_clipped() {
        let grid = TileGrid::new(5, 3, 2, 2, 0).unwrap();
        let tiles: Vec<_> = grid.tiles().collect();
        assert_eq!(tiles.len(), 6);
        assert_eq!((tiles[0].row, tiles[0].col), (1, 1));
        assert_eq!((tiles[1].row, tiles[1].col), (1, 2));
        assert_eq!((tiles[3].row, tiles[3].col), (2, 1));
        assert_eq!(
            tiles[5],
            TileWindow {
                row: 2,
                col: 3,
                x_off: 4,
                y_off: 2,
                width: 1,
                height: 1
            }
        );
    }

    #[test]
    fn test_invalid_grid() {
        assert!(TileGrid::new(100, 100, 0, 256, 0).is_err());
        assert!(TileGrid::new(100, 100, 256, 256, 256).is_err());
    }

    #[test]
    fn test_index_digits() {
        assert_eq!(TileGrid::new(100, 100, 10, 10, 0).unwrap().index_digits(), 2);
        assert_eq!(TileGrid::new(100, 100, 100, 100, 0).unwrap().index_digits(), 1);
        assert_eq!(TileGrid::new(1000, 10, 10, 10, 0).unwrap().index_digits(), 3);
    }

    #[test]
    fn test_pixel_windows_partial_overlap() {
        // Source covers x 0..100, y 100..0 at 1 unit per pixel.
        let source = GridFootprint::new(AffineGrid::new(0.0, 100.0, 1.0, -1.0), 100, 100);
        // Target covers x 50..150, y 80..30 at 1 unit per pixel.
        let target = GridFootprint::new(AffineGrid::new(50.0, 80.0, 1.0, -1.0), 100, 50);

        let (src, dst) = pixel_windows(&source, &target).unwrap();
        assert_eq!(
            src,
            PixelWindow {
                x_off: 50,
                y_off: 20,
                width: 50,
                height: 50
            }
        );
        assert_eq!(
            dst,
            PixelWindow {
                x_off: 0,
                y_off: 0,
                width: 50,
                height: 50
            }
        );
    }

    #[test]
    fn test_pixel_windows_with_different_resolution() {
        // Source at 1 unit per pixel, target at 2 units per pixel over the same area.
        let source = GridFootprint::new(AffineGrid::new(0.0, 40.0, 1.0, -1.0), 40, 40);
        let target = GridFootprint::new(AffineGrid::new(0.0, 40.0, 2.0, -2.0), 20, 20);
        let (src, dst) = pixel_windows(&source, &target).unwrap();
        assert_eq!(src.size(), (40, 40));
        assert_eq!(dst.size(), (20, 20));
    }

    #[test]
    fn test_pixel_windows_positive_scale_y() {
        let source = GridFootprint::new(AffineGrid::new(0.0, 0.0, 1.0, 1.0), 10, 10);
        let target = GridFootprint::new(AffineGrid::new(5.0, 5.0, 1.0, 1.0), 10, 10);
        let (src, dst) = pixel_windows(&source, &target).unwrap();
        assert_eq!(src.offset(), (5, 5));
        assert_eq!(src.size(), (5, 5));
        assert_eq!(dst.offset(), (0, 0));
        assert_eq!(dst.size(), (5, 5));
    }

    #[test]
    fn test_pixel_windows_disjoint_or_touching() {
        let source = GridFootprint::new(AffineGrid::new(0.0, 10.0, 1.0, -1.0), 10, 10);
        let touching = GridFootprint::new(AffineGrid::new(10.0, 10.0, 1.0, -1.0), 10, 10);
        assert!(pixel_windows(&source, &touching).is_none());
        let far = GridFootprint::new(AffineGrid::new(100.0, 10.0, 1.0, -1.0), 10, 10);
        assert!(pixel_windows(&source, &far).is_none());
    }

    #[test]
    fn test_raster_size_for() {
        let extent = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 100.0, y: 50.0 });
        assert_eq!(raster_size_for(&extent, 2.0, -2.0), (50, 25));
        assert_eq!(raster_size_for(&extent, 3.0, -3.0), (33, 17));
    }
}
