//! RGBA raster of the canvas, ten image pixels per cell.
//!
//! The raster is kept in lockstep with `CanvasState`: a snapshot repaints it
//! whole, an update repaints one cell block. It also backs PNG export.

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;

use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::ClientError;
use crate::state::canvas::{CanvasState, GridSize};

/// Edge length of one cell in image pixels.
pub const CELL_PX: u32 = 10;

const BACKGROUND: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0xFF]);

#[derive(Clone, Debug)]
pub struct Raster {
    grid: GridSize,
    image: RgbaImage,
}

impl Raster {
    /// Blank (background-filled) raster for `grid`. Edges beyond
    /// [`MAX_GRID_DIM`](crate::state::canvas::MAX_GRID_DIM) are cut down to it.
    #[must_use]
    pub fn new(grid: GridSize) -> Self {
        let clamped = grid.clamped();
        if clamped != grid {
            tracing::warn!(width = grid.width, height = grid.height, "raster: grid too large; clamping");
        }
        let width = clamped.width.saturating_mul(CELL_PX);
        let height = clamped.height.saturating_mul(CELL_PX);
        Self { grid: clamped, image: RgbaImage::from_pixel(width, height, BACKGROUND) }
    }

    #[must_use]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Clear to background and paint every cell of `canvas`.
    pub fn repaint(&mut self, canvas: &CanvasState) {
        for pixel in self.image.pixels_mut() {
            *pixel = BACKGROUND;
        }
        for ((x, y), cell) in canvas.iter() {
            self.paint_cell(x, y, &cell.color);
        }
    }

    /// Fill one cell block. Returns `false` without painting when the cell
    /// lies outside the grid or the color is not `#RRGGBB`.
    pub fn paint_cell(&mut self, x: u32, y: u32, color: &str) -> bool {
        if !self.grid.contains(x, y) {
            return false;
        }
        let Some(rgba) = parse_hex_color(color) else {
            tracing::debug!(x, y, color, "raster: skipping unparseable color");
            return false;
        };
        for dy in 0..CELL_PX {
            for dx in 0..CELL_PX {
                self.image.put_pixel(x * CELL_PX + dx, y * CELL_PX + dy, rgba);
            }
        }
        true
    }

    /// Color currently drawn for a cell.
    #[must_use]
    pub fn cell_color(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.grid.contains(x, y).then(|| *self.image.get_pixel(x * CELL_PX, y * CELL_PX))
    }

    /// Write the raster as a PNG file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Image`] when encoding or writing fails.
    pub fn save_png(&self, path: &Path) -> Result<(), ClientError> {
        self.image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

/// Parse `#RRGGBB` (case-insensitive) into an opaque RGBA value.
#[must_use]
pub fn parse_hex_color(color: &str) -> Option<Rgba<u8>> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 0xFF]))
}
