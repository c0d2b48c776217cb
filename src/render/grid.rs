use crate::foundation::core::Resolution;
use crate::foundation::error::{VizError, VizResult};
use crate::foundation::math::linspace;

/// Default half-extent of the coordinate grid.
///
/// Keeps the spatial inputs in the same magnitude band as the remapped time column and the
/// amplified audio features.
pub const DEFAULT_COORD_SCALE: f32 = 0.5;

/// Normalized pixel coordinates, computed once per resolution.
///
/// Pixel `p` sits at row `p / width`, column `p % width` (x varies fastest). Both axes span
/// `[-scale, scale]` inclusive.
#[derive(Clone, Debug)]
pub struct PixelGrid {
    resolution: Resolution,
    scale: f32,
    xs: Vec<f32>,
    ys: Vec<f32>,
}

impl PixelGrid {
    /// Precompute the grid for `resolution`.
    pub fn new(resolution: Resolution, scale: f32) -> VizResult<Self> {
        if resolution.width == 0 || resolution.height == 0 {
            return Err(VizError::config(format!(
                "resolution must be positive, got {resolution}"
            )));
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(VizError::config(format!(
                "coordinate scale must be positive and finite, got {scale}"
            )));
        }
        let s = f64::from(scale);
        Ok(Self {
            resolution,
            scale,
            xs: linspace(-s, s, resolution.width as usize),
            ys: linspace(-s, s, resolution.height as usize),
        })
    }

    /// Grid resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Half-extent of both axes.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.resolution.pixel_count()
    }

    /// Always false; zero-sized grids are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of pixel `p` in flat row-major order.
    #[inline]
    pub fn coord(&self, p: usize) -> (f32, f32) {
        let w = self.xs.len();
        (self.xs[p % w], self.ys[p / w])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/grid.rs"]
mod tests;
