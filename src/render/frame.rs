use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{VizError, VizResult};

/// One finished `(height, width, 3)` 8-bit RGB image, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RenderedFrame {
    /// Wrap `data`, which must hold exactly `width * height * 3` samples.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> VizResult<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(VizError::config(format!(
                "frame buffer holds {} bytes, {width}x{height} RGB needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(height, width, channels)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, 3)
    }

    /// Interleaved RGB samples.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Consume into interleaved RGB samples.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// RGB at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Write as PNG, creating parent directories.
    pub fn save_png(&self, path: impl AsRef<Path>) -> VizResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgb8,
            image::ImageFormat::Png,
        )
        .map_err(|e| VizError::encode(format!("write png '{}': {e}", path.display())))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
