//! Render configuration.
//!
//! Every field has a default, so a JSON file only needs the values it changes. CLI flags are
//! applied on top of the loaded file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;

use crate::audio::track::Normalization;
use crate::device::{DeviceRequest, Precision};
use crate::field::pattern::{Architecture, FieldOptions};
use crate::foundation::core::{Fps, Resolution};
use crate::foundation::error::{VizError, VizResult};
use crate::render::batch::DEFAULT_FEATURE_GAIN;
use crate::render::grid::DEFAULT_COORD_SCALE;
use crate::render::renderer::RendererOpts;
use crate::sequence::sequencer::{DEFAULT_CLEAR_CACHE_EVERY, DEFAULT_EVOLVE_EVERY, SequenceOpts};

/// Named resolutions accepted by [`resolution_preset`].
pub const RESOLUTION_PRESETS: [(&str, u32, u32); 6] = [
    ("360p", 640, 360),
    ("480p", 854, 480),
    ("720p", 1280, 720),
    ("1080p", 1920, 1080),
    ("1440p", 2560, 1440),
    ("4k", 3840, 2160),
];

/// Resolve a preset name such as `"1080p"`.
pub fn resolution_preset(name: &str) -> VizResult<Resolution> {
    let key = name.trim().to_ascii_lowercase();
    RESOLUTION_PRESETS
        .iter()
        .find(|(n, _, _)| *n == key)
        .map(|&(_, w, h)| Resolution::new(w, h))
        .unwrap_or_else(|| {
            let names: Vec<&str> = RESOLUTION_PRESETS.iter().map(|(n, _, _)| *n).collect();
            Err(VizError::config(format!(
                "unknown resolution preset '{name}' (expected one of {})",
                names.join(", ")
            )))
        })
}

/// All values the rendering core consumes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Hidden layer count.
    pub layers: usize,
    /// Hidden layer width.
    pub hidden_dim: usize,
    /// Evolution mutation rate; `0` disables evolution.
    pub evolve_rate: f32,
    /// Evolution period in frames.
    pub evolve_every: usize,
    /// Column normalization applied to audio features before scaling.
    pub normalization: Normalization,
    /// Scale applied to audio features before rendering.
    pub audio_scale: f32,
    /// Amplification applied to audio features inside the renderer.
    pub feature_gain: f32,
    /// Half-extent of the pixel coordinate grid.
    pub coord_scale: f32,
    /// Pixels per batch; `None` sizes batches automatically.
    pub batch_size: Option<usize>,
    /// Requested execution device.
    pub device: DeviceRequest,
    /// Requested arithmetic precision.
    pub precision: Precision,
    /// Forces full precision for gradient-based tuning.
    pub gradient_tuning: bool,
    /// Accelerator cache release period in frames; `0` disables.
    pub clear_cache_every: usize,
    /// RNG seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            layers: 4,
            hidden_dim: 256,
            evolve_rate: 0.0,
            evolve_every: DEFAULT_EVOLVE_EVERY,
            normalization: Normalization::MinMax,
            audio_scale: 0.05,
            feature_gain: DEFAULT_FEATURE_GAIN,
            coord_scale: DEFAULT_COORD_SCALE,
            batch_size: None,
            device: DeviceRequest::Auto,
            precision: Precision::Reduced,
            gradient_tuning: false,
            clear_cache_every: DEFAULT_CLEAR_CACHE_EVERY,
            seed: None,
        }
    }
}

impl RenderConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> VizResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| VizError::serde(format!("parse config '{}': {e}", path.display())))?;
        Ok(cfg)
    }

    /// Reject non-positive or non-finite values.
    pub fn validate(&self) -> VizResult<()> {
        Resolution::new(self.width, self.height)?;
        Fps::integer(self.fps)?;
        if self.layers == 0 || self.hidden_dim == 0 {
            return Err(VizError::config("layers and hidden_dim must be positive"));
        }
        if self.batch_size == Some(0) {
            return Err(VizError::config("batch_size must be positive"));
        }
        if !self.evolve_rate.is_finite() || self.evolve_rate < 0.0 {
            return Err(VizError::config(format!(
                "evolve_rate must be a non-negative number, got {}",
                self.evolve_rate
            )));
        }
        if self.evolve_rate > 0.0 && self.evolve_every == 0 {
            return Err(VizError::config(
                "evolve_every must be positive when evolution is enabled",
            ));
        }
        for (name, v) in [
            ("audio_scale", self.audio_scale),
            ("feature_gain", self.feature_gain),
        ] {
            if !v.is_finite() {
                return Err(VizError::config(format!("{name} must be finite, got {v}")));
            }
        }
        if !self.coord_scale.is_finite() || self.coord_scale <= 0.0 {
            return Err(VizError::config(format!(
                "coord_scale must be positive, got {}",
                self.coord_scale
            )));
        }
        Ok(())
    }

    /// Output resolution.
    pub fn resolution(&self) -> VizResult<Resolution> {
        Resolution::new(self.width, self.height)
    }

    /// Output frame rate.
    pub fn frame_rate(&self) -> VizResult<Fps> {
        Fps::integer(self.fps)
    }

    /// Architecture for `feature_width` audio features.
    pub fn architecture(&self, feature_width: usize) -> VizResult<Architecture> {
        Architecture::for_features(feature_width, self.hidden_dim, self.layers)
    }

    /// Field construction options.
    pub fn field_options(&self) -> FieldOptions {
        FieldOptions {
            device: self.device,
            precision: self.precision,
            gradient_tuning: self.gradient_tuning,
            seed: self.seed,
        }
    }

    /// Renderer construction options.
    pub fn renderer_opts(&self) -> RendererOpts {
        RendererOpts {
            batch_size: self.batch_size,
            coord_scale: self.coord_scale,
            feature_gain: self.feature_gain,
        }
    }

    /// Sequence options.
    pub fn sequence_opts(&self) -> SequenceOpts {
        SequenceOpts {
            evolve_rate: self.evolve_rate,
            evolve_every: self.evolve_every,
            clear_cache_every: self.clear_cache_every,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
