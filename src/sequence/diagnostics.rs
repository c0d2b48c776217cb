//! Output-variation diagnostics.
//!
//! A near-constant image sequence usually means the amplified audio features swamp the spatial
//! inputs. This is reported to the operator and never corrected automatically.

use crate::foundation::math::mean_std_u8;
use crate::render::frame::RenderedFrame;

/// Average standard deviation below which output is considered flat.
pub const FLAT_STD: f64 = 1.0;
/// Average standard deviation below which output is considered low-contrast.
pub const LOW_STD: f64 = 10.0;

/// Whether frame `idx` of `total` is part of the diagnostic sample.
///
/// Roughly ten evenly spaced frames plus the first three.
pub fn is_sampled(idx: usize, total: usize) -> bool {
    idx.is_multiple_of((total / 10).max(1)) || idx < 3
}

/// Pixel statistics of one frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct FrameStats {
    /// Frame index.
    pub index: usize,
    /// Mean over all samples.
    pub mean: f64,
    /// Population standard deviation over all samples.
    pub std: f64,
    /// Mean per RGB channel.
    pub channel_mean: [f64; 3],
}

impl FrameStats {
    /// Measure `frame`.
    pub fn measure(index: usize, frame: &RenderedFrame) -> Self {
        let data = frame.as_raw();
        let (mean, std) = mean_std_u8(data.iter().copied());
        let channel_mean =
            std::array::from_fn(|c| mean_std_u8(data.iter().skip(c).step_by(3).copied()).0);
        Self {
            index,
            mean,
            std,
            channel_mean,
        }
    }
}

/// Coarse verdict on sequence variation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum VariationLevel {
    /// Almost no variation.
    Flat,
    /// Visible but weak variation.
    Low,
    /// Healthy variation.
    Good,
}

/// Summary over the sampled frames of a sequence.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VariationReport {
    /// Per-frame statistics that fed the summary.
    pub samples: Vec<FrameStats>,
    /// Average of the per-frame means.
    pub avg_mean: f64,
    /// Average of the per-frame standard deviations.
    pub avg_std: f64,
    /// Verdict derived from `avg_std`.
    pub level: VariationLevel,
}

impl VariationReport {
    /// Summarize `samples`; `None` when nothing was sampled.
    pub fn from_samples(samples: Vec<FrameStats>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let avg_mean = samples.iter().map(|s| s.mean).sum::<f64>() / n;
        let avg_std = samples.iter().map(|s| s.std).sum::<f64>() / n;
        let level = if avg_std < FLAT_STD {
            VariationLevel::Flat
        } else if avg_std < LOW_STD {
            VariationLevel::Low
        } else {
            VariationLevel::Good
        };
        Some(Self {
            samples,
            avg_mean,
            avg_std,
            level,
        })
    }

    /// Emit the verdict through `tracing`.
    pub fn log(&self) {
        match self.level {
            VariationLevel::Flat => tracing::warn!(
                avg_std = self.avg_std,
                "output is nearly flat; audio features may be overwhelming the spatial signal, \
                 try a lower audio scale"
            ),
            VariationLevel::Low => tracing::warn!(
                avg_std = self.avg_std,
                "output variation is low; consider adjusting the audio scale"
            ),
            VariationLevel::Good => tracing::info!(
                avg_std = self.avg_std,
                avg_mean = self.avg_mean,
                samples = self.samples.len(),
                "output variation looks healthy"
            ),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/diagnostics.rs"]
mod tests;
