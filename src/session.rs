//! Session-oriented rendering API.
//!
//! A session front-loads everything that does not change per frame (configuration checks,
//! feature preparation, field construction or snapshot loading, batch sizing) and then renders
//! single frames or streams a whole sequence into a [`FrameSink`].

use std::path::PathBuf;

use crate::audio::track::AudioTrack;
use crate::config::RenderConfig;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::field::pattern::PatternField;
use crate::field::store::Checkpoint;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{VizError, VizResult};
use crate::render::batch::MemoryEstimate;
use crate::render::frame::RenderedFrame;
use crate::render::renderer::FrameRenderer;
use crate::sequence::diagnostics::VariationReport;
use crate::sequence::sequencer::{FrameSequence, RenderStats};

/// Outcome of [`RenderSession::render_to_sink`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RenderSummary {
    /// Sequence counters.
    pub stats: RenderStats,
    /// Output-variation diagnostics over the sampled frames.
    pub variation: Option<VariationReport>,
}

/// Renderer plus prepared audio features for one output.
#[derive(Debug)]
pub struct RenderSession {
    config: RenderConfig,
    track: AudioTrack,
    renderer: FrameRenderer,
}

impl RenderSession {
    /// Build a session.
    ///
    /// `track` is normalized and scaled per `config`. With `weights`, the snapshot's architecture
    /// metadata wins over `config`; bare snapshots use the architecture `config` describes. The
    /// resulting field must accept the track's feature width.
    pub fn new(
        config: RenderConfig,
        track: AudioTrack,
        weights: Option<Checkpoint>,
    ) -> VizResult<Self> {
        config.validate()?;
        let track = track
            .normalized(config.normalization)
            .scaled(config.audio_scale);
        if (track.fps() - config.frame_rate()?.as_f64()).abs() > 1e-6 {
            tracing::warn!(
                track_fps = track.fps(),
                output_fps = config.fps,
                "feature frame rate differs from output frame rate"
            );
        }

        let arch = config.architecture(track.feature_width())?;
        let opts = config.field_options();
        let field = match weights {
            Some(ckpt) => ckpt.into_field(Some(arch), &opts)?,
            None => {
                tracing::info!("using random initialization");
                PatternField::new(arch, &opts)?
            }
        };
        Self::with_field(config, track, field)
    }

    /// Build a session around an existing field. `track` is used as given.
    pub fn with_field(
        config: RenderConfig,
        track: AudioTrack,
        field: PatternField,
    ) -> VizResult<Self> {
        config.validate()?;
        if field.feature_width() != track.feature_width() {
            return Err(VizError::config(format!(
                "field expects {} audio features per frame, track provides {}",
                field.feature_width(),
                track.feature_width()
            )));
        }
        let renderer = FrameRenderer::new(field, config.resolution()?, config.renderer_opts())?;
        Ok(Self {
            config,
            track,
            renderer,
        })
    }

    /// Effective configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Prepared audio features.
    pub fn track(&self) -> &AudioTrack {
        &self.track
    }

    /// The renderer.
    pub fn renderer(&self) -> &FrameRenderer {
        &self.renderer
    }

    /// Frames a full render produces.
    pub fn num_frames(&self) -> usize {
        self.track.num_frames()
    }

    /// Memory figures for this session.
    pub fn estimate_memory(&self) -> MemoryEstimate {
        self.renderer.estimate_memory()
    }

    /// Render frame `idx` of the sequence without evolution.
    pub fn render_frame(&mut self, idx: usize) -> VizResult<RenderedFrame> {
        let total = self.track.num_frames();
        let features = self.track.frame(idx).ok_or_else(|| {
            VizError::config(format!("frame {idx} is outside the {total}-frame track"))
        })?;
        self.renderer
            .render_frame(FrameSequence::frame_time(idx, total), features)
    }

    /// Render the whole sequence into `sink`.
    ///
    /// Only complete frames reach the sink. On failure the sink is still ended so it can
    /// finalize what it received, and the render error is returned.
    pub fn render_to_sink(
        &mut self,
        sink: &mut dyn FrameSink,
        audio: Option<PathBuf>,
    ) -> VizResult<RenderSummary> {
        let res = self.config.resolution()?;
        let fps = self.config.frame_rate()?;
        let progress_every = (self.config.fps as usize).max(1);
        let opts = self.config.sequence_opts();
        // The sink only begins once the sequence exists, so every begun sink is ended.
        let mut seq = self.renderer.render_sequence(&self.track, opts)?;
        sink.begin(SinkConfig {
            width: res.width,
            height: res.height,
            fps,
            expected_frames: self.track.num_frames() as u64,
            audio,
        })?;

        let total = seq.expected_frames();
        let mut outcome = Ok(());
        for (i, frame) in seq.by_ref().enumerate() {
            let pushed = frame.and_then(|f| sink.push_frame(FrameIndex(i as u64), &f));
            if let Err(err) = pushed {
                outcome = Err(err);
                break;
            }
            if (i + 1) % progress_every == 0 || i + 1 == total {
                tracing::info!(frame = i + 1, total, "rendered");
            }
        }
        let summary = RenderSummary {
            stats: seq.stats(),
            variation: seq.variation_report().cloned(),
        };

        let ended = sink.end();
        outcome?;
        ended?;
        let frames = summary.stats.frames_rendered as u64;
        tracing::info!(
            frames,
            seconds = fps.frames_to_secs(frames),
            "render finished"
        );
        Ok(summary)
    }

    /// Give the field back, e.g. to persist an evolved state.
    pub fn into_field(self) -> PatternField {
        self.renderer.into_field()
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
