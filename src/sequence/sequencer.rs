use crate::audio::track::AudioTrack;
use crate::foundation::error::{VizError, VizResult};
use crate::render::frame::RenderedFrame;
use crate::render::renderer::FrameRenderer;
use crate::sequence::diagnostics::{FrameStats, VariationReport, is_sampled};

/// Default evolution period in frames.
pub const DEFAULT_EVOLVE_EVERY: usize = 10;
/// Default accelerator cache release period in frames.
pub const DEFAULT_CLEAR_CACHE_EVERY: usize = 100;

/// Options for [`FrameRenderer::render_sequence`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SequenceOpts {
    /// Evolution mutation rate; `0` disables evolution.
    pub evolve_rate: f32,
    /// Evolve before every frame whose index is a positive multiple of this.
    pub evolve_every: usize,
    /// Release cached accelerator memory after every this many frames; `0` never releases.
    pub clear_cache_every: usize,
}

impl Default for SequenceOpts {
    fn default() -> Self {
        Self {
            evolve_rate: 0.0,
            evolve_every: DEFAULT_EVOLVE_EVERY,
            clear_cache_every: DEFAULT_CLEAR_CACHE_EVERY,
        }
    }
}

/// Counters for one sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct RenderStats {
    /// Frames the sequence will yield.
    pub frames_total: usize,
    /// Frames yielded so far.
    pub frames_rendered: usize,
    /// Evolution steps applied.
    pub mutations_applied: usize,
    /// Accelerator cache releases.
    pub cache_releases: usize,
}

/// Forward-only, single-pass sequence of frames.
///
/// Frame `i` is rendered only when requested and is complete before it is yielded; nothing is
/// buffered. With a positive evolve rate the field is mutated in place before frames
/// `evolve_every`, `2 * evolve_every`, ... so frames before the first mutation point match a
/// non-evolving render. After an error the sequence ends.
#[derive(Debug)]
pub struct FrameSequence<'a> {
    renderer: &'a mut FrameRenderer,
    track: &'a AudioTrack,
    opts: SequenceOpts,
    next: usize,
    failed: bool,
    stats: RenderStats,
    samples: Vec<FrameStats>,
    report: Option<VariationReport>,
}

impl<'a> FrameSequence<'a> {
    pub(crate) fn new(
        renderer: &'a mut FrameRenderer,
        track: &'a AudioTrack,
        opts: SequenceOpts,
    ) -> VizResult<Self> {
        let expected = renderer.field().feature_width();
        if track.feature_width() != expected {
            return Err(VizError::config(format!(
                "audio track has {} features per frame, field expects {expected}",
                track.feature_width()
            )));
        }
        if opts.evolve_rate != 0.0 && opts.evolve_every == 0 {
            return Err(VizError::config(
                "evolve_every must be positive when evolution is enabled",
            ));
        }
        if !opts.evolve_rate.is_finite() {
            return Err(VizError::config(format!(
                "evolve rate must be finite, got {}",
                opts.evolve_rate
            )));
        }
        tracing::info!(
            frames = track.num_frames(),
            evolve_rate = opts.evolve_rate,
            evolve_every = opts.evolve_every,
            "sequence started"
        );
        Ok(Self {
            renderer,
            track,
            opts,
            next: 0,
            failed: false,
            stats: RenderStats {
                frames_total: track.num_frames(),
                ..RenderStats::default()
            },
            samples: Vec::new(),
            report: None,
        })
    }

    /// Frames this sequence yields in total.
    pub fn expected_frames(&self) -> usize {
        self.stats.frames_total
    }

    /// Counters so far.
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Variation summary, available once the sequence has been drained.
    pub fn variation_report(&self) -> Option<&VariationReport> {
        self.report.as_ref()
    }

    /// Playback position of frame `idx`: `idx / (n - 1)`, or `0` for a single frame.
    pub fn frame_time(idx: usize, total: usize) -> f32 {
        if total <= 1 {
            return 0.0;
        }
        (idx as f64 / (total - 1) as f64) as f32
    }

    fn render_next(&mut self, idx: usize) -> VizResult<RenderedFrame> {
        let total = self.stats.frames_total;
        if self.opts.evolve_rate != 0.0 && idx > 0 && idx.is_multiple_of(self.opts.evolve_every) {
            self.renderer.evolve(self.opts.evolve_rate);
            self.stats.mutations_applied += 1;
        }

        let features = self.track.frame(idx).ok_or_else(|| {
            VizError::config(format!("audio track has no features for frame {idx}"))
        })?;
        let frame = self
            .renderer
            .render_frame(Self::frame_time(idx, total), features)?;

        if is_sampled(idx, total) {
            self.samples.push(FrameStats::measure(idx, &frame));
        }
        if self.renderer.field().device().is_accelerated()
            && self.opts.clear_cache_every > 0
            && (idx + 1).is_multiple_of(self.opts.clear_cache_every)
        {
            self.renderer.release_cached_memory();
            self.stats.cache_releases += 1;
        }
        Ok(frame)
    }

    fn finish(&mut self) {
        tracing::info!(
            frames = self.stats.frames_rendered,
            mutations = self.stats.mutations_applied,
            "sequence finished"
        );
        self.report = VariationReport::from_samples(std::mem::take(&mut self.samples));
        if let Some(report) = self.report.as_ref() {
            report.log();
        }
    }
}

impl Iterator for FrameSequence<'_> {
    type Item = VizResult<RenderedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next >= self.stats.frames_total {
            return None;
        }
        let idx = self.next;
        self.next += 1;
        match self.render_next(idx) {
            Ok(frame) => {
                self.stats.frames_rendered += 1;
                if self.next == self.stats.frames_total {
                    self.finish();
                }
                Some(Ok(frame))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.failed {
            0
        } else {
            self.stats.frames_total - self.next
        };
        (0, Some(remaining))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/sequencer.rs"]
mod tests;
