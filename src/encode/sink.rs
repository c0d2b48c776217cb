use std::path::PathBuf;

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{VizError, VizResult};
use crate::render::frame::RenderedFrame;

/// Configuration handed to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Frames that will be pushed, for progress reporting.
    pub expected_frames: u64,
    /// Optional audio file to mux alongside the video.
    pub audio: Option<PathBuf>,
}

/// Consumer of rendered frames.
///
/// `push_frame` is called in strictly increasing [`FrameIndex`] order, only with complete frames.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> VizResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderedFrame) -> VizResult<()>;
    /// Called once after the last frame.
    fn end(&mut self) -> VizResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, RenderedFrame)>,
    finished: bool,
}

impl InMemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(FrameIndex, RenderedFrame)] {
        &self.frames
    }

    /// Whether `end` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> VizResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderedFrame) -> VizResult<()> {
        if self.cfg.is_none() {
            return Err(VizError::encode("in-memory sink not started"));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> VizResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// Forwards every call to each inner sink in order.
///
/// Used to export PNG frames and encode video in one pass.
pub struct FanoutSink {
    sinks: Vec<Box<dyn FrameSink>>,
}

impl FanoutSink {
    /// Wrap `sinks`.
    pub fn new(sinks: Vec<Box<dyn FrameSink>>) -> Self {
        Self { sinks }
    }

    /// Number of wrapped sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether no sinks are wrapped.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl FrameSink for FanoutSink {
    fn begin(&mut self, cfg: SinkConfig) -> VizResult<()> {
        self.sinks.iter_mut().try_for_each(|s| s.begin(cfg.clone()))
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderedFrame) -> VizResult<()> {
        self.sinks.iter_mut().try_for_each(|s| s.push_frame(idx, frame))
    }

    fn end(&mut self) -> VizResult<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(err) = sink.end() {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Check a frame against the sink configuration and the previous index.
pub(crate) fn check_frame(
    cfg: &SinkConfig,
    last: Option<FrameIndex>,
    idx: FrameIndex,
    frame: &RenderedFrame,
) -> VizResult<()> {
    if let Some(last) = last
        && idx.0 <= last.0
    {
        return Err(VizError::encode(format!(
            "out-of-order frame index {} after {}",
            idx.0, last.0
        )));
    }
    if frame.width() != cfg.width || frame.height() != cfg.height {
        return Err(VizError::encode(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width(),
            frame.height(),
            cfg.width,
            cfg.height
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
