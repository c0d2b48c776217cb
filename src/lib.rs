//! cppnviz renders audio-reactive abstract video from a compositional pattern-producing network.
//!
//! A [`PatternField`] maps `[x, y, time, audio features...]` to an RGB color. A [`FrameRenderer`]
//! evaluates it over a pixel grid in memory-bounded batches, and a [`FrameSequence`] drives the
//! renderer across an [`AudioTrack`], optionally mutating the field as it goes. Frames stream
//! into a [`FrameSink`](encode::sink::FrameSink) one at a time.
//!
//! - Build a [`RenderSession`] from a [`RenderConfig`] and an [`AudioTrack`]
//! - Optionally load tuned weights through [`WeightStore`]
//! - Render single frames or stream the whole sequence into a sink
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod audio;
mod device;
mod field;
mod foundation;
mod sequence;

/// Render configuration and resolution presets.
pub mod config;
/// Frame sinks (PNG export, ffmpeg MP4 encoding).
pub mod encode;
/// Frame rendering.
pub mod render;
/// Session-oriented rendering API.
pub mod session;

pub use crate::audio::track::{AudioTrack, Normalization};
pub use crate::config::{RenderConfig, resolution_preset};
pub use crate::device::{Device, DeviceRequest, DeviceSelection, Precision};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::png::PngSequenceSink;
pub use crate::encode::sink::{FanoutSink, FrameSink, InMemorySink, SinkConfig};
pub use crate::field::activation::{ACTIVATION_CYCLE, Activation};
pub use crate::field::pattern::{
    Architecture, FieldOptions, ForwardScratch, HIDDEN_GAIN, LinearLayer, OUTPUT_DIM, OUTPUT_GAIN,
    PatternField, SPATIAL_TIME_INPUTS,
};
pub use crate::field::store::{
    Checkpoint, CheckpointInfo, ParameterMap, TensorSnapshot, WeightStore, load_parameters,
    snapshot_parameters,
};
pub use crate::foundation::core::{Fps, FrameIndex, Resolution};
pub use crate::foundation::error::{VizError, VizResult};
pub use crate::render::backend::{BackendKind, ComputeBackend};
pub use crate::render::batch::MemoryEstimate;
pub use crate::render::frame::RenderedFrame;
pub use crate::render::renderer::{FrameRenderer, RendererOpts};
pub use crate::sequence::diagnostics::{FrameStats, VariationLevel, VariationReport};
pub use crate::sequence::sequencer::{FrameSequence, RenderStats, SequenceOpts};
pub use crate::session::{RenderSession, RenderSummary};
