//! Frame rendering.

/// Batch evaluator trait and selection.
pub mod backend;
/// Batch sizing, the reusable input buffer and memory estimates.
pub mod batch;
/// Row-parallel CPU evaluator.
pub mod cpu;
/// Finished RGB frames.
pub mod frame;
#[cfg(feature = "gpu")]
pub(crate) mod gpu;
/// Pixel coordinate grid.
pub mod grid;
/// [`renderer::FrameRenderer`].
pub mod renderer;
