//! Frame sinks.
//!
//! Sinks consume rendered frames in index order; `RenderSession::render_to_sink` drives them.

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// PNG frame export.
pub mod png;
/// Frame sink trait and built-in sinks.
pub mod sink;
