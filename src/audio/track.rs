//! Per-frame audio feature matrix consumed by the renderer.
//!
//! Feature extraction itself happens upstream; this module only holds, validates, normalizes and
//! scales its output.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{VizError, VizResult};

/// Column-wise normalization applied before rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Leave values unchanged.
    None,
    /// Map each column's range onto `[-1, 1]`; constant columns use a unit range.
    #[default]
    MinMax,
    /// Standardize each column to zero mean, unit deviation; constant columns use unit deviation.
    ZScore,
}

impl std::str::FromStr for Normalization {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "minmax" | "min-max" => Ok(Self::MinMax),
            "zscore" | "z-score" => Ok(Self::ZScore),
            other => Err(VizError::config(format!(
                "unknown normalization '{other}' (expected none, minmax or zscore)"
            ))),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct TrackFile {
    features: Vec<Vec<f32>>,
    duration: f64,
    fps: f64,
    num_frames: usize,
}

/// `num_frames x feature_width` feature matrix plus timing.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioTrack {
    values: Vec<f32>,
    width: usize,
    num_frames: usize,
    fps: f64,
    duration: f64,
}

impl AudioTrack {
    /// Build from per-frame rows. Every row must have the same width.
    pub fn new(rows: Vec<Vec<f32>>, fps: f64) -> VizResult<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(VizError::config(format!(
                "feature row {i} has width {}, expected {width}",
                row.len()
            )));
        }
        let num_frames = rows.len();
        let values = rows.into_iter().flatten().collect();
        Self::from_parts(values, width, num_frames, fps)
    }

    /// Build from a row-major matrix of `width` columns.
    ///
    /// With `width == 0` the row count cannot be recovered from `values`; use [`AudioTrack::new`]
    /// or [`AudioTrack::silent`] for featureless tracks.
    pub fn from_flat(values: Vec<f32>, width: usize, fps: f64) -> VizResult<Self> {
        let num_frames = match width {
            0 if values.is_empty() => 0,
            0 => {
                return Err(VizError::config(
                    "feature values present but feature width is zero",
                ));
            }
            w if values.len() % w != 0 => {
                return Err(VizError::config(format!(
                    "{} feature values do not divide into rows of {w}",
                    values.len()
                )));
            }
            w => values.len() / w,
        };
        Self::from_parts(values, width, num_frames, fps)
    }

    fn from_parts(values: Vec<f32>, width: usize, num_frames: usize, fps: f64) -> VizResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(VizError::config(format!("fps must be positive, got {fps}")));
        }
        if values.len() != width * num_frames {
            return Err(VizError::config(format!(
                "{} feature values do not fill {num_frames} rows of {width}",
                values.len()
            )));
        }
        Ok(Self {
            values,
            width,
            num_frames,
            fps,
            duration: num_frames as f64 / fps,
        })
    }

    /// `num_frames` rows of zeros.
    pub fn silent(num_frames: usize, width: usize, fps: f64) -> VizResult<Self> {
        Self::from_parts(vec![0.0; num_frames * width], width, num_frames, fps)
    }

    /// Read the JSON feature file written by the analysis step.
    pub fn from_path(path: impl AsRef<Path>) -> VizResult<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("open feature file '{}'", path.display()))?;
        Self::from_reader(BufReader::new(f))
    }

    /// Parse a JSON feature file.
    pub fn from_reader(r: impl Read) -> VizResult<Self> {
        let file: TrackFile = serde_json::from_reader(r)
            .map_err(|e| VizError::serde(format!("parse feature file: {e}")))?;
        if file.features.len() != file.num_frames {
            return Err(VizError::config(format!(
                "feature file declares {} frames but holds {} rows",
                file.num_frames,
                file.features.len()
            )));
        }
        let mut track = Self::new(file.features, file.fps)?;
        if file.duration.is_finite() && file.duration > 0.0 {
            track.duration = file.duration;
        }
        Ok(track)
    }

    /// Number of frames.
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Features per frame.
    pub fn feature_width(&self) -> usize {
        self.width
    }

    /// Frames per second.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Audio duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Features of frame `idx`.
    pub fn frame(&self, idx: usize) -> Option<&[f32]> {
        if idx >= self.num_frames {
            return None;
        }
        Some(&self.values[idx * self.width..(idx + 1) * self.width])
    }

    /// Copy with every column normalized by `method`.
    pub fn normalized(&self, method: Normalization) -> Self {
        let mut out = self.clone();
        if self.num_frames == 0 || method == Normalization::None {
            return out;
        }
        let (w, n, values) = (self.width, self.num_frames, &self.values);
        for c in 0..w {
            let column = || (0..n).map(move |r| values[r * w + c]);
            let (offset, scale, shift) = match method {
                Normalization::None => (0.0, 1.0, 0.0),
                Normalization::MinMax => {
                    let min = column().fold(f32::INFINITY, f32::min);
                    let max = column().fold(f32::NEG_INFINITY, f32::max);
                    let range = if max - min == 0.0 { 1.0 } else { max - min };
                    (min, 2.0 / range, -1.0)
                }
                Normalization::ZScore => {
                    let mean = column().map(f64::from).sum::<f64>() / n as f64;
                    let var = column()
                        .map(|v| (f64::from(v) - mean).powi(2))
                        .sum::<f64>()
                        / n as f64;
                    let std = if var == 0.0 { 1.0 } else { var.sqrt() };
                    (mean as f32, (1.0 / std) as f32, 0.0)
                }
            };
            for r in 0..n {
                let v = &mut out.values[r * w + c];
                *v = (*v - offset) * scale + shift;
            }
        }
        out
    }

    /// Copy with every value multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        let mut out = self.clone();
        out.values.iter_mut().for_each(|v| *v *= factor);
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/track.rs"]
mod tests;
