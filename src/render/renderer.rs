//! Frame rendering: coordinate grid, batched evaluation, 8-bit quantization.

use crate::audio::track::AudioTrack;
use crate::field::pattern::{OUTPUT_DIM, PatternField, SPATIAL_TIME_INPUTS};
use crate::foundation::core::Resolution;
use crate::foundation::error::{VizError, VizResult};
use crate::foundation::math::unit_to_u8;
use crate::render::backend::{BackendKind, ComputeBackend, create_backend};
use crate::render::batch::{
    BatchBuffer, DEFAULT_FEATURE_GAIN, MemoryEstimate, resolve_batch_size,
};
use crate::render::frame::RenderedFrame;
use crate::render::grid::{DEFAULT_COORD_SCALE, PixelGrid};
use crate::sequence::sequencer::{FrameSequence, SequenceOpts};

/// Construction options for a [`FrameRenderer`].
#[derive(Clone, Debug)]
pub struct RendererOpts {
    /// Pixels per batch; `None` sizes batches from the device's memory budget.
    pub batch_size: Option<usize>,
    /// Half-extent of the coordinate grid.
    pub coord_scale: f32,
    /// Amplification applied to audio features inside each batch.
    pub feature_gain: f32,
}

impl Default for RendererOpts {
    fn default() -> Self {
        Self {
            batch_size: None,
            coord_scale: DEFAULT_COORD_SCALE,
            feature_gain: DEFAULT_FEATURE_GAIN,
        }
    }
}

/// Renders images from a [`PatternField`] it owns.
///
/// Batches are evaluated in increasing pixel order, one at a time. Rendering borrows the field
/// immutably; only [`FrameRenderer::evolve`] (and the sequencer through it) mutates it, and
/// never while a batch is in flight.
pub struct FrameRenderer {
    field: PatternField,
    grid: PixelGrid,
    batch_size: usize,
    feature_gain: f32,
    batch: BatchBuffer,
    batch_out: Vec<f32>,
    backend: Box<dyn ComputeBackend>,
}

impl std::fmt::Debug for FrameRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRenderer")
            .field("resolution", &self.grid.resolution())
            .field("batch_size", &self.batch_size)
            .field("backend", &self.backend.kind())
            .field("architecture", &self.field.architecture())
            .finish()
    }
}

impl FrameRenderer {
    /// Bind `field` to `resolution`, size batches and preallocate the batch buffer.
    #[tracing::instrument(skip(field, opts))]
    pub fn new(field: PatternField, resolution: Resolution, opts: RendererOpts) -> VizResult<Self> {
        let grid = PixelGrid::new(resolution, opts.coord_scale)?;
        if !opts.feature_gain.is_finite() {
            return Err(VizError::config(format!(
                "feature gain must be finite, got {}",
                opts.feature_gain
            )));
        }
        let total = grid.len();
        let batch_size = resolve_batch_size(
            field.device(),
            &field.architecture(),
            opts.batch_size,
            total,
        )?;
        let capacity = batch_size.min(total);
        let batch = BatchBuffer::new(field.input_dim(), capacity);
        let backend = create_backend(&field, capacity);

        tracing::info!(
            pixels = total,
            batch_size,
            batches = total.div_ceil(batch_size),
            device = %field.device().label(),
            backend = ?backend.kind(),
            "renderer initialized"
        );
        Ok(Self {
            field,
            grid,
            batch_size,
            feature_gain: opts.feature_gain,
            batch,
            batch_out: vec![0.0; capacity * OUTPUT_DIM],
            backend,
        })
    }

    /// Output resolution.
    pub fn resolution(&self) -> Resolution {
        self.grid.resolution()
    }

    /// Pixels per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Batches per frame.
    pub fn num_batches(&self) -> usize {
        self.grid.len().div_ceil(self.batch_size)
    }

    /// Evaluator in use.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// The owned field.
    pub fn field(&self) -> &PatternField {
        &self.field
    }

    /// Give the field back.
    pub fn into_field(self) -> PatternField {
        self.field
    }

    /// Apply one evolution step to the owned field.
    pub fn evolve(&mut self, mutation_rate: f32) {
        self.field.evolve_weights(mutation_rate);
    }

    /// Release cached accelerator allocations. Output is unaffected.
    pub fn release_cached_memory(&mut self) {
        self.backend.release_cached_memory();
    }

    /// Memory figures for the current configuration. Nothing is allocated.
    pub fn estimate_memory(&self) -> MemoryEstimate {
        MemoryEstimate::compute(
            &self.field.architecture(),
            self.field.precision(),
            self.batch_size,
            self.grid.len(),
        )
    }

    /// Render one frame at playback position `time` (`[0, 1]`) with per-frame `features`.
    ///
    /// `features` must hold exactly `input_dim - 3` values. The result depends only on `time`,
    /// `features`, the grid and the field's current parameters; batch size has no effect.
    #[tracing::instrument(level = "debug", skip(self, features))]
    pub fn render_frame(&mut self, time: f32, features: &[f32]) -> VizResult<RenderedFrame> {
        let expected = self.field.input_dim() - SPATIAL_TIME_INPUTS;
        if features.len() != expected {
            return Err(VizError::config(format!(
                "audio feature width {} does not match field feature width {expected}",
                features.len()
            )));
        }
        if !time.is_finite() {
            return Err(VizError::config(format!("frame time must be finite, got {time}")));
        }

        let total = self.grid.len();
        let mut data = vec![0u8; total * OUTPUT_DIM];
        let mut start = 0;
        while start < total {
            let rows = self.batch.capacity().min(total - start);
            let input = self
                .batch
                .fill(&self.grid, start, rows, time, features, self.feature_gain);
            let out = &mut self.batch_out[..rows * OUTPUT_DIM];
            self.backend.evaluate(&self.field, input, out)?;

            let dst = &mut data[start * OUTPUT_DIM..(start + rows) * OUTPUT_DIM];
            for (d, &v) in dst.iter_mut().zip(out.iter()) {
                *d = unit_to_u8(v);
            }
            start += rows;
        }

        let res = self.grid.resolution();
        RenderedFrame::new(res.width, res.height, data)
    }

    /// Lazily render one frame per row of `track`.
    ///
    /// The feature width is checked up front. Frames are produced on demand, in index order.
    pub fn render_sequence<'a>(
        &'a mut self,
        track: &'a AudioTrack,
        opts: SequenceOpts,
    ) -> VizResult<FrameSequence<'a>> {
        FrameSequence::new(self, track, opts)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
