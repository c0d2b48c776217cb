use crate::device::{Device, Precision};
use crate::field::pattern::{Architecture, OUTPUT_DIM, SPATIAL_TIME_INPUTS};
use crate::foundation::error::{VizError, VizResult};
use crate::foundation::math::bytes_to_mib;
use crate::render::grid::PixelGrid;

/// Default amplification applied to audio features inside the batch.
pub const DEFAULT_FEATURE_GAIN: f32 = 3.0;

/// Per-batch row ceiling on an accelerator.
pub const ACCEL_BATCH: usize = 1_000_000;
/// Per-batch row ceiling for general-purpose execution.
pub const CPU_BATCH: usize = 100_000;

/// Pick rows per batch.
///
/// An explicit request is honoured as-is (it must be positive). Otherwise the row count is derived
/// from the device's queried memory budget: the largest batch whose `f32` input and output buffers
/// fit, capped by a per-device ceiling and never more than `total_pixels`.
pub fn resolve_batch_size(
    device: &Device,
    arch: &Architecture,
    requested: Option<usize>,
    total_pixels: usize,
) -> VizResult<usize> {
    if let Some(n) = requested {
        if n == 0 {
            return Err(VizError::config("batch_size must be positive"));
        }
        return Ok(n);
    }

    let budget = device.memory_budget_bytes();
    let rows = if device.is_accelerated() {
        accelerator_rows(arch, budget, accelerator_dispatch_rows(device))
    } else {
        // Leave most of system memory to the frame buffers and the rest of the process.
        let fit = budget.map_or(CPU_BATCH, |b| (b / 8 / bound_row_bytes(arch)) as usize);
        CPU_BATCH.min(fit)
    };

    let rows = rows.max(1).min(total_pixels.max(1));
    tracing::debug!(
        rows,
        row_bytes = bound_row_bytes(arch),
        budget_mib = budget.map(bytes_to_mib),
        device = %device.label(),
        "batch size selected"
    );
    Ok(rows)
}

/// Rows whose buffers fit a per-binding `budget`, capped by [`ACCEL_BATCH`] and the dispatch limit.
fn accelerator_rows(arch: &Architecture, budget: Option<u64>, dispatch_rows: usize) -> usize {
    let fit = budget.map_or(ACCEL_BATCH, |b| (b / bound_row_bytes(arch)) as usize);
    ACCEL_BATCH.min(fit).min(dispatch_rows)
}

#[cfg(feature = "gpu")]
fn accelerator_dispatch_rows(device: &Device) -> usize {
    device.gpu_context().map_or(usize::MAX, |ctx| {
        ctx.max_dispatch_rows(crate::render::gpu::WORKGROUP_SIZE)
    })
}

#[cfg(not(feature = "gpu"))]
fn accelerator_dispatch_rows(_device: &Device) -> usize {
    usize::MAX
}

/// Bytes one row occupies in the buffers evaluators actually bind: `f32` input and output,
/// whatever the arithmetic precision.
fn bound_row_bytes(arch: &Architecture) -> u64 {
    ((arch.input_dim + OUTPUT_DIM) * 4).max(1) as u64
}

fn input_scalar_bytes(precision: Precision) -> usize {
    match precision {
        Precision::Full => 4,
        Precision::Reduced => 2,
    }
}

/// Row size the estimate reports: input at the arithmetic precision plus `f32` output.
fn estimate_row_bytes(arch: &Architecture, precision: Precision) -> usize {
    arch.input_dim * input_scalar_bytes(precision) + OUTPUT_DIM * 4
}

/// Pre-flight memory figures, in MiB. Computed, never allocated.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct MemoryEstimate {
    /// Rows per batch the estimate was computed for.
    pub batch_rows: usize,
    /// One batch's input and output buffers.
    pub batch_mib: f64,
    /// Network parameters at 32 bits each.
    pub model_mib: f64,
    /// One finished 8-bit RGB frame.
    pub frame_mib: f64,
    /// Working set per frame: `batch_mib + model_mib`.
    pub total_per_frame_mib: f64,
}

impl MemoryEstimate {
    /// Estimate for `arch` at `batch_rows` rows per batch and `total_pixels` per frame.
    pub fn compute(
        arch: &Architecture,
        precision: Precision,
        batch_rows: usize,
        total_pixels: usize,
    ) -> Self {
        let batch_mib = bytes_to_mib((batch_rows * estimate_row_bytes(arch, precision)) as u64);
        let model_mib = bytes_to_mib((arch.parameter_count() * 4) as u64);
        let frame_mib = bytes_to_mib((total_pixels * OUTPUT_DIM) as u64);
        Self {
            batch_rows,
            batch_mib,
            model_mib,
            frame_mib,
            total_per_frame_mib: batch_mib + model_mib,
        }
    }
}

/// Reusable row-major input buffer of `capacity` rows by `input_dim` columns.
#[derive(Clone, Debug)]
pub struct BatchBuffer {
    input_dim: usize,
    capacity: usize,
    data: Vec<f32>,
}

impl BatchBuffer {
    /// Allocate `capacity` rows of `input_dim` columns once.
    pub fn new(input_dim: usize, capacity: usize) -> Self {
        Self {
            input_dim,
            capacity,
            data: vec![0.0; input_dim * capacity],
        }
    }

    /// Row capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Columns per row.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Fill rows for pixels `start..start + rows` and return the filled prefix.
    ///
    /// Columns are `[x, y, 2 * time - 1, gain * features...]`. `features` must hold exactly
    /// `input_dim - 3` values and `rows` must not exceed the capacity.
    pub fn fill(
        &mut self,
        grid: &PixelGrid,
        start: usize,
        rows: usize,
        time: f32,
        features: &[f32],
        gain: f32,
    ) -> &[f32] {
        debug_assert!(rows <= self.capacity);
        debug_assert_eq!(features.len() + SPATIAL_TIME_INPUTS, self.input_dim);

        let t = time * 2.0 - 1.0;
        let filled = &mut self.data[..rows * self.input_dim];
        for (i, row) in filled.chunks_exact_mut(self.input_dim).enumerate() {
            let (x, y) = grid.coord(start + i);
            row[0] = x;
            row[1] = y;
            row[2] = t;
            for (dst, &f) in row[SPATIAL_TIME_INPUTS..].iter_mut().zip(features) {
                *dst = f * gain;
            }
        }
        filled
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/batch.rs"]
mod tests;
