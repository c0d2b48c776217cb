use rayon::prelude::*;

use crate::field::pattern::{ForwardScratch, OUTPUT_DIM, PatternField};
use crate::foundation::error::VizResult;
use crate::render::backend::{BackendKind, ComputeBackend};

/// Rows handed to one rayon task at minimum.
const MIN_ROWS_PER_TASK: usize = 256;

/// Row-parallel CPU evaluator.
///
/// Rows of one batch are split across the rayon pool; every row is evaluated with the same
/// sequential arithmetic, so the result does not depend on batch size or thread count.
#[derive(Debug, Default)]
pub struct CpuBackend;

impl CpuBackend {
    /// New evaluator.
    pub fn new() -> Self {
        Self
    }
}

impl ComputeBackend for CpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn evaluate(&mut self, field: &PatternField, input: &[f32], out: &mut [f32]) -> VizResult<()> {
        let width = field.input_dim();
        field.check_batch(input, width, out)?;
        let arch = field.architecture();
        input
            .par_chunks_exact(width)
            .zip(out.par_chunks_exact_mut(OUTPUT_DIM))
            .with_min_len(MIN_ROWS_PER_TASK)
            .for_each_init(
                || ForwardScratch::new(&arch),
                |scratch, (x, y)| field.forward_row(x, scratch, y),
            );
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
