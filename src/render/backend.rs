use crate::field::pattern::PatternField;
use crate::foundation::error::VizResult;

/// Which evaluator runs a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Row-parallel evaluation on the CPU.
    Cpu,
    /// Compute-shader evaluation on an accelerator.
    #[cfg(feature = "gpu")]
    Gpu,
}

/// Evaluates one filled batch of rows with a [`PatternField`].
///
/// Batches are submitted strictly one after another. The field is borrowed immutably for the
/// duration of a call, so parameter mutation can never overlap an in-flight evaluation.
pub trait ComputeBackend: Send {
    /// Evaluator in use.
    fn kind(&self) -> BackendKind;

    /// Evaluate `input` (`rows * input_dim` values) into `out` (`rows * 3` values in `[0, 1]`).
    fn evaluate(&mut self, field: &PatternField, input: &[f32], out: &mut [f32]) -> VizResult<()>;

    /// Drop cached device allocations. Output is unaffected.
    fn release_cached_memory(&mut self) {}
}

/// Build the evaluator matching the field's device.
///
/// A failure to prepare the accelerator pipeline falls back to the CPU evaluator with a warning.
pub fn create_backend(field: &PatternField, capacity: usize) -> Box<dyn ComputeBackend> {
    #[cfg(feature = "gpu")]
    if let Some(ctx) = field.device().gpu_context() {
        match crate::render::gpu::GpuBackend::new(ctx.clone(), field, capacity) {
            Ok(backend) => return Box::new(backend),
            Err(err) => {
                tracing::warn!(%err, "accelerator pipeline unavailable, evaluating on cpu");
            }
        }
    }
    let _ = (field, capacity);
    Box::new(crate::render::cpu::CpuBackend::new())
}
