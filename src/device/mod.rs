//! Execution device selection.
//!
//! Selection is a two-stage procedure: probe the accelerator, then resolve the probe outcome
//! against the caller's [`DeviceRequest`] into a tagged [`DeviceSelection`]. Accelerator failures
//! are recoverable and fall back to general-purpose execution unless the caller asked for
//! [`DeviceRequest::GpuStrict`].

#[cfg(feature = "gpu")]
pub(crate) mod gpu;

use std::str::FromStr;
#[cfg(feature = "gpu")]
use std::sync::Arc;

use crate::foundation::error::{VizError, VizResult};

/// Which execution device the caller would like.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceRequest {
    /// Use an accelerator when one is available, otherwise the CPU.
    #[default]
    Auto,
    /// Always use general-purpose execution.
    Cpu,
    /// Prefer an accelerator; fall back to the CPU with a warning on failure.
    Gpu,
    /// Require an accelerator; failure is a [`VizError::Device`].
    GpuStrict,
}

impl FromStr for DeviceRequest {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "gpu" | "cuda" => Ok(Self::Gpu),
            "gpu-strict" => Ok(Self::GpuStrict),
            other => Err(VizError::config(format!(
                "unknown device '{other}' (expected auto, cpu, gpu or gpu-strict)"
            ))),
        }
    }
}

/// Arithmetic precision requested for forward evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// 32-bit floats everywhere.
    Full,
    /// 16-bit float arithmetic on accelerators that support it.
    #[default]
    Reduced,
}

impl FromStr for Precision {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "fp32" => Ok(Self::Full),
            "reduced" | "half" | "fp16" => Ok(Self::Reduced),
            other => Err(VizError::config(format!(
                "unknown precision '{other}' (expected full or reduced)"
            ))),
        }
    }
}

/// Outcome of device selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceSelection {
    /// Evaluation runs on an accelerator.
    Accelerated {
        /// Adapter name as reported by the driver.
        adapter: String,
        /// Graphics API backing the adapter.
        backend: String,
        /// Whether 16-bit float arithmetic is available.
        supports_reduced_precision: bool,
    },
    /// Evaluation runs on the CPU.
    GeneralPurpose,
}

/// A selected execution device.
///
/// Cloning is cheap; accelerator handles are shared.
#[derive(Clone)]
pub struct Device {
    selection: DeviceSelection,
    fallback_reason: Option<String>,
    #[cfg(feature = "gpu")]
    gpu: Option<Arc<gpu::GpuContext>>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("selection", &self.selection)
            .field("fallback_reason", &self.fallback_reason)
            .finish()
    }
}

impl Device {
    /// General-purpose (CPU) execution.
    pub fn cpu() -> Self {
        Self::general_purpose(None)
    }

    /// Probe the accelerator and resolve `request` into a device.
    ///
    /// Only [`DeviceRequest::GpuStrict`] can fail; every other request resolves to some device.
    #[tracing::instrument]
    pub fn select(request: DeviceRequest) -> VizResult<Self> {
        if request == DeviceRequest::Cpu {
            return Ok(Self::cpu());
        }

        match probe_accelerator() {
            Ok(device) => {
                if let DeviceSelection::Accelerated {
                    adapter, backend, ..
                } = &device.selection
                {
                    tracing::info!(%adapter, %backend, "accelerator selected");
                }
                Ok(device)
            }
            Err(reason) if request == DeviceRequest::GpuStrict => Err(VizError::device(reason)),
            Err(reason) => {
                if request == DeviceRequest::Gpu {
                    tracing::warn!(%reason, "accelerator unavailable, falling back to cpu");
                } else {
                    tracing::info!(%reason, "no accelerator, using cpu");
                }
                Ok(Self::general_purpose(Some(reason)))
            }
        }
    }

    fn general_purpose(fallback_reason: Option<String>) -> Self {
        Self {
            selection: DeviceSelection::GeneralPurpose,
            fallback_reason,
            #[cfg(feature = "gpu")]
            gpu: None,
        }
    }

    /// The tagged selection result.
    pub fn selection(&self) -> &DeviceSelection {
        &self.selection
    }

    /// Whether evaluation runs on an accelerator.
    pub fn is_accelerated(&self) -> bool {
        matches!(self.selection, DeviceSelection::Accelerated { .. })
    }

    /// Why an accelerator was not used, if one was probed and rejected.
    pub fn fallback_reason(&self) -> Option<&str> {
        self.fallback_reason.as_deref()
    }

    /// Whether reduced-precision arithmetic can be enabled on this device.
    pub fn supports_reduced_precision(&self) -> bool {
        matches!(
            self.selection,
            DeviceSelection::Accelerated {
                supports_reduced_precision: true,
                ..
            }
        )
    }

    /// Short label for logs ("cpu" or the adapter name).
    pub fn label(&self) -> String {
        match &self.selection {
            DeviceSelection::Accelerated { adapter, .. } => adapter.clone(),
            DeviceSelection::GeneralPurpose => "cpu".to_string(),
        }
    }

    /// Memory addressable by one batch on this device, in bytes.
    ///
    /// Accelerators report their largest bindable storage buffer; the CPU reports currently
    /// available system memory. Returns `None` when the figure cannot be queried.
    pub fn memory_budget_bytes(&self) -> Option<u64> {
        #[cfg(feature = "gpu")]
        if let Some(ctx) = self.gpu.as_ref() {
            return Some(ctx.memory_budget_bytes());
        }
        available_system_memory()
    }

    #[cfg(feature = "gpu")]
    pub(crate) fn gpu_context(&self) -> Option<&Arc<gpu::GpuContext>> {
        self.gpu.as_ref()
    }
}

fn available_system_memory() -> Option<u64> {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    match sys.available_memory() {
        0 => None,
        bytes => Some(bytes),
    }
}

#[cfg(feature = "gpu")]
fn probe_accelerator() -> Result<Device, String> {
    let ctx = gpu::GpuContext::probe()?;
    Ok(Device {
        selection: DeviceSelection::Accelerated {
            adapter: ctx.adapter_name(),
            backend: ctx.backend_name(),
            supports_reduced_precision: ctx.supports_f16,
        },
        fallback_reason: None,
        gpu: Some(Arc::new(ctx)),
    })
}

#[cfg(not(feature = "gpu"))]
fn probe_accelerator() -> Result<Device, String> {
    Err("accelerator support not compiled in (enable the `gpu` feature)".to_string())
}

#[cfg(test)]
#[path = "../../tests/unit/device/mod.rs"]
mod tests;
