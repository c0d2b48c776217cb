/// Shared wgpu handles for one accelerator.
pub(crate) struct GpuContext {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) info: wgpu::AdapterInfo,
    pub(crate) limits: wgpu::Limits,
    pub(crate) supports_f16: bool,
}

impl GpuContext {
    /// Request a high-performance adapter and open a device on it.
    ///
    /// Software adapters are rejected: they are slower than the native cpu path.
    pub(crate) fn probe() -> Result<Self, String> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => "no gpu adapter available".to_string(),
            other => format!("wgpu request_adapter failed: {other:?}"),
        })?;

        let info = adapter.get_info();
        if info.device_type == wgpu::DeviceType::Cpu {
            return Err(format!(
                "adapter '{}' is a software rasterizer, not an accelerator",
                info.name
            ));
        }

        let supports_f16 = adapter.features().contains(wgpu::Features::SHADER_F16);
        let required_features = if supports_f16 {
            wgpu::Features::SHADER_F16
        } else {
            wgpu::Features::empty()
        };
        let limits = adapter.limits();

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("cppnviz"),
            required_features,
            required_limits: limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| format!("wgpu request_device failed: {e:?}"))?;

        Ok(Self {
            device,
            queue,
            info,
            limits,
            supports_f16,
        })
    }

    pub(crate) fn adapter_name(&self) -> String {
        self.info.name.clone()
    }

    pub(crate) fn backend_name(&self) -> String {
        format!("{:?}", self.info.backend)
    }

    /// Largest buffer a single batch can bind.
    pub(crate) fn memory_budget_bytes(&self) -> u64 {
        let binding = u64::from(self.limits.max_storage_buffer_binding_size);
        self.limits.max_buffer_size.min(binding)
    }

    /// Largest row count a one-dimensional dispatch can cover.
    pub(crate) fn max_dispatch_rows(&self, workgroup_size: u32) -> usize {
        (self.limits.max_compute_workgroups_per_dimension as usize) * (workgroup_size as usize)
    }
}
