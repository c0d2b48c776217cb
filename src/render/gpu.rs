//! Compute-shader evaluator.
//!
//! The network shape is baked into a WGSL module at construction; parameters live in one storage
//! buffer laid out exactly like [`PatternField::flatten_parameters`] and are re-uploaded whenever
//! the field's generation changes. Reduced precision evaluates hidden layers in `f16`; the output
//! sigmoid always runs in `f32`.

use std::sync::Arc;

use crate::device::Precision;
use crate::device::gpu::GpuContext;
use crate::field::pattern::{Architecture, OUTPUT_DIM, PatternField};
use crate::foundation::error::{VizError, VizResult};
use crate::render::backend::{BackendKind, ComputeBackend};

/// Invocations per workgroup; one invocation evaluates one row.
pub(crate) const WORKGROUP_SIZE: u32 = 64;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct BatchUniform {
    rows: u32,
    _pad: [u32; 3],
}

struct BatchBuffers {
    input: wgpu::Buffer,
    output: wgpu::Buffer,
    staging: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub(crate) struct GpuBackend {
    ctx: Arc<GpuContext>,
    arch: Architecture,
    capacity: usize,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    params: wgpu::Buffer,
    uniform: wgpu::Buffer,
    uploaded_generation: Option<u64>,
    buffers: Option<BatchBuffers>,
}

impl GpuBackend {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        field: &PatternField,
        capacity: usize,
    ) -> VizResult<Self> {
        let arch = field.architecture();
        let device = &ctx.device;

        let max_rows = ctx.max_dispatch_rows(WORKGROUP_SIZE);
        if capacity > max_rows {
            return Err(VizError::resource(format!(
                "batch of {capacity} rows exceeds the {max_rows}-row dispatch limit"
            )));
        }
        let limit = u64::from(ctx.limits.max_storage_buffer_binding_size);
        let input_bytes = (capacity * arch.input_dim * 4) as u64;
        if input_bytes > limit {
            return Err(VizError::resource(format!(
                "{capacity}-row batch needs {input_bytes} input bytes, binding limit is {limit}"
            )));
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("cppnviz_field_shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source(&arch, field.precision()).into()),
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cppnviz_field_layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("cppnviz_field_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("cppnviz_field_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(VizError::device(format!("compute pipeline rejected: {err}")));
        }

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cppnviz_params"),
            size: (arch.parameter_count() * 4) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cppnviz_batch_uniform"),
            size: std::mem::size_of::<BatchUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        tracing::debug!(
            adapter = %ctx.adapter_name(),
            capacity,
            precision = ?field.precision(),
            "compute pipeline ready"
        );
        Ok(Self {
            ctx,
            arch,
            capacity,
            pipeline,
            layout,
            params,
            uniform,
            uploaded_generation: None,
            buffers: None,
        })
    }

    fn ensure_buffers(&mut self) -> VizResult<()> {
        if self.buffers.is_some() {
            return Ok(());
        }
        let device = &self.ctx.device;
        let input_bytes = (self.capacity * self.arch.input_dim * 4) as u64;
        let output_bytes = (self.capacity * OUTPUT_DIM * 4) as u64;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let input = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cppnviz_batch_input"),
            size: input_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let output = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cppnviz_batch_output"),
            size: output_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cppnviz_batch_staging"),
            size: output_bytes,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(VizError::resource(format!(
                "allocating {} rows of batch buffers failed: {err}",
                self.capacity
            )));
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cppnviz_field_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: output.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.uniform.as_entire_binding(),
                },
            ],
        });
        self.buffers = Some(BatchBuffers {
            input,
            output,
            staging,
            bind_group,
        });
        Ok(())
    }

    fn upload_parameters(&mut self, field: &PatternField) {
        if self.uploaded_generation == Some(field.generation()) {
            return;
        }
        let flat = field.flatten_parameters();
        self.ctx
            .queue
            .write_buffer(&self.params, 0, bytemuck::cast_slice(&flat));
        self.uploaded_generation = Some(field.generation());
        tracing::trace!(generation = field.generation(), "parameters uploaded");
    }
}

impl ComputeBackend for GpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn evaluate(&mut self, field: &PatternField, input: &[f32], out: &mut [f32]) -> VizResult<()> {
        let rows = field.check_batch(input, self.arch.input_dim, out)?;
        if field.architecture() != self.arch {
            return Err(VizError::config(
                "field architecture changed after the compute pipeline was built",
            ));
        }
        if rows == 0 {
            return Ok(());
        }
        if rows > self.capacity {
            return Err(VizError::config(format!(
                "batch of {rows} rows exceeds buffer capacity {}",
                self.capacity
            )));
        }

        self.upload_parameters(field);
        self.ensure_buffers()?;
        let Some(buffers) = self.buffers.as_ref() else {
            return Err(VizError::resource("batch buffers unavailable"));
        };
        let device = &self.ctx.device;
        let queue = &self.ctx.queue;

        queue.write_buffer(&buffers.input, 0, bytemuck::cast_slice(input));
        let uniform = BatchUniform {
            rows: rows as u32,
            _pad: [0; 3],
        };
        queue.write_buffer(&self.uniform, 0, bytemuck::bytes_of(&uniform));

        let out_bytes = (rows * OUTPUT_DIM * 4) as u64;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("cppnviz_field_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("cppnviz_field_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &buffers.bind_group, &[]);
            pass.dispatch_workgroups((rows as u32).div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        encoder.copy_buffer_to_buffer(&buffers.output, 0, &buffers.staging, 0, out_bytes);
        queue.submit(Some(encoder.finish()));
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(VizError::resource(format!("batch evaluation failed: {err}")));
        }

        let slice = buffers.staging.slice(0..out_bytes);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| VizError::device(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| VizError::device("readback channel closed"))?
            .map_err(|e| VizError::resource(format!("readback map failed: {e:?}")))?;

        let mapped = slice.get_mapped_range();
        for (dst, bytes) in out.iter_mut().zip(mapped.chunks_exact(4)) {
            *dst = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        drop(mapped);
        buffers.staging.unmap();
        Ok(())
    }

    fn release_cached_memory(&mut self) {
        if self.buffers.take().is_some() {
            tracing::debug!("batch buffers released");
        }
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// WGSL for one architecture and precision.
pub(crate) fn shader_source(arch: &Architecture, precision: Precision) -> String {
    let (enable, scalar) = match precision {
        Precision::Full => ("", "f32"),
        Precision::Reduced => ("enable f16;\n", "f16"),
    };
    format!(
        r#"{enable}
alias Scalar = {scalar};

const INPUT_DIM: u32 = {input_dim}u;
const HIDDEN_DIM: u32 = {hidden_dim}u;
const NUM_LAYERS: u32 = {num_layers}u;
const OUTPUT_DIM: u32 = {output_dim}u;

struct Batch {{
    rows: u32,
    pad0: u32,
    pad1: u32,
    pad2: u32,
}}

@group(0) @binding(0) var<storage, read> input: array<f32>;
@group(0) @binding(1) var<storage, read> params: array<f32>;
@group(0) @binding(2) var<storage, read_write> output: array<f32>;
@group(0) @binding(3) var<uniform> batch: Batch;

fn activate(v: Scalar, layer: u32) -> Scalar {{
    switch layer % 4u {{
        case 0u: {{ return sin(v); }}
        case 1u: {{ return cos(v); }}
        case 2u: {{ return exp(-v * v); }}
        default: {{ return tanh(v); }}
    }}
}}

@compute @workgroup_size({workgroup})
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let row = gid.x;
    if (row >= batch.rows) {{
        return;
    }}

    var cur: array<Scalar, HIDDEN_DIM>;
    var nxt: array<Scalar, HIDDEN_DIM>;
    let base = row * INPUT_DIM;

    var off = 0u;
    for (var o = 0u; o < HIDDEN_DIM; o++) {{
        var acc = Scalar(params[off + HIDDEN_DIM * INPUT_DIM + o]);
        for (var i = 0u; i < INPUT_DIM; i++) {{
            acc += Scalar(params[off + o * INPUT_DIM + i]) * Scalar(input[base + i]);
        }}
        cur[o] = activate(acc, 0u);
    }}
    off += HIDDEN_DIM * INPUT_DIM + HIDDEN_DIM;

    for (var l = 1u; l < NUM_LAYERS; l++) {{
        for (var o = 0u; o < HIDDEN_DIM; o++) {{
            var acc = Scalar(params[off + HIDDEN_DIM * HIDDEN_DIM + o]);
            for (var i = 0u; i < HIDDEN_DIM; i++) {{
                acc += Scalar(params[off + o * HIDDEN_DIM + i]) * cur[i];
            }}
            nxt[o] = activate(acc, l);
        }}
        for (var o = 0u; o < HIDDEN_DIM; o++) {{
            cur[o] = nxt[o];
        }}
        off += HIDDEN_DIM * HIDDEN_DIM + HIDDEN_DIM;
    }}

    for (var c = 0u; c < OUTPUT_DIM; c++) {{
        var acc = params[off + OUTPUT_DIM * HIDDEN_DIM + c];
        for (var i = 0u; i < HIDDEN_DIM; i++) {{
            acc += params[off + c * HIDDEN_DIM + i] * f32(cur[i]);
        }}
        output[row * OUTPUT_DIM + c] = 1.0 / (1.0 + exp(-acc));
    }}
}}
"#,
        input_dim = arch.input_dim,
        hidden_dim = arch.hidden_dim,
        num_layers = arch.num_layers,
        output_dim = OUTPUT_DIM,
        workgroup = WORKGROUP_SIZE,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/render/gpu.rs"]
mod tests;
