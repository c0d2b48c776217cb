use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

use crate::device::{Device, DeviceRequest, Precision};
use crate::field::activation::Activation;
use crate::foundation::error::{VizError, VizResult};
use crate::foundation::math::sigmoid;

/// Color channels produced per pixel.
pub const OUTPUT_DIM: usize = 3;

/// Input columns that precede the audio features: x, y and time.
pub const SPATIAL_TIME_INPUTS: usize = 3;

/// Initialisation gain for hidden layers.
///
/// The periodic and bounded activations attenuate amplitude layer over layer; at unit gain the
/// output collapses to a near-constant color.
pub const HIDDEN_GAIN: f32 = 5.0;

/// Initialisation gain for the output layer (the sigmoid already compresses its range).
pub const OUTPUT_GAIN: f32 = 1.0;

/// Shape of a [`PatternField`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Architecture {
    /// Input width: 2 spatial + 1 time + audio feature width.
    pub input_dim: usize,
    /// Width of every hidden layer.
    pub hidden_dim: usize,
    /// Number of hidden layers (>= 1).
    pub num_layers: usize,
}

impl Architecture {
    /// Build and validate an architecture.
    pub fn new(input_dim: usize, hidden_dim: usize, num_layers: usize) -> VizResult<Self> {
        let arch = Self {
            input_dim,
            hidden_dim,
            num_layers,
        };
        arch.validate()?;
        Ok(arch)
    }

    /// Architecture whose input accepts `feature_width` audio features.
    pub fn for_features(
        feature_width: usize,
        hidden_dim: usize,
        num_layers: usize,
    ) -> VizResult<Self> {
        Self::new(SPATIAL_TIME_INPUTS + feature_width, hidden_dim, num_layers)
    }

    /// Reject non-positive dimensions.
    pub fn validate(&self) -> VizResult<()> {
        if self.input_dim < SPATIAL_TIME_INPUTS {
            return Err(VizError::config(format!(
                "input_dim must be at least {SPATIAL_TIME_INPUTS} (x, y, time), got {}",
                self.input_dim
            )));
        }
        if self.hidden_dim == 0 {
            return Err(VizError::config("hidden_dim must be positive"));
        }
        if self.num_layers == 0 {
            return Err(VizError::config("num_layers must be positive"));
        }
        Ok(())
    }

    /// Number of audio features this architecture expects per frame.
    pub fn feature_width(&self) -> usize {
        self.input_dim.saturating_sub(SPATIAL_TIME_INPUTS)
    }

    /// `(out, in)` shape of every linear layer, hidden layers first, output layer last.
    pub fn layer_shapes(&self) -> Vec<(usize, usize)> {
        let mut shapes = Vec::with_capacity(self.num_layers + 1);
        shapes.push((self.hidden_dim, self.input_dim));
        for _ in 1..self.num_layers {
            shapes.push((self.hidden_dim, self.hidden_dim));
        }
        shapes.push((OUTPUT_DIM, self.hidden_dim));
        shapes
    }

    /// Total trainable parameters (weights + biases), computed without allocating a field.
    pub fn parameter_count(&self) -> usize {
        self.layer_shapes()
            .iter()
            .map(|&(out, inp)| (inp + 1) * out)
            .sum()
    }
}

/// One affine transform `y = W x + b` with `W` stored row-major as `(out, in)`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearLayer {
    in_dim: usize,
    out_dim: usize,
    weight: Vec<f32>,
    bias: Vec<f32>,
}

impl LinearLayer {
    /// Xavier-uniform weights scaled by `gain`, zero biases.
    fn xavier(in_dim: usize, out_dim: usize, gain: f32, rng: &mut StdRng) -> Self {
        let bound = gain * (6.0 / (in_dim + out_dim) as f32).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let weight = (0..in_dim * out_dim).map(|_| dist.sample(&mut *rng)).collect();
        Self {
            in_dim,
            out_dim,
            weight,
            bias: vec![0.0; out_dim],
        }
    }

    /// Input width.
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// Output width.
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Row-major `(out, in)` weights.
    pub fn weight(&self) -> &[f32] {
        &self.weight
    }

    /// Per-output biases.
    pub fn bias(&self) -> &[f32] {
        &self.bias
    }

    pub(crate) fn weight_mut(&mut self) -> &mut [f32] {
        &mut self.weight
    }

    pub(crate) fn bias_mut(&mut self) -> &mut [f32] {
        &mut self.bias
    }

    #[inline]
    fn forward_into(&self, x: &[f32], y: &mut [f32]) {
        for (o, slot) in y.iter_mut().enumerate().take(self.out_dim) {
            let row = &self.weight[o * self.in_dim..(o + 1) * self.in_dim];
            let mut acc = self.bias[o];
            for (w, v) in row.iter().zip(x) {
                acc += w * v;
            }
            *slot = acc;
        }
    }
}

/// Construction options for a [`PatternField`].
#[derive(Clone, Debug, Default)]
pub struct FieldOptions {
    /// Device the field should evaluate on.
    pub device: DeviceRequest,
    /// Requested arithmetic precision (only honoured on capable accelerators).
    pub precision: Precision,
    /// Set when an external gradient-based tuner will drive this field; forces full precision.
    pub gradient_tuning: bool,
    /// RNG seed for initialisation and evolution. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl FieldOptions {
    /// Seeded, general-purpose options.
    pub fn cpu_seeded(seed: u64) -> Self {
        Self {
            device: DeviceRequest::Cpu,
            precision: Precision::Full,
            gradient_tuning: false,
            seed: Some(seed),
        }
    }
}

/// Per-thread scratch space for [`PatternField::forward_row`].
#[derive(Clone, Debug)]
pub struct ForwardScratch {
    cur: Vec<f32>,
    next: Vec<f32>,
}

impl ForwardScratch {
    /// Scratch sized for `arch`.
    pub fn new(arch: &Architecture) -> Self {
        Self {
            cur: vec![0.0; arch.hidden_dim],
            next: vec![0.0; arch.hidden_dim],
        }
    }
}

/// Coordinate-to-color network: `[x, y, time, features...] -> [r, g, b]` in `[0, 1]`.
///
/// Parameters are owned exclusively by the field. Shape is fixed at construction; only
/// [`PatternField::evolve_weights`] and snapshot loading change values. Every value change bumps
/// [`PatternField::generation`] so device-resident copies know when to refresh.
#[derive(Clone, Debug)]
pub struct PatternField {
    arch: Architecture,
    hidden: Vec<LinearLayer>,
    output: LinearLayer,
    device: Device,
    precision: Precision,
    rng: StdRng,
    generation: u64,
}

impl PatternField {
    /// Randomly initialise a field and bind it to the requested device.
    #[tracing::instrument(skip(opts), fields(device = ?opts.device, seed = ?opts.seed))]
    pub fn new(arch: Architecture, opts: &FieldOptions) -> VizResult<Self> {
        arch.validate()?;
        let device = Device::select(opts.device)?;
        Self::on_device(arch, device, opts)
    }

    /// Randomly initialise a field on an already selected device.
    pub fn on_device(arch: Architecture, device: Device, opts: &FieldOptions) -> VizResult<Self> {
        arch.validate()?;
        let mut rng = match opts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let shapes = arch.layer_shapes();
        let (hidden_shapes, output_shape) = shapes.split_at(arch.num_layers);
        let hidden = hidden_shapes
            .iter()
            .map(|&(out, inp)| LinearLayer::xavier(inp, out, HIDDEN_GAIN, &mut rng))
            .collect();
        let (out, inp) = output_shape[0];
        let output = LinearLayer::xavier(inp, out, OUTPUT_GAIN, &mut rng);

        let precision = resolve_precision(&device, opts.precision, opts.gradient_tuning);
        let field = Self {
            arch,
            hidden,
            output,
            device,
            precision,
            rng,
            generation: 0,
        };
        tracing::info!(
            device = %field.device.label(),
            precision = ?field.precision,
            layers = arch.num_layers,
            hidden_dim = arch.hidden_dim,
            parameters = field.count_parameters(),
            "pattern field initialized"
        );
        Ok(field)
    }

    /// The field's shape.
    pub fn architecture(&self) -> Architecture {
        self.arch
    }

    /// Input width (`3 + feature width`).
    pub fn input_dim(&self) -> usize {
        self.arch.input_dim
    }

    /// Hidden layer width.
    pub fn hidden_dim(&self) -> usize {
        self.arch.hidden_dim
    }

    /// Hidden layer count.
    pub fn num_layers(&self) -> usize {
        self.arch.num_layers
    }

    /// Always [`OUTPUT_DIM`].
    pub fn output_dim(&self) -> usize {
        OUTPUT_DIM
    }

    /// Audio features expected per frame.
    pub fn feature_width(&self) -> usize {
        self.arch.feature_width()
    }

    /// Device this field evaluates on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Effective precision after device/tuning resolution.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Counter bumped on every parameter value change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Hidden layers in evaluation order.
    pub fn hidden_layers(&self) -> &[LinearLayer] {
        &self.hidden
    }

    /// Output layer.
    pub fn output_layer(&self) -> &LinearLayer {
        &self.output
    }

    /// Total trainable parameters.
    pub fn count_parameters(&self) -> usize {
        self.hidden
            .iter()
            .chain(std::iter::once(&self.output))
            .map(|l| l.weight.len() + l.bias.len())
            .sum()
    }

    /// Evaluate a batch of rows.
    ///
    /// `input` holds `rows * width` values; `width` must equal [`PatternField::input_dim`] and
    /// `out` must hold `rows * 3` values.
    pub fn forward(&self, input: &[f32], width: usize, out: &mut [f32]) -> VizResult<()> {
        let rows = self.check_batch(input, width, out)?;
        let mut scratch = ForwardScratch::new(&self.arch);
        for (x, y) in input
            .chunks_exact(width)
            .zip(out.chunks_exact_mut(OUTPUT_DIM))
            .take(rows)
        {
            self.forward_row(x, &mut scratch, y);
        }
        Ok(())
    }

    /// Validate batch geometry and return the row count.
    pub(crate) fn check_batch(&self, input: &[f32], width: usize, out: &[f32]) -> VizResult<usize> {
        if width != self.arch.input_dim {
            return Err(VizError::config(format!(
                "input batch width {width} does not match field input_dim {}",
                self.arch.input_dim
            )));
        }
        if !input.len().is_multiple_of(width) {
            return Err(VizError::config(format!(
                "input batch length {} is not a multiple of width {width}",
                input.len()
            )));
        }
        let rows = input.len() / width;
        if out.len() != rows * OUTPUT_DIM {
            return Err(VizError::config(format!(
                "output buffer holds {} values, expected {}",
                out.len(),
                rows * OUTPUT_DIM
            )));
        }
        Ok(rows)
    }

    /// Evaluate one row. `x` has `input_dim` values, `y` receives 3.
    #[inline]
    pub fn forward_row(&self, x: &[f32], scratch: &mut ForwardScratch, y: &mut [f32]) {
        let mut cur = &mut scratch.cur;
        let mut next = &mut scratch.next;

        self.hidden[0].forward_into(x, cur);
        Activation::for_layer(0).apply_slice(cur);
        for (i, layer) in self.hidden.iter().enumerate().skip(1) {
            layer.forward_into(cur, next);
            Activation::for_layer(i).apply_slice(next);
            std::mem::swap(&mut cur, &mut next);
        }

        self.output.forward_into(cur, y);
        for v in y.iter_mut().take(OUTPUT_DIM) {
            *v = sigmoid(*v);
        }
    }

    /// Add zero-mean Gaussian noise scaled by `mutation_rate` to every parameter, in place.
    ///
    /// Produces temporal drift across a sequence; there is no loss signal involved.
    pub fn evolve_weights(&mut self, mutation_rate: f32) {
        if mutation_rate == 0.0 || !mutation_rate.is_finite() {
            return;
        }
        let rng = &mut self.rng;
        for layer in self.hidden.iter_mut().chain(std::iter::once(&mut self.output)) {
            for p in layer.weight.iter_mut().chain(layer.bias.iter_mut()) {
                let noise: f32 = StandardNormal.sample(&mut *rng);
                *p += noise * mutation_rate;
            }
        }
        self.generation += 1;
        tracing::debug!(mutation_rate, generation = self.generation, "weights evolved");
    }

    /// Restart the evolution noise stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// All parameters flattened layer by layer (weights then bias), hidden layers first.
    pub fn flatten_parameters(&self) -> Vec<f32> {
        let mut flat = Vec::with_capacity(self.count_parameters());
        for layer in self.hidden.iter().chain(std::iter::once(&self.output)) {
            flat.extend_from_slice(&layer.weight);
            flat.extend_from_slice(&layer.bias);
        }
        flat
    }

    /// Mutable access to every layer, for snapshot loading.
    pub(crate) fn layers_mut(&mut self) -> impl Iterator<Item = &mut LinearLayer> {
        self.hidden.iter_mut().chain(std::iter::once(&mut self.output))
    }

    pub(crate) fn mark_changed(&mut self) {
        self.generation += 1;
    }
}

fn resolve_precision(device: &Device, requested: Precision, gradient_tuning: bool) -> Precision {
    if requested == Precision::Full {
        return Precision::Full;
    }
    if gradient_tuning {
        tracing::info!("reduced precision disabled: gradient tuning needs stable accumulation");
        return Precision::Full;
    }
    if !device.is_accelerated() {
        tracing::debug!("reduced precision only applies on accelerators; using full precision");
        return Precision::Full;
    }
    if !device.supports_reduced_precision() {
        tracing::warn!(
            device = %device.label(),
            "accelerator lacks 16-bit float support; using full precision"
        );
        return Precision::Full;
    }
    Precision::Reduced
}

#[cfg(test)]
#[path = "../../tests/unit/field/pattern.rs"]
mod tests;
