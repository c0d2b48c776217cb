/// Per-layer nonlinearity applied after each hidden linear transform.
///
/// The policy is closed: hidden layer `i` uses `ACTIVATION_CYCLE[i % 4]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Activation {
    /// `sin(x)`
    Sine,
    /// `cos(x)`
    Cosine,
    /// Gaussian bump `exp(-x^2)`.
    Gaussian,
    /// `tanh(x)`
    Tanh,
}

/// Fixed activation order indexed by `layer_index % 4`.
pub const ACTIVATION_CYCLE: [Activation; 4] = [
    Activation::Sine,
    Activation::Cosine,
    Activation::Gaussian,
    Activation::Tanh,
];

impl Activation {
    /// Activation used by hidden layer `layer_index`.
    #[inline]
    pub fn for_layer(layer_index: usize) -> Self {
        ACTIVATION_CYCLE[layer_index % ACTIVATION_CYCLE.len()]
    }

    /// Apply the activation to one value.
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Sine => x.sin(),
            Self::Cosine => x.cos(),
            Self::Gaussian => (-(x * x)).exp(),
            Self::Tanh => x.tanh(),
        }
    }

    /// Apply the activation in place.
    #[inline]
    pub fn apply_slice(self, xs: &mut [f32]) {
        for x in xs {
            *x = self.apply(*x);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/field/activation.rs"]
mod tests;
