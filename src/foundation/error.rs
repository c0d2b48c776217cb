/// Convenience result type used across cppnviz.
pub type VizResult<T> = Result<T, VizError>;

/// Top-level error taxonomy used by the rendering core.
#[derive(thiserror::Error, Debug)]
pub enum VizError {
    /// Invalid dimensions, mismatched feature widths, bad resolutions or malformed snapshots.
    /// Fatal and never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// Accelerator failure that the caller asked not to recover from.
    #[error("device error: {0}")]
    Device(String),

    /// Memory exhaustion or buffer allocation failure while rendering.
    #[error("resource error: {0}")]
    Resource(String),

    /// Errors when serializing or deserializing snapshots, configs or feature files.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Errors raised by frame sinks (PNG export, ffmpeg).
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VizError {
    /// Build a [`VizError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`VizError::Device`] value.
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Build a [`VizError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`VizError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`VizError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Whether this error belongs to the configuration category.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
