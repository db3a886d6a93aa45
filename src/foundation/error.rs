/// Convenience result type used across the crate.
pub type BlurResult<T> = Result<T, BlurError>;

/// Error taxonomy for configuration, backends, buffers and capture.
#[derive(thiserror::Error, Debug)]
pub enum BlurError {
    /// Invalid caller-provided configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// A blur backend failed to initialize or execute.
    #[error("backend error: {0}")]
    Backend(String),

    /// Offscreen buffer or backend working memory could not be allocated.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// The capture pass could not run against the current buffers.
    #[error("capture error: {0}")]
    Capture(String),

    /// Errors when serializing or deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BlurError {
    /// Build a [`BlurError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BlurError::Backend`] value.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Build a [`BlurError::Allocation`] value.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Build a [`BlurError::Capture`] value.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Build a [`BlurError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
