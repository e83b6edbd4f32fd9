/// Result alias used across the crate.
pub type SemanticResult<T> = Result<T, SemanticError>;

/// Errors produced by compositing, extraction, and the video pipeline.
#[derive(thiserror::Error, Debug)]
pub enum SemanticError {
    /// Caller-supplied value failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Bytes or a file could not be interpreted as pixel data.
    #[error("decode error: {0}")]
    Decode(String),

    /// Compositing inputs were unusable (zero extent, mismatched buffers).
    #[error("composite error: {0}")]
    Composite(String),

    /// Region/mask provider failure.
    #[error("detection error: {0}")]
    Detection(String),

    /// Demux/mux collaborator failure.
    #[error("media error: {0}")]
    Media(String),

    /// Transcode job failure (setup, lane, or finalization).
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Contextual failure from lower layers.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SemanticError {
    /// Build a [`SemanticError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SemanticError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`SemanticError::Composite`].
    pub fn composite(msg: impl Into<String>) -> Self {
        Self::Composite(msg.into())
    }

    /// Build a [`SemanticError::Detection`].
    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection(msg.into())
    }

    /// Build a [`SemanticError::Media`].
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    /// Build a [`SemanticError::Pipeline`].
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    /// The error every compositing entry point returns for unusable inputs.
    pub fn composable_inputs_required(detail: impl std::fmt::Display) -> Self {
        Self::Composite(format!("composable inputs required: {detail}"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
