use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The input bytes are not a decodable image. Retrying the same bytes
    /// can never succeed.
    #[error("image could not be decoded")]
    UndecodableImage,

    /// The inference backend rejected or failed the request.
    #[error("inference backend error: {0}")]
    Backend(String),

    /// The inference backend did not answer within the configured timeout.
    #[error("inference request timed out")]
    Timeout,

    /// The backend returned an embedding of the wrong dimensionality.
    #[error("expected {expected}-dimensional embedding, got {got}")]
    BadEmbedding { expected: usize, got: usize },
}

impl ExtractionError {
    /// Whether a retry with the same input could plausibly succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Timeout)
    }
}
