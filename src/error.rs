use thiserror::Error;

/// Failures that can end a request or a streaming session.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A frame could not be fetched (bad status or transport error).
    #[error("Failed to load frame {index}.txt: {reason}")]
    Retrieval { index: usize, reason: String },

    /// Retrieval produced zero frames.
    #[error("No frames loaded")]
    EmptyInput,

    /// Rendering or writing a frame failed after the response started.
    #[error("Stream error: {0}")]
    Emission(String),

    /// The consumer went away. A normal way for a session to end.
    #[error("client disconnected")]
    Disconnected,

    #[error("invalid palette: {0}")]
    InvalidPalette(&'static str),
}

impl StreamError {
    /// Whether the error happened before any frame could be streamed.
    pub fn is_retrieval(&self) -> bool {
        matches!(self, StreamError::Retrieval { .. } | StreamError::EmptyInput)
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
