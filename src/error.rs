use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The uploaded bytes could not be turned into an image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The bytes decode, but not as JPEG or PNG.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to store upload: {0}")]
    Storage(#[from] std::io::Error),

    /// The vision service rejected the request or could not be reached.
    /// Display is the exact message shown to the user.
    #[error("Error: {reason}. Message: {message}")]
    RemoteService { reason: String, message: String },

    #[error("Error: Timeout. Message: the vision service did not respond within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("failed to encode annotated image: {0}")]
    Encode(String),
}

impl AnalyzerError {
    pub fn remote(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteService {
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// Errors caused by what the user uploaded, as opposed to the service or the host.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::UnsupportedFormat(_))
    }
}
