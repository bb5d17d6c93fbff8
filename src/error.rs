use thiserror::Error;

/// Error taxonomy for calls against the stockdeck backend.
///
/// The cache layer uses [`ApiError::is_retriable`] to decide whether a failed
/// fetch attempt may be repeated: client-side rejections (4xx) and malformed
/// bodies are final, transport faults and 5xx responses are not.
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("request rejected ({status}): {message}")]
    Client { status: u16, message: String },

    #[error("server error ({status})")]
    Server { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("invalid input: {0}")]
    Validation(String),
}

impl ApiError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, ApiError::Server { .. } | ApiError::Network(_))
    }

    /// Status code of the HTTP response, when the error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Client { status, .. } | ApiError::Server { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
