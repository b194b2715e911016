use dungyzon_common::SearchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("timeout of {0}ms exceeded")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Non-2xx response; `message` is the server's own message when it sent one
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status, when the request reached the server
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<&ApiError> for SearchError {
    fn from(err: &ApiError) -> Self {
        SearchError::new(err.to_string(), err.status())
    }
}
