//! alquran.cloud API errors

/// Errors from the remote text/audio lookup API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network/transport error
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Unexpected response body
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Non-success HTTP status
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// API body reported a failure
    #[error("API returned error: code={code}, msg={msg}")]
    Api { code: i64, msg: String },

    /// Invalid input parameters
    #[error("bad input: {0}")]
    BadInput(&'static str),
}

impl ApiError {
    /// Transport errors and 5xx/429 statuses may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Reqwest(_) => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
