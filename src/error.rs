use std::io;

#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    #[error("kismet request to {path} failed: {reason}")]
    Upstream { path: String, reason: String },

    #[error("kismet returned HTTP {status} for {path}")]
    UpstreamStatus { path: String, status: u16 },

    #[error("malformed kismet response for {path}: {reason}")]
    UpstreamFormat { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, SentinelError>;

impl SentinelError {
    pub fn upstream(path: &str, reason: impl ToString) -> Self {
        SentinelError::Upstream {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        SentinelError::BadRequest(reason.into())
    }

    /// HTTP status this error maps to when surfaced through the API.
    pub fn status_code(&self) -> u16 {
        match self {
            SentinelError::BadRequest(_) | SentinelError::Json(_) => 400,
            SentinelError::NotFound(_) => 404,
            SentinelError::Upstream { .. }
            | SentinelError::UpstreamStatus { .. }
            | SentinelError::UpstreamFormat { .. } => 502,
            SentinelError::Io(_) => 500,
        }
    }
}
