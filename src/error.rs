use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeptError>;

#[derive(Debug, Error)]
pub enum DeptError {
    /// Rejected before any network call was made.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not logged in; run `deptctl login <email>` first")]
    NotLoggedIn,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Transport-level failure (connect, timeout, malformed response).
    #[error("request to {path} failed: {message}")]
    Http { path: String, message: String },

    /// The backend answered with a non-success status.
    #[error("{0}")]
    Backend(String),

    #[error("storage error during {op}: {message}")]
    Storage { op: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl DeptError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DeptError::Validation(msg.into())
    }

    pub fn http_error(path: &str, message: &str) -> Self {
        DeptError::Http {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        DeptError::Backend(msg.into())
    }

    pub fn storage_error(op: &str, message: &str) -> Self {
        DeptError::Storage {
            op: op.to_string(),
            message: message.to_string(),
        }
    }
}

/* Conversions so `?` works smoothly */
impl From<std::io::Error> for DeptError {
    fn from(e: std::io::Error) -> Self {
        DeptError::Other(e.to_string())
    }
}
impl From<serde_json::Error> for DeptError {
    fn from(e: serde_json::Error) -> Self {
        DeptError::Other(e.to_string())
    }
}
impl From<reqwest::Error> for DeptError {
    fn from(e: reqwest::Error) -> Self {
        DeptError::Other(e.to_string())
    }
}
