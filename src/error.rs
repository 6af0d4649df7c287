use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("{0}")]
    String(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the sequence service; `detail` is already user-facing.
    #[error("{detail}")]
    Api { status: u16, detail: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<String> for AnalyzerError {
    fn from(err: String) -> Self {
        AnalyzerError::String(err)
    }
}

impl From<&str> for AnalyzerError {
    fn from(err: &str) -> Self {
        AnalyzerError::String(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
