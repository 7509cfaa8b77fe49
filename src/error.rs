use std::io;
use thiserror::Error;

/// Custom error type for vfetch
#[derive(Error, Debug)]
pub enum VfetchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The external executable is missing or could not be spawned
    #[error("Could not launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The external tool ran but reported failure
    #[error("{}", tool_failed_message(.code))]
    ToolFailed { code: Option<i32>, tail: String },

    #[error("Cookie extraction failed: {0}")]
    CookieExtraction(String),

    #[error("Cookie extraction from {browser} needs the system secret storage. {remediation}")]
    SecretStorageMissing { browser: String, remediation: String },
}

fn tool_failed_message(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("yt-dlp failed with exit code {}", code),
        None => "yt-dlp reported an error".to_string(),
    }
}

/// Result type alias for vfetch
pub type Result<T> = std::result::Result<T, VfetchError>;

impl VfetchError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        VfetchError::Config(msg.into())
    }

    /// Create an invalid request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        VfetchError::InvalidRequest(msg.into())
    }

    pub fn launch<S: Into<String>>(tool: S, source: io::Error) -> Self {
        VfetchError::Launch {
            tool: tool.into(),
            source,
        }
    }

    pub fn cookie_extraction<S: Into<String>>(msg: S) -> Self {
        VfetchError::CookieExtraction(msg.into())
    }

    /// Tool output tail attached to the error, if any
    pub fn tail(&self) -> Option<&str> {
        match self {
            VfetchError::ToolFailed { tail, .. } if !tail.is_empty() => Some(tail),
            _ => None,
        }
    }
}
