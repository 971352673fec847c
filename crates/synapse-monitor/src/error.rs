use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid server url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported url scheme '{0}' (expected http, https, ws or wss)")]
    UnsupportedScheme(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure of a single pull request. Always local to that request.
#[derive(Debug, Error)]
pub enum PullError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {path} timed out after {timeout_ms}ms")]
    Timeout { path: &'static str, timeout_ms: u64 },
    #[error("{path} answered HTTP {status}")]
    Status { path: &'static str, status: u16 },
    #[error("could not decode {path} response: {source}")]
    Decode {
        path: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} reported an error: {message}")]
    Server { path: &'static str, message: String },
}

impl PullError {
    pub fn path(&self) -> &'static str {
        match self {
            PullError::Transport { path, .. }
            | PullError::Timeout { path, .. }
            | PullError::Status { path, .. }
            | PullError::Decode { path, .. }
            | PullError::Server { path, .. } => path,
        }
    }
}
