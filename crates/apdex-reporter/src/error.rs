use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
    #[error("backend returned {status} for {operation}: {body}")]
    UnexpectedStatus {
        status: StatusCode,
        operation: &'static str,
        body: String,
    },
    #[error("backend rejected custom metric {metric}: {body}")]
    Registration { metric: String, body: String },
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Transport failures the next export tick can reasonably recover from.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(err) => err.is_timeout() || err.is_connect(),
            Error::UnexpectedStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
