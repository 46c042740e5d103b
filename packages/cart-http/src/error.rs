use thiserror::Error;

/// Failures building an [`HttpCartService`](crate::HttpCartService)
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type HttpResult<T> = Result<T, HttpError>;
