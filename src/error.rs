use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error code {status} with message {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("No dataframe version is loaded")]
    NoVersionLoaded,

    #[error("Dataframe {0} has no versions")]
    NoVersions(String),

    #[error("{0}")]
    ProcessingFailed(String),
}

impl CleanerError {
    /// Builds an `Api` error from a non-2xx response body, preferring the backend's
    /// `message` field when the body is JSON.
    pub fn from_response_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| body.trim().to_owned());
        CleanerError::Api { status, message }
    }
}
