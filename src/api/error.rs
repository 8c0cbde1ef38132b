//! REST client errors

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure or undecodable body
    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with an error status
    #[error("Backend returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    /// Rejected before sending: not a plain file name
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}
