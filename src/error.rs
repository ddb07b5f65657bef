use serde::Serialize;
use thiserror::Error;

/// Classified failure of a remote call. Every variant maps to a distinct
/// user-facing message; none of them is fatal to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanError {
    #[error("request timed out")]
    Timeout,

    #[error("network unreachable")]
    NetworkUnreachable,

    #[error("server error (status {0})")]
    Server(u16),

    #[error("rejected request (status {0})")]
    ClientInput(u16),

    #[error("no wine recognized")]
    Unrecognized,
}

impl ScanError {
    /// Message suitable for direct display by the presentation layer.
    pub fn user_message(&self) -> &'static str {
        match self {
            ScanError::Timeout => "Request timed out - please try again",
            ScanError::NetworkUnreachable => "Network error - please check your connection",
            ScanError::Server(_) => "The wine service had a problem - please try again later",
            ScanError::ClientInput(_) => "The image could not be processed",
            ScanError::Unrecognized => "No wine label recognized - try a clearer photo",
        }
    }

    /// Classify a transport-level failure from the HTTP client.
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ScanError::Timeout
        } else if err.is_connect() {
            ScanError::NetworkUnreachable
        } else if let Some(status) = err.status() {
            ScanError::from_status(status.as_u16())
        } else {
            ScanError::NetworkUnreachable
        }
    }

    /// Classify a non-success HTTP status.
    pub(crate) fn from_status(status: u16) -> Self {
        if (400..500).contains(&status) {
            ScanError::ClientInput(status)
        } else {
            ScanError::Server(status)
        }
    }
}
