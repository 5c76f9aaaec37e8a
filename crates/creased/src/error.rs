//! Error types for the daemon's I/O boundaries.

use crease_common::ValidationError;
use thiserror::Error;

/// Upstream feed failures. Recoverable: the last known state is kept and the
/// next poll cycle retries.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("feed transport error: {0}")]
    Transport(String),

    #[error("feed returned HTTP {0}")]
    Status(u16),

    #[error("feed payload could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Text-generation failures. Never shown to the end user; the dispatcher
/// falls back to the deterministic answer.
#[derive(Error, Debug)]
pub enum AugmentError {
    #[error("generator transport error: {0}")]
    Transport(String),

    #[error("generator returned HTTP {0}")]
    Status(u16),

    #[error("generator response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for AugmentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AugmentError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            AugmentError::Status(status.as_u16())
        } else {
            AugmentError::Transport(e.to_string())
        }
    }
}

/// Outcome of handing a candidate to the ingestion loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("event rejected: {0}")]
    Rejected(#[from] ValidationError),

    #[error("ingestion loop has stopped")]
    Closed,
}
