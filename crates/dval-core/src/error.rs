//! Per-item error type.
//!
//! Everything that can go wrong while checking one item maps into a
//! `CheckError`. The sweep turns it into a `Failed` row carrying the
//! error message; none of these abort a run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    /// Object, patient or file is missing at the looked-up location.
    #[error("not found: {0}")]
    NotFound(String),
    /// Server answered with a non-2xx status other than 404.
    #[error("HTTP {status} for {url}")]
    Http { status: u32, url: String },
    /// Curl reported an error (timeout, connection, DNS, TLS).
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    /// A manifest row or report row lacks a required field or has a bad value.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// A response body could not be decoded (JSON, XML listing).
    #[error("decode: {0}")]
    Decode(String),
    /// Local disk failure (temp copy, sink write).
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CheckError {
    fn from(e: serde_json::Error) -> Self {
        CheckError::Decode(e.to_string())
    }
}

impl CheckError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CheckError::NotFound(_))
    }
}
