//! Error types for modem access and collection.

use thiserror::Error;

/// Errors returned by a single walk request.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// Network failure talking to the modem.
    #[error("Walk of {oid} failed: {source}")]
    Request {
        oid: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded the configured timeout.
    #[error("Walk of {oid} timed out")]
    Timeout { oid: String },

    /// The modem answered with a non-success status.
    #[error("Walk of {oid} returned HTTP {status}")]
    Status {
        oid: String,
        status: reqwest::StatusCode,
    },

    /// The response body is not valid JSON.
    #[error("Walk of {oid} returned invalid JSON: {source}")]
    Decode {
        oid: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response is JSON but not an object.
    #[error("Walk of {oid} returned a JSON {kind}, expected an object")]
    NotAnObject { oid: String, kind: &'static str },
}

/// Why a table contributed nothing to a collection cycle.
#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The cycle deadline passed before or during the walk.
    #[error("Collection deadline exceeded before walk of {oid} completed")]
    DeadlineExceeded { oid: String },
}

/// Result type alias for walk requests.
pub type Result<T> = std::result::Result<T, ClientError>;
