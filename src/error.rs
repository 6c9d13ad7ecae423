//! Error types for the bridge client.

use crate::fields::Field;

/// Errors that can occur when talking to the rendering bridge.
///
/// Transport failures on ordinary bridge calls are not reported through this
/// type; they reach the request's result handler as
/// [`Outcome::Failed`](crate::Outcome::Failed) and are dropped there.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A value handed to the encoder does not fit in a byte.
    #[error("Invalid byte {value} at index {index} (expected 0-255)")]
    InvalidInput {
        /// Position of the offending element.
        index: usize,
        /// The value found there.
        value: i64,
    },

    /// The image download answered with something other than 200.
    ///
    /// A status of 0 means no response arrived at all.
    #[error("Request error {status}")]
    Fetch {
        /// HTTP status code of the response.
        status: u16,
    },

    /// Building the HTTP client failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A body could not be serialized or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The background runtime for asynchronous requests could not start.
    #[error("Failed to start transport runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// The host named a property this device does not have.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// The host wrote a value of the wrong kind for a field.
    #[error("Invalid value {value} for {field}")]
    InvalidValue {
        /// The field being written.
        field: Field,
        /// Debug rendering of the rejected value.
        value: String,
    },

    /// The host wrote a field that is not currently exposed.
    #[error("Field {0} is not currently exposed")]
    FieldHidden(Field),

    /// A configuration override could not be parsed.
    #[error("Invalid configuration value {value:?} for {key}")]
    Config {
        /// The environment key that was read.
        key: &'static str,
        /// The raw value found.
        value: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;
