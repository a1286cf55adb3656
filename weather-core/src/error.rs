use reqwest::StatusCode;
use thiserror::Error;

/// Message shown when a record body is not valid JSON.
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid weather data format.";

/// Message shown when the service cannot be reached at all.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error: Could not connect to the server";

/// Everything that can go wrong between the form and the rendered record.
///
/// The `Display` output of the recoverable variants is what the user sees.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The body is not structured data at all.
    #[error("Invalid weather data format.")]
    Decode(#[source] serde_json::Error),

    /// The body is JSON but lacks a field the report needs.
    #[error("Weather data is missing expected fields: {0}")]
    SchemaMismatch(#[source] serde_json::Error),

    /// The service answered with a non-2xx status.
    #[error("{message}")]
    RequestRejected { status: StatusCode, message: String },

    /// No response was received.
    #[error("Network error: Could not connect to the server")]
    Transport { reason: String },

    #[error("ID is required")]
    MissingId,

    #[error("Unknown form field '{0}'. The only field is 'ID'.")]
    UnknownField(String),

    #[error("Invalid service endpoint '{0}'")]
    InvalidEndpoint(String),
}

impl LookupError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        LookupError::Transport { reason: err.to_string() }
    }

    /// Whether the failure happened before any response arrived.
    pub fn is_transport(&self) -> bool {
        matches!(self, LookupError::Transport { .. })
    }
}

pub type LookupResult<T> = std::result::Result<T, LookupError>;
