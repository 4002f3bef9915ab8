//! Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Express Checkout errors
///
/// A provider-reported failure (`ACK=Failure`, `L_ERRORCODE0=...`) is not one
/// of these. It comes back as a normal record when the response carries the
/// record's fields, or as [`CheckoutError::IncompleteResponse`] when it doesn't.
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Network failure or deadline exceeded talking to the provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body is not a valid NVP string
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Response parsed but lacks fields the record requires
    #[error("Incomplete {record} response, missing: {}", missing.join(", "))]
    IncompleteResponse {
        record: &'static str,
        missing: Vec<String>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record store error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CheckoutError {
    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::Transport(_) => "The payment provider could not be reached. Please try again.",
            Self::MalformedResponse(_) | Self::IncompleteResponse { .. } => {
                "The payment provider returned an unexpected response."
            }
            Self::Config(_) => "Payments are not configured.",
            Self::Storage(_) => "An error occurred saving your order.",
        }
    }
}
