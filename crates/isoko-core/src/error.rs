//! Error handling for marketplace operations
//!
//! Provides typed errors with a clear retry contract: transient store
//! failures may be retried, everything else is surfaced immediately.

use thiserror::Error;

use crate::models::OrderStatus;

/// Errors that can occur during marketplace operations
#[derive(Error, Debug)]
pub enum MarketError {
    /// Transient store or network failure
    ///
    /// These are retried by `RetryPolicy`; callers only see one after
    /// retries are exhausted.
    #[error("Store unavailable: {message}")]
    Transient { message: String },

    /// Action requires a signed-in identity
    #[error("You must be signed in to {action}.")]
    Unauthenticated { action: &'static str },

    /// Order status precondition violated
    ///
    /// The order is left untouched; no write is issued.
    #[error("Order cannot move from {from} to {attempted}")]
    InvalidTransition {
        from: OrderStatus,
        attempted: OrderStatus,
    },

    /// Remote response did not contain what the contract promises
    #[error("Malformed response: {details}")]
    MalformedResponse { details: String },

    /// Document expected to exist was absent
    #[error("Not found in '{collection}': {id}")]
    NotFound { collection: String, id: String },

    /// Document could not be decoded into its model type
    #[error("Failed to decode document in '{collection}': {source}")]
    Decode {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    /// HTTP transport error (price suggestion call)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MarketError {
    /// Create a transient error from any displayable cause
    pub fn transient(message: impl Into<String>) -> Self {
        MarketError::Transient {
            message: message.into(),
        }
    }

    /// Whether retrying this operation could help
    ///
    /// Precondition failures (`Unauthenticated`, `InvalidTransition`)
    /// and malformed responses never benefit from a retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MarketError::Transient { .. } | MarketError::Http(_)
        )
    }
}

/// Result type for marketplace operations
pub type MarketResult<T> = Result<T, MarketError>;
