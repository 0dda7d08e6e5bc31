//! Error taxonomy for the public session operations.
//!
//! ERROR HANDLING
//! ==============
//! Every public operation converts internal failures into one of these
//! variants and returns it as a value; nothing escapes the operation
//! boundary as a panic. Callers branch on the variant: network failures are
//! retryable, provider rejections must be surfaced to the user, and a
//! missing session is a caller bug or stale UI state.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use thiserror::Error;

use crate::net::gateway::GatewayError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Transport or connectivity failure; safe to retry.
    #[error("network error: {0}")]
    Network(String),
    /// The identity or data provider rejected the request (bad credentials,
    /// unconfirmed email, duplicate account, permission denied).
    #[error("{0}")]
    Provider(String),
    /// The operation requires an authenticated identity and none exists.
    #[error("no user logged in")]
    NoSession,
}

impl SessionError {
    /// Whether blindly retrying the same request can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Network(_))
    }

    /// Inline message for forms and banners.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Network(_) => {
                "Network error. Please check your connection and try again.".to_owned()
            }
            SessionError::Provider(message) => message.clone(),
            SessionError::NoSession => "No user logged in.".to_owned(),
        }
    }
}

impl From<GatewayError> for SessionError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Network(message) => SessionError::Network(message),
            GatewayError::Rejected { message, .. } => SessionError::Provider(message),
        }
    }
}
