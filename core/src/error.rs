//! Error types for the request pipeline.
//!
//! # Design
//! Every failure of a call surfaces as a `RequestError` from
//! `Client::request`. Cancellation travels through the same channel but as
//! its own variant carrying the `Cancel` marker, so callers can special-case
//! it with `is_cancel` instead of inspecting messages. A failed status keeps
//! only the code; the response body is not surfaced on that path.

use thiserror::Error;

use crate::cancel::Cancel;
use crate::types::ResponseEnvelope;

/// Errors returned by `Client::request`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The cancel signal fired before the exchange settled.
    #[error("{0}")]
    Cancelled(Cancel),

    /// The configured timeout elapsed first.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The peer answered with a status outside `[200, 300)`.
    #[error("request failed with status code {0}")]
    Status(u16),

    /// The transport reported a connection-level failure.
    #[error("network error")]
    Network,

    /// The exchange ended with status 0 and no other explanation.
    #[error("request ended without a response status")]
    NoStatus,

    /// The request body could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Raised by an interceptor.
    #[error("{0}")]
    Rejected(String),
}

impl RequestError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        RequestError::Rejected(reason.into())
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, RequestError::Cancelled(_))
    }

    pub fn as_cancel(&self) -> Option<&Cancel> {
        match self {
            RequestError::Cancelled(cancel) => Some(cancel),
            _ => None,
        }
    }
}

/// Free-function form of `RequestError::is_cancel`.
pub fn is_cancel(error: &RequestError) -> bool {
    error.is_cancel()
}

/// How one dispatch ended. Exactly one of these is produced per exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Completed(ResponseEnvelope),
    Cancelled(Cancel),
    Failed(RequestError),
}

impl DispatchOutcome {
    pub fn into_result(self) -> Result<ResponseEnvelope, RequestError> {
        match self {
            DispatchOutcome::Completed(response) => Ok(response),
            DispatchOutcome::Cancelled(cancel) => Err(RequestError::Cancelled(cancel)),
            DispatchOutcome::Failed(error) => Err(error),
        }
    }
}
