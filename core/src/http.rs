//! HTTP transport boundary.
//!
//! # Design
//! The pipeline never touches the network itself. The dispatcher lowers a
//! `RequestConfig` into an `HttpRequest` (plain data) and hands it to a
//! `Transport`, which performs exactly one exchange and reports either an
//! `HttpResponse` or a `TransportError`. Aborting an in-flight exchange is
//! expressed by dropping the future returned from `Transport::send`; a
//! dropped exchange never reports back.
//!
//! All fields use owned types (`String`, `Vec`) so values can be recorded,
//! cloned into a `ResponseEnvelope`, and compared in tests.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Method;

/// An HTTP request described as plain data.
///
/// Built by the dispatcher after query encoding, body serialization and
/// header resolution. `headers` is ordered: common headers first, then the
/// active method's group, then direct headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// A `status` of 0 means the exchange ended without the peer producing a
/// status line (aborted, timed out, refused). The dispatcher never treats it
/// as a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Failures reported by the transport itself, before any status exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection-level failure. The detail is logged, never surfaced.
    #[error("network error: {0}")]
    Network(String),

    /// The transport's own timer fired.
    #[error("transport timed out")]
    TimedOut,
}

/// The capability that performs one physical exchange.
///
/// Implementations must report at most once per call. The dispatcher races
/// the returned future against the configured timeout and cancel signal and
/// drops it when either wins.
pub trait Transport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Lets several clients share one transport.
impl<T: Transport> Transport for std::sync::Arc<T> {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: Method::Get,
            url: "/x".to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: None,
            timeout: None,
        };
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn response_fields_default_when_missing() {
        let resp: HttpResponse = serde_json::from_str(r#"{"status":204}"#).unwrap();
        assert_eq!(resp.status, 204);
        assert!(resp.status_text.is_empty());
        assert!(resp.headers.is_empty());
        assert!(resp.body.is_empty());
    }
}
