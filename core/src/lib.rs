//! Interceptor-driven HTTP request pipeline.
//!
//! # Overview
//! `Client::request` takes a `RequestConfig`, merges it over the client's
//! `Defaults`, runs it through the request interceptors, performs one
//! exchange through a pluggable `Transport`, runs the response interceptors,
//! and returns a `ResponseEnvelope` or a `RequestError`.
//!
//! # Design
//! - The transport is a capability: the core lowers configs into plain
//!   `HttpRequest` values and never performs I/O itself. `ReqwestTransport`
//!   (feature `reqwest`) is the stock implementation.
//! - The exchange races the transport, the configured timeout and an
//!   optional `CancelSignal`; the first to finish settles the call and the
//!   rest are dropped.
//! - Defaults are an explicit value owned by each client, never global.

pub mod cancel;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod query;
#[cfg(feature = "reqwest")]
pub mod reqwest_transport;
pub mod types;

pub use cancel::{Cancel, CancelSignal, CancelSource, CancelToken, CancelTrigger};
pub use client::{Client, Interceptors};
pub use config::{Defaults, HeaderConfig, HeaderMap, Method, Params, RequestConfig};
pub use error::{is_cancel, DispatchOutcome, RequestError};
pub use http::{HttpRequest, HttpResponse, Transport, TransportError};
pub use interceptor::{Interceptor, InterceptorId, InterceptorManager};
#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;
pub use types::ResponseEnvelope;
