//! The request pipeline.
//!
//! # Design
//! `Client` owns its transport, an immutable `Defaults` value and the two
//! interceptor registries. A call runs as one ordered chain:
//!
//! ```text
//! request interceptors (registration order)
//!   -> dispatch
//!   -> response interceptors (registration order)
//! ```
//!
//! The chain is snapshotted when the call starts, so registering or ejecting
//! interceptors later never affects a call already in flight. A single
//! `Result` is threaded through the chain step by step: a fulfilled value
//! goes to the next fulfillment hook, an error skips fulfillment hooks until
//! a step with a rejection hook handles it. The dispatch step has no
//! rejection hook, so a request-side failure skips the transport entirely.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::cancel::{CancelSource, CancelToken};
use crate::config::{Defaults, RequestConfig};
use crate::dispatch::dispatch;
use crate::error::RequestError;
use crate::http::Transport;
use crate::interceptor::{Interceptor, InterceptorManager};
use crate::types::ResponseEnvelope;

/// The two registries exposed as `client.interceptors.request` and
/// `client.interceptors.response`.
#[derive(Debug, Default)]
pub struct Interceptors {
    pub request: InterceptorManager<RequestConfig>,
    pub response: InterceptorManager<ResponseEnvelope>,
}

/// HTTP client built around a pluggable `Transport`.
#[derive(Debug)]
pub struct Client<T> {
    transport: T,
    defaults: Arc<Defaults>,
    pub interceptors: Interceptors,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self::with_defaults(transport, Defaults::default())
    }

    pub fn with_defaults(transport: T, defaults: Defaults) -> Self {
        Self {
            transport,
            defaults: Arc::new(defaults),
            interceptors: Interceptors::default(),
        }
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// A fresh signal/trigger pair for `RequestConfig::cancel_token`.
    pub fn cancel_source(&self) -> CancelSource {
        CancelToken::source()
    }

    /// Run `config` through the pipeline. Never panics; every failure is an
    /// `Err`, cancellation included.
    pub async fn request(&self, config: RequestConfig) -> Result<ResponseEnvelope, RequestError> {
        let config = self.prepare(config);
        let (request_steps, response_steps) = self.chain();
        trace!(
            request_steps = request_steps.len(),
            response_steps = response_steps.len(),
            url = %config.url,
            "running request pipeline"
        );

        let mut state = Ok(config);
        for (index, step) in request_steps.iter().enumerate() {
            trace!(index, fulfilled = state.is_ok(), "request interceptor");
            state = step.run(state).await;
        }

        let mut state = match state {
            Ok(config) => dispatch(&self.transport, config).await.into_result(),
            Err(error) => Err(error),
        };

        for (index, step) in response_steps.iter().enumerate() {
            trace!(index, fulfilled = state.is_ok(), "response interceptor");
            state = step.run(state).await;
        }
        state
    }

    /// Merge defaults under `config` and apply the request transform. The
    /// transform only sees truthy data: `null`, `false`, `0` and `""` pass
    /// through untouched.
    fn prepare(&self, config: RequestConfig) -> RequestConfig {
        let mut config = self.defaults.apply(config);
        let data = config.data.take();
        config.data = match (&config.transform_request, data) {
            (Some(transform), Some(data)) if is_truthy(&data) => {
                Some(transform(data, &config.headers))
            }
            (_, data) => data,
        };
        config
    }

    /// Snapshot the live interceptors. Request steps are prepended walking
    /// the registry back to front, so the front-to-back order of the chain
    /// is registration order; response steps are appended in registration
    /// order.
    fn chain(
        &self,
    ) -> (
        Vec<Interceptor<RequestConfig>>,
        Vec<Interceptor<ResponseEnvelope>>,
    ) {
        let live: Vec<_> = self.interceptors.request.iter().collect();
        let request_steps = live
            .into_iter()
            .rev()
            .fold(VecDeque::new(), |mut chain, step| {
                chain.push_front(step.clone());
                chain
            })
            .into();
        let response_steps = self.interceptors.response.iter().cloned().collect();
        (request_steps, response_steps)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use super::*;
    use crate::config::{HeaderConfig, HeaderMap, Method};
    use crate::http::{HttpRequest, HttpResponse, TransportError};

    /// Echoes the request back as JSON and records what it received.
    #[derive(Default)]
    struct Echo {
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Transport for Echo {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            let body = json!({
                "method": request.method,
                "url": request.url,
                "body": request.body,
            });
            Ok(HttpResponse::new(200, body.to_string()))
        }
    }

    #[tokio::test]
    async fn defaults_are_merged_before_dispatch() {
        let client = Client::new(Echo::default());
        let response = client
            .request(RequestConfig::post("/items", json!({"a": 1})))
            .await
            .unwrap();
        assert_eq!(response.data["method"], "POST");
        assert_eq!(response.data["body"], r#"{"a":1}"#);

        let seen = client.transport().seen.lock().unwrap();
        assert_eq!(seen[0].header("accept"), Some("application/json"));
        assert_eq!(seen[0].header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn per_call_group_replaces_default_group() {
        let client = Client::new(Echo::default());
        let group = HeaderMap::from([("x-custom".to_string(), "1".to_string())]);
        let config = RequestConfig::post("/items", json!({})).method_headers(Method::Post, group);
        client.request(config).await.unwrap();

        let seen = client.transport().seen.lock().unwrap();
        assert_eq!(seen[0].header("x-custom"), Some("1"));
        assert_eq!(seen[0].header("content-type"), None);
        assert_eq!(seen[0].header("accept"), Some("application/json"));
    }

    #[tokio::test]
    async fn transform_request_sees_merged_headers() {
        let client = Client::new(Echo::default());
        let config = RequestConfig::post("/items", json!({"n": 1})).transform_request(
            |data: Value, headers: &HeaderConfig| {
                let content_type = headers
                    .group(Method::Post)
                    .and_then(|g| g.get("content-type"))
                    .cloned();
                json!({"wrapped": data, "content_type": content_type})
            },
        );
        let response = client.request(config).await.unwrap();
        let sent: Value = serde_json::from_str(response.data["body"].as_str().unwrap()).unwrap();
        assert_eq!(sent, json!({"wrapped": {"n": 1}, "content_type": "application/json"}));
    }

    #[tokio::test]
    async fn transform_request_skipped_without_data() {
        let client = Client::new(Echo::default());
        let config = RequestConfig::get("/x").transform_request(|_, _| json!("should not appear"));
        let response = client.request(config).await.unwrap();
        assert_eq!(response.data["body"], Value::Null);
    }

    #[tokio::test]
    async fn transform_request_skipped_for_falsy_data() {
        let client = Client::new(Echo::default());
        for data in [json!(false), json!(0), json!(""), Value::Null] {
            let config = RequestConfig::post("/x", data.clone())
                .transform_request(|_, _| json!("transformed"));
            client.request(config).await.unwrap();
        }
        let config = RequestConfig::post("/x", json!([])).transform_request(|_, _| json!(1));
        client.request(config).await.unwrap();

        let seen = client.transport().seen.lock().unwrap();
        let bodies: Vec<_> = seen.iter().map(|r| r.body.as_deref()).collect();
        assert_eq!(bodies, [Some("false"), Some("0"), Some("\"\""), None, Some("1")]);
    }

    #[tokio::test]
    async fn default_transform_request_applies() {
        let defaults = Defaults::default()
            .with_transform_request(|data: Value, _: &HeaderConfig| json!({"envelope": data}));
        let client = Client::with_defaults(Echo::default(), defaults);
        assert!(client.defaults().transform_request.is_some());

        let response = client
            .request(RequestConfig::post("/x", json!({"n": 1})))
            .await
            .unwrap();
        assert_eq!(response.data["body"], r#"{"envelope":{"n":1}}"#);
    }

    #[tokio::test]
    async fn shared_transport_serves_clients() {
        let transport = Arc::new(Echo::default());
        let first = Client::new(Arc::clone(&transport));
        let second = Client::new(Arc::clone(&transport));
        first.request(RequestConfig::get("/a")).await.unwrap();
        second.request(RequestConfig::get("/b")).await.unwrap();

        let seen = transport.seen.lock().unwrap();
        let urls: Vec<_> = seen.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["/a", "/b"]);
    }

    #[tokio::test]
    async fn default_transform_response_applies() {
        let defaults = Defaults::default().with_transform_response(|mut envelope| {
            envelope.status_text = "transformed".to_string();
            envelope
        });
        let client = Client::with_defaults(Echo::default(), defaults);
        let response = client.request(RequestConfig::get("/x")).await.unwrap();
        assert_eq!(response.status_text, "transformed");
    }

    #[tokio::test]
    async fn chain_is_snapshotted_per_call() {
        let mut client = Client::new(Echo::default());
        let id = client.interceptors.request.add(|config: RequestConfig| async move {
            Ok(config.header("x-step", "1"))
        });
        client.request(RequestConfig::get("/x")).await.unwrap();
        client.interceptors.request.eject(id);
        client.request(RequestConfig::get("/x")).await.unwrap();

        let seen = client.transport().seen.lock().unwrap();
        assert_eq!(seen[0].header("x-step"), Some("1"));
        assert_eq!(seen[1].header("x-step"), None);
    }
}
