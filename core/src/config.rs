//! Request configuration and per-client defaults.
//!
//! # Design
//! Headers are kept in three explicit tiers instead of one loosely typed map:
//! `common` applies to every verb, `per_method` applies only when its verb is
//! the active one, and `direct` applies unconditionally. Merging a per-call
//! `HeaderConfig` over the defaults is shallow at the group level: a supplied
//! group replaces the default group wholesale, it is never deep-merged.
//!
//! `Defaults` is built once and handed to the client at construction. The
//! client only ever reads it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cancel::CancelSignal;
use crate::types::ResponseEnvelope;

/// Header name to value within one tier.
pub type HeaderMap = BTreeMap<String, String>;

/// Rewrites the request body before dispatch. Receives the merged headers.
pub type TransformRequest = Arc<dyn Fn(Value, &HeaderConfig) -> Value + Send + Sync>;

/// Replaces the whole response envelope after a successful exchange.
pub type TransformResponse = Arc<dyn Fn(ResponseEnvelope) -> ResponseEnvelope + Send + Sync>;

/// HTTP verb. Parsed case-insensitively, grouped under lower-case keys,
/// sent upper-case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Options,
        Method::Head,
    ];

    /// Wire form, e.g. `"GET"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
        }
    }

    /// Verbs whose default group carries a JSON content type.
    pub fn carries_body(self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized HTTP method: {0}")]
pub struct ParseMethodError(pub String);

impl FromStr for Method {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseMethodError(s.to_string()))
    }
}

/// Three-tier header configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderConfig {
    /// Applied to every verb. `None` means "not supplied" so a per-call
    /// config can leave the default group in place.
    pub common: Option<HeaderMap>,
    pub per_method: BTreeMap<Method, HeaderMap>,
    pub direct: HeaderMap,
}

impl HeaderConfig {
    /// The groups every client starts with: `accept: application/json` for
    /// all verbs, a JSON content type for body-bearing verbs, and an empty
    /// group for every other recognized verb.
    pub fn defaults() -> Self {
        let common = HeaderMap::from([("accept".to_string(), "application/json".to_string())]);
        let per_method = Method::ALL
            .into_iter()
            .map(|method| {
                let mut group = HeaderMap::new();
                if method.carries_body() {
                    group.insert("content-type".to_string(), "application/json".to_string());
                }
                (method, group)
            })
            .collect();
        Self {
            common: Some(common),
            per_method,
            direct: HeaderMap::new(),
        }
    }

    /// Shallow merge: `overrides` wins per top-level key and supplied groups
    /// replace the default group of the same key.
    pub fn merge(&self, overrides: HeaderConfig) -> HeaderConfig {
        let mut merged = self.clone();
        if let Some(common) = overrides.common {
            merged.common = Some(common);
        }
        merged.per_method.extend(overrides.per_method);
        merged.direct.extend(overrides.direct);
        merged
    }

    pub fn group(&self, method: Method) -> Option<&HeaderMap> {
        self.per_method.get(&method)
    }

    /// Flatten the tiers for `method`: common, then the method's own group,
    /// then direct headers. A later tier replaces an earlier header of the
    /// same name.
    pub fn resolve(&self, method: Method) -> Vec<(String, String)> {
        let tiers = self
            .common
            .iter()
            .chain(self.per_method.get(&method))
            .chain(std::iter::once(&self.direct));

        let mut resolved: Vec<(String, String)> = Vec::new();
        for (name, value) in tiers.flatten() {
            match resolved.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some(slot) => slot.1 = value.clone(),
                None => resolved.push((name.clone(), value.clone())),
            }
        }
        resolved
    }
}

/// Query parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Key/value pairs in insertion order.
    Pairs(Vec<(String, Value)>),
    /// A pre-encoded query string, appended verbatim.
    Raw(String),
}

/// Configuration of a single call.
#[derive(Clone, Default)]
pub struct RequestConfig {
    pub url: String,
    pub method: Method,
    pub params: Option<Params>,
    pub data: Option<Value>,
    pub headers: HeaderConfig,
    pub timeout: Option<Duration>,
    pub transform_request: Option<TransformRequest>,
    pub transform_response: Option<TransformResponse>,
    pub cancel_token: Option<CancelSignal>,
}

impl RequestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url)
    }

    pub fn post(url: impl Into<String>, data: impl Into<Value>) -> Self {
        Self::new(url).method(Method::Post).data(data)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::Delete)
    }

    pub fn options(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::Options)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Append one query pair. Replaces a raw query string if one was set.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let pair = (key.into(), value.into());
        match &mut self.params {
            Some(Params::Pairs(pairs)) => pairs.push(pair),
            _ => self.params = Some(Params::Pairs(vec![pair])),
        }
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn headers(mut self, headers: HeaderConfig) -> Self {
        self.headers = headers;
        self
    }

    /// Direct header, sent regardless of verb.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.direct.insert(name.into(), value.into());
        self
    }

    /// Replace the `common` group for this call.
    pub fn common_headers(mut self, group: HeaderMap) -> Self {
        self.headers.common = Some(group);
        self
    }

    /// Replace the group for `method` for this call.
    pub fn method_headers(mut self, method: Method, group: HeaderMap) -> Self {
        self.headers.per_method.insert(method, group);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_ms(self, ms: u64) -> Self {
        self.timeout(Duration::from_millis(ms))
    }

    pub fn transform_request<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &HeaderConfig) -> Value + Send + Sync + 'static,
    {
        self.transform_request = Some(Arc::new(f));
        self
    }

    pub fn transform_response<F>(mut self, f: F) -> Self
    where
        F: Fn(ResponseEnvelope) -> ResponseEnvelope + Send + Sync + 'static,
    {
        self.transform_response = Some(Arc::new(f));
        self
    }

    pub fn cancel_token(mut self, signal: CancelSignal) -> Self {
        self.cancel_token = Some(signal);
        self
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("transform_request", &self.transform_request.is_some())
            .field("transform_response", &self.transform_response.is_some())
            .field("cancel_token", &self.cancel_token.is_some())
            .finish()
    }
}

/// Per-client defaults. Read-only once the client is built.
#[derive(Clone)]
pub struct Defaults {
    pub headers: HeaderConfig,
    pub timeout: Option<Duration>,
    pub transform_request: Option<TransformRequest>,
    pub transform_response: Option<TransformResponse>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            headers: HeaderConfig::defaults(),
            timeout: None,
            transform_request: None,
            transform_response: None,
        }
    }
}

impl Defaults {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.direct.insert(name.into(), value.into());
        self
    }

    pub fn with_method_header(
        mut self,
        method: Method,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers
            .per_method
            .entry(method)
            .or_default()
            .insert(name.into(), value.into());
        self
    }

    pub fn with_transform_request<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &HeaderConfig) -> Value + Send + Sync + 'static,
    {
        self.transform_request = Some(Arc::new(f));
        self
    }

    pub fn with_transform_response<F>(mut self, f: F) -> Self
    where
        F: Fn(ResponseEnvelope) -> ResponseEnvelope + Send + Sync + 'static,
    {
        self.transform_response = Some(Arc::new(f));
        self
    }

    /// Lay a per-call config over these defaults. Headers merge per
    /// `HeaderConfig::merge`; every other field keeps the per-call value when
    /// one was given.
    pub fn apply(&self, mut config: RequestConfig) -> RequestConfig {
        config.headers = self.headers.merge(config.headers);
        config.timeout = config.timeout.or(self.timeout);
        if config.transform_request.is_none() {
            config.transform_request = self.transform_request.clone();
        }
        if config.transform_response.is_none() {
            config.transform_response = self.transform_response.clone();
        }
        config
    }
}

impl fmt::Debug for Defaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defaults")
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("transform_request", &self.transform_request.is_some())
            .field("transform_response", &self.transform_response.is_some())
            .finish()
    }
}
