//! The normalized response handed back to callers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RequestError;
use crate::http::{HttpRequest, HttpResponse};

/// Produced once per successful exchange, then threaded through the response
/// interceptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// The body parsed as JSON, or the raw text as a JSON string when it
    /// does not parse.
    pub data: Value,
    pub response_text: String,
    pub status: u16,
    pub status_text: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// The request as it was handed to the transport.
    pub request: HttpRequest,
}

impl ResponseEnvelope {
    pub fn from_exchange(request: HttpRequest, response: HttpResponse) -> Self {
        let data = serde_json::from_str(&response.body)
            .unwrap_or_else(|_| Value::String(response.body.clone()));
        Self {
            data,
            response_text: response.body,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            request,
        }
    }

    /// Deserialize `data` into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| RequestError::Serialization(e.to_string()))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
