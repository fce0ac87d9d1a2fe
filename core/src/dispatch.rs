//! One physical exchange per call.
//!
//! # Design
//! `dispatch` lowers a `RequestConfig` into an `HttpRequest`, then races the
//! transport against the configured timeout and the cancel signal inside a
//! single `tokio::select!`. Whichever branch completes first settles the
//! call; the losing branches are dropped, which aborts the transport future
//! so a late readiness event can never be observed. A signal that already
//! fired is honoured before the transport is touched.

use std::future::pending;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RequestConfig;
use crate::error::{DispatchOutcome, RequestError};
use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::query;
use crate::types::ResponseEnvelope;

/// Lower `config` into the plain request the transport receives.
pub fn build_request(config: &RequestConfig) -> Result<HttpRequest, RequestError> {
    let url = match &config.params {
        Some(params) => query::append_params(&config.url, params),
        None => config.url.clone(),
    };

    let body = match &config.data {
        None | Some(serde_json::Value::Null) => None,
        Some(data) => Some(
            serde_json::to_string(data).map_err(|e| RequestError::Serialization(e.to_string()))?,
        ),
    };

    Ok(HttpRequest {
        method: config.method,
        url,
        headers: config.headers.resolve(config.method),
        body,
        timeout: armed_timeout(config),
    })
}

/// A zero timeout means "no timeout", never an instant expiry.
fn armed_timeout(config: &RequestConfig) -> Option<Duration> {
    config.timeout.filter(|d| !d.is_zero())
}

pub async fn dispatch<T: Transport>(transport: &T, config: RequestConfig) -> DispatchOutcome {
    let request = match build_request(&config) {
        Ok(request) => request,
        Err(error) => return DispatchOutcome::Failed(error),
    };

    if let Some(cancel) = config.cancel_token.as_ref().and_then(|signal| signal.fired()) {
        debug!(method = %request.method, url = %request.url, "cancelled before dispatch");
        return DispatchOutcome::Cancelled(cancel);
    }

    debug!(method = %request.method, url = %request.url, "dispatching request");

    let timeout = armed_timeout(&config);
    let expired = async {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => pending().await,
        }
    };
    let cancelled = async {
        match &config.cancel_token {
            Some(signal) => signal.cancelled().await,
            None => pending().await,
        }
    };

    let outcome = tokio::select! {
        biased;
        cancel = cancelled => DispatchOutcome::Cancelled(cancel),
        () = expired => DispatchOutcome::Failed(timed_out(timeout)),
        result = transport.send(request.clone()) => classify(request, result, &config),
    };

    match &outcome {
        DispatchOutcome::Completed(response) => {
            debug!(status = response.status, "request completed");
        }
        DispatchOutcome::Cancelled(cancel) => debug!(reason = %cancel, "request cancelled"),
        DispatchOutcome::Failed(error) => debug!(%error, "request failed"),
    }
    outcome
}

/// Map what the transport reported onto a settlement.
fn classify(
    request: HttpRequest,
    result: Result<HttpResponse, TransportError>,
    config: &RequestConfig,
) -> DispatchOutcome {
    let response = match result {
        Ok(response) => response,
        Err(TransportError::TimedOut) => return DispatchOutcome::Failed(timed_out(config.timeout)),
        Err(TransportError::Network(detail)) => {
            warn!(url = %request.url, %detail, "transport error");
            return DispatchOutcome::Failed(RequestError::Network);
        }
    };

    match response.status {
        0 => DispatchOutcome::Failed(RequestError::NoStatus),
        200..=299 => {
            let mut envelope = ResponseEnvelope::from_exchange(request, response);
            if let Some(transform) = &config.transform_response {
                envelope = transform(envelope);
            }
            DispatchOutcome::Completed(envelope)
        }
        status => DispatchOutcome::Failed(RequestError::Status(status)),
    }
}

fn timed_out(timeout: Option<Duration>) -> RequestError {
    let ms = timeout.map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
    RequestError::Timeout { ms }
}
