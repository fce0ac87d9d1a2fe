//! Ordered registries of fulfillment/rejection hooks.
//!
//! One `InterceptorManager<RequestConfig>` guards outgoing configs and one
//! `InterceptorManager<ResponseEnvelope>` guards responses. An interceptor's
//! id is its registration slot; ejecting nulls the slot in place, so ids and
//! the relative order of the remaining interceptors never shift.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::error::RequestError;

type FulfilledHook<T> =
    Arc<dyn Fn(T) -> BoxFuture<'static, Result<T, RequestError>> + Send + Sync>;
type RejectedHook<T> =
    Arc<dyn Fn(RequestError) -> BoxFuture<'static, Result<T, RequestError>> + Send + Sync>;

/// A hook pair. `on_fulfilled` sees the value when the previous step
/// succeeded; `on_rejected`, when present, sees the error when it failed and
/// may recover by returning `Ok`.
pub struct Interceptor<T> {
    on_fulfilled: FulfilledHook<T>,
    on_rejected: Option<RejectedHook<T>>,
}

impl<T: Send + 'static> Interceptor<T> {
    pub fn new<F, Fut>(on_fulfilled: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
    {
        Self {
            on_fulfilled: Arc::new(move |value: T| on_fulfilled(value).boxed()),
            on_rejected: None,
        }
    }

    pub fn on_rejected<R, Fut>(mut self, on_rejected: R) -> Self
    where
        R: Fn(RequestError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
    {
        self.on_rejected = Some(Arc::new(move |error: RequestError| on_rejected(error).boxed()));
        self
    }

    /// Compose this step onto the running state: fulfilled values go to
    /// `on_fulfilled`, errors go to `on_rejected` or pass through untouched.
    pub async fn run(&self, state: Result<T, RequestError>) -> Result<T, RequestError> {
        match state {
            Ok(value) => (self.on_fulfilled)(value).await,
            Err(error) => match &self.on_rejected {
                Some(on_rejected) => on_rejected(error).await,
                None => Err(error),
            },
        }
    }
}

impl<T> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        Self {
            on_fulfilled: Arc::clone(&self.on_fulfilled),
            on_rejected: self.on_rejected.clone(),
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("on_rejected", &self.on_rejected.is_some())
            .finish_non_exhaustive()
    }
}

/// Registration slot of an interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(usize);

impl InterceptorId {
    pub fn index(self) -> usize {
        self.0
    }
}

pub struct InterceptorManager<T> {
    slots: Vec<Option<Interceptor<T>>>,
}

impl<T> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T: Send + 'static> InterceptorManager<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fulfillment hook with no rejection handler.
    pub fn add<F, Fut>(&mut self, on_fulfilled: F) -> InterceptorId
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
    {
        self.push(Interceptor::new(on_fulfilled))
    }

    /// Register a fulfillment hook together with a rejection handler.
    pub fn add_with_rejection<F, FFut, R, RFut>(
        &mut self,
        on_fulfilled: F,
        on_rejected: R,
    ) -> InterceptorId
    where
        F: Fn(T) -> FFut + Send + Sync + 'static,
        FFut: Future<Output = Result<T, RequestError>> + Send + 'static,
        R: Fn(RequestError) -> RFut + Send + Sync + 'static,
        RFut: Future<Output = Result<T, RequestError>> + Send + 'static,
    {
        self.push(Interceptor::new(on_fulfilled).on_rejected(on_rejected))
    }

    pub fn push(&mut self, interceptor: Interceptor<T>) -> InterceptorId {
        self.slots.push(Some(interceptor));
        InterceptorId(self.slots.len() - 1)
    }
}

impl<T> InterceptorManager<T> {
    /// Make the slot inert. Returns `false` for unknown or already ejected
    /// ids.
    pub fn eject(&mut self, id: InterceptorId) -> bool {
        match self.slots.get_mut(id.0) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    /// Live interceptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Interceptor<T>> {
        self.slots.iter().flatten()
    }

    /// Live interceptors with their ids, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (InterceptorId, &Interceptor<T>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|s| (InterceptorId(i), s)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for InterceptorManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorManager")
            .field("slots", &self.slots.len())
            .field("live", &self.len())
            .finish()
    }
}
