//! Cooperative cancellation.
//!
//! `CancelToken::source()` yields a paired `CancelSignal` (handed to the
//! request through `RequestConfig::cancel_token`) and `CancelTrigger` (kept
//! by the caller). The pair is backed by a `tokio::sync::watch` channel that
//! only ever transitions from empty to holding a `Cancel`, so the signal
//! fires at most once and later triggers are no-ops.

use std::fmt;

use tokio::sync::watch;

/// Cancellation marker carried as the rejection reason of a cancelled
/// request. Not an error in itself: `RequestError::is_cancel` tells it apart
/// from genuine failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancel {
    message: String,
}

impl Cancel {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Factory for signal/trigger pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancelToken;

/// One signal/trigger pair.
#[derive(Debug)]
pub struct CancelSource {
    pub signal: CancelSignal,
    pub trigger: CancelTrigger,
}

impl CancelToken {
    pub fn source() -> CancelSource {
        let (tx, rx) = watch::channel(None);
        CancelSource {
            signal: CancelSignal { rx },
            trigger: CancelTrigger { tx },
        }
    }
}

/// Caller-held half. Firing is single-shot.
#[derive(Debug)]
pub struct CancelTrigger {
    tx: watch::Sender<Option<Cancel>>,
}

impl CancelTrigger {
    /// Fire the signal with `message`. Returns `false` if it had already
    /// fired, in which case nothing changes.
    pub fn cancel(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(Cancel::new(message));
            true
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

/// Request-held half. Cheap to clone; every clone observes the same firing.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<Option<Cancel>>,
}

impl CancelSignal {
    /// The marker, if the trigger has already fired.
    pub fn fired(&self) -> Option<Cancel> {
        self.rx.borrow().clone()
    }

    /// Resolves with the marker once the trigger fires. Stays pending forever
    /// if the trigger is dropped without firing.
    pub async fn cancelled(&self) -> Cancel {
        let mut rx = self.rx.clone();
        loop {
            if let Some(cancel) = rx.borrow_and_update().clone() {
                return cancel;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}
