//! Scoped callback execution
//!
//! Runs one user callback raced against an optional timer and an external
//! termination signal. Exactly one participant wins; the others are dropped
//! without being awaited.

use futures::FutureExt;
use std::any::Any;
use std::future::{pending, Future};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::debug;

use crate::models::{Failure, Phase};

/// Why a callback did not complete successfully
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    #[error("{0}")]
    Raised(String),

    #[error("timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    #[error("terminated")]
    Terminated,
}

impl CallbackError {
    /// Attribute the error to a lifecycle phase
    pub fn into_failure(self, phase: Phase) -> Failure {
        match self {
            CallbackError::Raised(message) => Failure::Raised { phase, message },
            CallbackError::TimedOut(_) => Failure::TimedOut { phase },
            CallbackError::Terminated => Failure::Terminated { phase },
        }
    }
}

/// Cloneable handle that terminates the callback currently armed on it
///
/// A worker keeps one terminator and re-arms it for every hook and test body,
/// so a clone taken up front can abort whatever is in flight later on.
#[derive(Clone, Debug, Default)]
pub struct Terminator {
    slot: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl Terminator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh signal, replacing any previous one
    pub(crate) fn arm(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        rx
    }

    pub(crate) fn disarm(&self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Terminate the armed callback; returns false when nothing was armed
    pub fn terminate(&self) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// One armed callback invocation
#[derive(Debug)]
pub struct ScopedCall {
    timeout: Option<Duration>,
    terminated: oneshot::Receiver<()>,
}

impl ScopedCall {
    /// Arm `terminator` for a call limited to `timeout` (zero means no limit)
    pub fn new(timeout: Duration, terminator: &Terminator) -> Self {
        Self {
            timeout: (!timeout.is_zero()).then_some(timeout),
            terminated: terminator.arm(),
        }
    }

    /// Invoke `callback` and drive its future to the first of completion,
    /// timeout or termination
    ///
    /// The callback is invoked inside the unwind guard, so a panic before it
    /// returns its future is reported as a raised error just like a panic
    /// while the future is polled. When the timer or the termination signal
    /// wins, the callback future is dropped at its current suspension point;
    /// anything it spawned keeps running unobserved.
    pub async fn run<F, Fut>(self, callback: F) -> Result<(), CallbackError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let ScopedCall {
            timeout,
            terminated,
        } = self;

        let timer = async move {
            match timeout {
                Some(limit) => sleep(limit).await,
                None => pending::<()>().await,
            }
        };

        let guarded = AssertUnwindSafe(async move { callback().await }).catch_unwind();

        tokio::select! {
            settled = guarded => match settled {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(CallbackError::Raised(format!("{err:#}"))),
                Err(payload) => Err(CallbackError::Raised(panic_message(payload))),
            },
            _ = timer => {
                let limit = timeout.unwrap_or_default();
                debug!("Callback timed out after {}ms", limit.as_millis());
                Err(CallbackError::TimedOut(limit))
            }
            Ok(()) = terminated => {
                debug!("Callback terminated");
                Err(CallbackError::Terminated)
            }
        }
    }
}

/// Create a standalone call together with its termination handle
pub fn scoped(timeout: Duration) -> (ScopedCall, Terminator) {
    let terminator = Terminator::new();
    let call = ScopedCall::new(timeout, &terminator);
    (call, terminator)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}
