//! A cloneable handle for poking a session from external code.

use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for cancelling the in-flight turn from outside the
/// session, e.g. a stop button.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) is_running: Arc<AtomicBool>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abort the in-flight turn, if any.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Whether a turn is currently running.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Install a fresh token for a new turn and return it.
    pub(crate) fn reset(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        token
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.is_running.store(running, Ordering::Release);
    }
}
