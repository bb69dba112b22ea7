//! Cooperative cancellation.
//!
//! The token is plumbed into every tool invocation and checked at the
//! evaluator's documented checkpoints: before each statement, before each
//! iteration of an iteration construct, and after each tool call. A fired
//! token unwinds the run with an error `try`/`catch` does not catch.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    fired: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token. Safe to call from another thread; idempotent.
    pub fn cancel(&self) {
        self.fired.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}
