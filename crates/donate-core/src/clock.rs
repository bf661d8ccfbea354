//! Timers
//!
//! The controller never touches a runtime directly; the host supplies a
//! clock (gloo timers in the browser, a manual clock in tests).

use std::time::Duration;

use async_trait::async_trait;

/// Deferred task
pub type Task = Box<dyn FnOnce()>;

#[async_trait(?Send)]
pub trait Clock {
    /// Resolve after `duration`
    async fn sleep(&self, duration: Duration);

    /// Run `task` once after `delay`
    fn schedule(&self, delay: Duration, task: Task);
}
