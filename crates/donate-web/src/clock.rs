//! Browser Clock
//!
//! `Clock` on `setTimeout` via gloo timers.

use std::time::Duration;

use async_trait::async_trait;
use donate_core::{clock::Task, Clock};
use gloo::timers::{callback::Timeout, future::TimeoutFuture};

pub struct BrowserClock;

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

#[async_trait(?Send)]
impl Clock for BrowserClock {
    async fn sleep(&self, duration: Duration) {
        TimeoutFuture::new(millis(duration)).await;
    }

    fn schedule(&self, delay: Duration, task: Task) {
        Timeout::new(millis(delay), task).forget();
    }
}
