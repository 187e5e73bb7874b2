//! Periodic per-button refresh.
//!
//! A [`PollTask`] is owned by the button it refreshes. Dropping it aborts the
//! background loop, so removing a button from the registry is all it takes to
//! stop its polling.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use homedeck_core::prelude::*;

/// Handle to a running poll loop.
#[derive(Debug)]
pub struct PollTask {
    handle: JoinHandle<()>,
}

impl PollTask {
    /// Start calling `tick` every `period`.
    ///
    /// The immediate first tick of the interval is consumed: callers refresh
    /// right away on their own. Each call is awaited before the next tick is
    /// taken, so calls never overlap; a slow call delays the schedule instead
    /// of bunching ticks.
    pub fn spawn<F, Fut>(context: &str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let context = context.to_string();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                interval.tick().await;
                trace!("Poll tick for {}", context);
                tick().await;
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
