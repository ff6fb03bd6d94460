//! Session-owned background tasks
//!
//! Every timer and listener a session starts lives in one of these guards.
//! Dropping the guard aborts the task, so clearing a session's timer slots
//! (or dropping the session) is all the cleanup there is.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Aborts its task on drop
#[derive(Debug)]
pub struct TaskGuard {
    handle: JoinHandle<()>,
}

impl TaskGuard {
    pub fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(task),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Periodic callback, first fired one period after creation
#[derive(Debug)]
pub struct Ticker {
    guard: TaskGuard,
}

impl Ticker {
    /// Run `tick` every `period` until it breaks or the ticker is dropped
    pub fn every<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let guard = TaskGuard::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if tick().await.is_break() {
                    break;
                }
            }
        });

        Self { guard }
    }

    pub fn is_finished(&self) -> bool {
        self.guard.is_finished()
    }
}
