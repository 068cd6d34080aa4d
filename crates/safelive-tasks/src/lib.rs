//! SafeLive Tasks - background passes
//!
//! The two periodic passes behind the workflow engine, plus the handle that
//! runs them on a cadence:
//! - [`progress::ProgressTask`] reconciles every ticket's progress fields
//!   against status, assignment, and the latest update text
//! - [`reminder::ReminderTask`] nags field inspectors who have gone a local
//!   day without posting an update
//!
//! The `safelived` binary wires both onto an in-memory store together with
//! the store maintenance sweeps.

#![warn(unreachable_pub)]

pub mod progress;
pub mod reminder;

pub use progress::{PassSummary, ProgressTask};
pub use reminder::{ReminderConfig, ReminderTask};

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A running background pass. Dropping the handle detaches the task;
/// [`TaskHandle::stop`] shuts it down and waits for it.
pub struct TaskHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Run `work` every `every` until the handle is stopped.
    pub fn spawn<F, Fut>(name: &'static str, every: Duration, mut work: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (shutdown, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => work().await,
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(task = name, "background task stopped");
        });
        Self { shutdown, handle }
    }

    /// Signal shutdown and wait for the task to finish its current pass
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
