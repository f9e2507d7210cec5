//! # Background Task Tracker
//!
//! Fire-and-forget execution of work detached from the request that submitted
//! it (welcome emails and the like). The tracker keeps a count of outstanding
//! tasks so the shutdown coordinator can wait for all of them:
//!
//! - a task is registered *before* its future is handed to the runtime, so a
//!   shutdown that begins right after the submitting handler returns still
//!   observes it;
//! - a task is deregistered only after its future finishes, panic or not;
//! - a panic is caught at the task boundary, reported through the injected
//!   diagnostics sink, and never reaches the submitter or the process.
//!
//! Submitters get nothing back. Work that needs a result must not use this.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use std::future::Future;
use tokio::sync::Notify;

use crate::observability::Diagnostics;

/// Tracks detached background tasks for the shutdown coordinator
#[derive(Clone)]
pub struct TaskTracker {
    inner: Arc<Inner>,
}

struct Inner {
    outstanding: Mutex<usize>,
    all_done: Notify,
    diagnostics: Arc<dyn Diagnostics>,
}

impl TaskTracker {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            inner: Arc::new(Inner {
                outstanding: Mutex::new(0),
                all_done: Notify::new(),
                diagnostics,
            }),
        }
    }

    /// Run `task` on its own tokio task, tracked until it finishes.
    ///
    /// The outstanding count is incremented synchronously, before this call
    /// returns, so `wait()` started at any later point covers the task.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        {
            let mut outstanding = self.inner.outstanding.lock().unwrap();
            *outstanding += 1;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            // The panic is the task's failure signal; contain it here and
            // report it out-of-band. The submitting request has usually
            // already been answered by now.
            if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                // Downcast the payload itself, not the box holding it
                let cause = panic_message(panic.as_ref());
                inner.diagnostics.error(
                    "background_task_panicked",
                    &[("task", name), ("cause", cause.as_str())],
                );
            }

            let mut outstanding = inner.outstanding.lock().unwrap();
            *outstanding -= 1;
            if *outstanding == 0 {
                inner.all_done.notify_waiters();
            }
        });
    }

    /// Number of tasks registered but not yet finished
    pub fn outstanding(&self) -> usize {
        *self.inner.outstanding.lock().unwrap()
    }

    /// Block until every tracked task has finished.
    ///
    /// There is no deadline here; the shutdown coordinator waits for
    /// background work unconditionally.
    pub async fn wait(&self) {
        loop {
            // Register interest before reading the count so a decrement
            // between the two cannot be missed.
            let notified = self.inner.all_done.notified();
            if *self.inner.outstanding.lock().unwrap() == 0 {
                return;
            }
            notified.await;
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
