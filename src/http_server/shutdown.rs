//! Shutdown lifecycle coordination
//!
//! One [`ShutdownCoordinator`] instance owns the process lifecycle as an
//! explicit state machine, `Running -> Draining -> Stopped`, linear with no
//! cycles. Collaborators that need to ask "are we draining" hold a
//! [`LifecycleHandle`] rather than reading ambient global state.
//!
//! The transition to `Draining` happens at most once, on the first
//! termination signal; later signals are ignored. `Stopped` is only reached
//! from `Draining`, after both the connection drain and the background-task
//! wait have finished.

use std::sync::Arc;

use tokio::sync::watch;

/// Process lifecycle states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    /// Accepting connections, handlers running, tasks submitted freely
    Running,
    /// Listener closed, in-flight work finishing
    Draining,
    /// Drain and background-task wait both complete
    Stopped,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Running => "running",
            Lifecycle::Draining => "draining",
            Lifecycle::Stopped => "stopped",
        }
    }
}

/// Owner of the lifecycle state machine
#[derive(Clone)]
pub struct ShutdownCoordinator {
    tx: Arc<watch::Sender<Lifecycle>>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Lifecycle::Running);
        Self { tx: Arc::new(tx) }
    }

    /// Current state
    pub fn state(&self) -> Lifecycle {
        *self.tx.borrow()
    }

    /// Enter `Draining`. Returns true for the first caller; every later call
    /// is a no-op, which is how repeat termination signals are absorbed.
    pub fn begin_drain(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == Lifecycle::Running {
                *state = Lifecycle::Draining;
                true
            } else {
                false
            }
        })
    }

    /// Enter `Stopped`. Only valid from `Draining`; the run loop calls this
    /// once the drain result is known and the task tracker is empty.
    pub fn mark_stopped(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == Lifecycle::Draining {
                *state = Lifecycle::Stopped;
                true
            } else {
                false
            }
        })
    }

    /// A read-only handle for collaborators
    pub fn handle(&self) -> LifecycleHandle {
        LifecycleHandle {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only view of the lifecycle
#[derive(Clone)]
pub struct LifecycleHandle {
    rx: watch::Receiver<Lifecycle>,
}

impl LifecycleHandle {
    pub fn current(&self) -> Lifecycle {
        *self.rx.borrow()
    }

    pub fn is_draining(&self) -> bool {
        self.current() != Lifecycle::Running
    }

    /// Resolve once the lifecycle has left `Running`
    pub async fn draining(&mut self) {
        // The coordinator outlives the server loop, but a dropped sender
        // must still unblock waiters.
        let _ = self.rx.wait_for(|state| *state != Lifecycle::Running).await;
    }

    /// Resolve once the lifecycle has reached `Stopped`
    pub async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|state| *state == Lifecycle::Stopped).await;
    }
}
