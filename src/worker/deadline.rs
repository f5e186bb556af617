//! Wall-clock deadline for a worker run.
//!
//! A dedicated timer thread waits for either the deadline or a disarm
//! message. On expiry the only thing it does is set the `fired` flag; the
//! coordinator's polling loop observes the flag and kills stragglers.
//!
//! ```text
//!   Disarmed ──arm(t)──▶ Armed ──t elapses──▶ Fired
//!      ▲                   │                    │
//!      └──────disarm()─────┴──────disarm()──────┘
//! ```

use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Observable state of a [`Deadline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineState {
    Disarmed,
    Armed,
    Fired,
}

/// Timeout governor for one run.
pub struct Deadline {
    fired: Arc<AtomicBool>,
    /// Dropping the sender wakes the timer thread early.
    cancel: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    timeout: Option<Duration>,
}

impl Deadline {
    /// A governor that never fires.
    pub fn disarmed() -> Self {
        Self {
            fired: Arc::new(AtomicBool::new(false)),
            cancel: None,
            thread: None,
            timeout: None,
        }
    }

    /// Start the timer.
    pub fn arm(timeout: Duration) -> Result<Self> {
        let fired = Arc::new(AtomicBool::new(false));
        let (cancel, wake) = mpsc::channel::<()>();

        let fired_clone = fired.clone();
        let thread = thread::Builder::new()
            .name("pminmax-deadline".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = wake.recv_timeout(timeout) {
                    fired_clone.store(true, Ordering::Release);
                }
            })?;

        tracing::debug!(timeout_secs = timeout.as_secs_f64(), "Deadline armed");

        Ok(Self {
            fired,
            cancel: Some(cancel),
            thread: Some(thread),
            timeout: Some(timeout),
        })
    }

    /// Arm when a timeout is configured, otherwise stay disarmed.
    pub fn from_timeout(timeout: Option<Duration>) -> Result<Self> {
        match timeout {
            Some(t) => Self::arm(t),
            None => Ok(Self::disarmed()),
        }
    }

    /// Whether the deadline elapsed (sticky across disarm).
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    pub fn state(&self) -> DeadlineState {
        if self.has_fired() {
            DeadlineState::Fired
        } else if self.thread.is_some() {
            DeadlineState::Armed
        } else {
            DeadlineState::Disarmed
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Stop the timer and join its thread. Returns the state it was in.
    ///
    /// A `Fired` result stays `Fired`; an `Armed` one becomes `Disarmed`.
    pub fn disarm(&mut self) -> DeadlineState {
        let state = self.state();
        self.cancel = None;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            tracing::debug!(state = ?state, "Deadline disarmed");
        }
        // The timer may have fired between the snapshot and the join.
        if self.has_fired() {
            DeadlineState::Fired
        } else {
            state
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.disarm();
    }
}
