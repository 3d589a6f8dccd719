//! # Manual Scheduler
//!
//! A [`Scheduler`] that never drains anything on its own. Scheduled mailboxes are queued until the
//! caller runs them with [`ManualScheduler::run_once`] or [`ManualScheduler::run_until_idle`].
//!
//! | Feature | ManualScheduler | Thread |
//! |---------|-----------------|--------|
//! | **Execution context** | The calling thread | A dedicated worker thread |
//! | **Determinism** | 100% deterministic | Subject to OS scheduling |
//! | **Use case** | Unit testing actor logic and ordering | Production, concurrency tests |
//!
//! ```rust
//! use actor_mailbox::framework::mock::ManualScheduler;
//! use actor_mailbox::Actor;
//!
//! let scheduler = ManualScheduler::new();
//! let counter = Actor::new(scheduler.clone(), |_| 0u32);
//!
//! counter.invoke(|n| *n += 2);
//! let mut reply = counter.ask(|n| *n);
//! assert!(reply.try_wait().is_none());
//!
//! scheduler.run_until_idle();
//! assert_eq!(reply.try_wait().unwrap().unwrap(), 2);
//! ```

use crate::framework::scheduler::{maybe_receive, Drain, Scheduler};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Caller-driven scheduler for tests and single-threaded embedding.
#[derive(Default)]
pub struct ManualScheduler {
    pending: Mutex<VecDeque<Weak<dyn Drain>>>,
    notifications: AtomicUsize,
}

impl ManualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of drain requests waiting to run.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Total number of `schedule` calls received so far.
    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }

    /// Runs the oldest pending drain request. Returns `false` if there was none.
    pub fn run_once(&self) -> bool {
        let next = self.pending.lock().pop_front();
        match next {
            Some(mailbox) => {
                maybe_receive(&mailbox);
                true
            }
            None => false,
        }
    }

    /// Runs drain requests, including ones scheduled while running, until none are left.
    ///
    /// Returns how many requests ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_once() {
            ran += 1;
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, mailbox: Weak<dyn Drain>) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().push_back(mailbox);
    }
}
