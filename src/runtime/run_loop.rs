//! # Run Loop
//!
//! A single-threaded cooperative task loop. [`RunLoop::run`] executes posted tasks one after
//! another on the calling thread until [`RunLoop::stop`] is called. It is the execution context
//! of a [`Thread`](crate::runtime::Thread): mailbox drains, timers and the pause/destroy
//! handshakes are all tasks on the loop.
//!
//! Ordering rules:
//! - [`Priority::High`] tasks run before any [`Priority::Default`] task that is already queued.
//! - Tasks of the same priority run in the order they were posted.
//! - Timers ([`RunLoop::invoke_after`]) join the default queue once their deadline has passed.
//!
//! Objects running on the loop can reach it through [`RunLoop::current`], e.g. to set timers.

use crate::framework::error::ActorError;
use crate::framework::scheduler::{Drain, DrainRequest, Scheduler};
use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Task class on a [`RunLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Jumps ahead of queued default tasks. Used by `Thread::pause`.
    High,
    #[default]
    Default,
}

struct Timer {
    deadline: Instant,
    seq: u64,
    task: Task,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

#[derive(Default)]
struct Queues {
    high: VecDeque<Task>,
    default: VecDeque<Task>,
    timers: BinaryHeap<Reverse<Timer>>,
    next_seq: u64,
    stopped: bool,
}

impl Queues {
    fn promote_due_timers(&mut self, now: Instant) {
        while self
            .timers
            .peek()
            .is_some_and(|Reverse(timer)| timer.deadline <= now)
        {
            if let Some(Reverse(timer)) = self.timers.pop() {
                self.default.push_back(timer.task);
            }
        }
    }

    fn take_all(&mut self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.high.drain(..).collect();
        tasks.extend(self.default.drain(..));
        tasks.extend(self.timers.drain().map(|Reverse(timer)| timer.task));
        tasks
    }
}

struct Shared {
    queues: Mutex<Queues>,
    wake: Condvar,
}

thread_local! {
    static CURRENT: RefCell<Option<RunLoop>> = const { RefCell::new(None) };
}

/// Handle to a run loop. Clones refer to the same loop.
#[derive(Clone)]
pub struct RunLoop {
    shared: Arc<Shared>,
}

impl RunLoop {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queues: Mutex::new(Queues::default()),
                wake: Condvar::new(),
            }),
        }
    }

    /// The loop currently running on this thread, if any.
    pub fn current() -> Option<RunLoop> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Posts a default-priority task.
    pub fn invoke<F>(&self, task: F) -> Result<(), ActorError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.invoke_with_priority(Priority::Default, task)
    }

    /// Posts a task with the given priority.
    ///
    /// Fails with [`ActorError::LoopStopped`] once the loop has stopped; the task is dropped.
    pub fn invoke_with_priority<F>(&self, priority: Priority, task: F) -> Result<(), ActorError>
    where
        F: FnOnce() + Send + 'static,
    {
        let task: Task = Box::new(task);
        let mut queues = self.shared.queues.lock();
        if queues.stopped {
            drop(queues);
            drop(task);
            return Err(ActorError::LoopStopped);
        }
        match priority {
            Priority::High => queues.high.push_back(task),
            Priority::Default => queues.default.push_back(task),
        }
        drop(queues);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Posts a task that runs once `delay` has elapsed.
    pub fn invoke_after<F>(&self, delay: Duration, task: F) -> Result<(), ActorError>
    where
        F: FnOnce() + Send + 'static,
    {
        let task: Task = Box::new(task);
        let mut queues = self.shared.queues.lock();
        if queues.stopped {
            drop(queues);
            drop(task);
            return Err(ActorError::LoopStopped);
        }
        let seq = queues.next_seq;
        queues.next_seq += 1;
        queues.timers.push(Reverse(Timer {
            deadline: Instant::now() + delay,
            seq,
            task,
        }));
        drop(queues);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Makes [`run`](Self::run) return after the task it is currently executing.
    ///
    /// Tasks still queued are dropped without running.
    pub fn stop(&self) {
        let abandoned = {
            let mut queues = self.shared.queues.lock();
            queues.stopped = true;
            queues.take_all()
        };
        self.shared.wake.notify_all();
        drop(abandoned);
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.queues.lock().stopped
    }

    /// Runs tasks on the calling thread until the loop is stopped.
    ///
    /// If a task panics the panic propagates, and the loop is left stopped: queued tasks are
    /// dropped and later posts are rejected.
    pub fn run(&self) {
        let _running = Running::enter(self);
        debug!("Run loop started");
        while let Some(task) = self.next_task() {
            task();
        }
        debug!("Run loop stopped");
    }

    fn next_task(&self) -> Option<Task> {
        let mut queues = self.shared.queues.lock();
        loop {
            if queues.stopped {
                return None;
            }
            queues.promote_due_timers(Instant::now());
            if let Some(task) = queues.high.pop_front() {
                return Some(task);
            }
            if let Some(task) = queues.default.pop_front() {
                return Some(task);
            }
            let next_deadline = queues.timers.peek().map(|Reverse(timer)| timer.deadline);
            match next_deadline {
                Some(deadline) => {
                    self.shared.wake.wait_until(&mut queues, deadline);
                }
                None => self.shared.wake.wait(&mut queues),
            }
        }
    }
}

impl Default for RunLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for RunLoop {
    /// Posts a drain task. On a stopped loop, or when the loop stops before the task runs, the
    /// mailbox is abandoned.
    fn schedule(&self, mailbox: Weak<dyn Drain>) {
        let request = DrainRequest::new(mailbox);
        if self.invoke(move || request.run()).is_err() {
            trace!("Drain request for stopped run loop rejected");
        }
    }
}

impl fmt::Debug for RunLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queues = self.shared.queues.lock();
        f.debug_struct("RunLoop")
            .field("high", &queues.high.len())
            .field("default", &queues.default.len())
            .field("timers", &queues.timers.len())
            .field("stopped", &queues.stopped)
            .finish()
    }
}

/// Marks a loop as running on this thread; on exit (normal or unwinding) stops it and drops
/// whatever is still queued.
struct Running {
    run_loop: RunLoop,
    previous: Option<RunLoop>,
}

impl Running {
    fn enter(run_loop: &RunLoop) -> Self {
        let previous = CURRENT.with(|current| current.replace(Some(run_loop.clone())));
        Self {
            run_loop: run_loop.clone(),
            previous,
        }
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        let abandoned = {
            let mut queues = self.run_loop.shared.queues.lock();
            queues.stopped = true;
            queues.take_all()
        };
        if !abandoned.is_empty() {
            debug!(abandoned = abandoned.len(), "Dropping tasks left on stopped run loop");
        }
        // Dropped tasks may post to this loop again; the lock must not be held here.
        drop(abandoned);
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}
