//! # Dedicated-Thread Scheduler
//!
//! [`Thread<O>`] launches one OS thread, runs a [`RunLoop`] on it and constructs an object of type
//! `O` there as an actor. The object lives on that thread for its whole life, so it can use
//! thread-local state and set timers through [`RunLoop::current`].
//!
//! - Only one worker thread is created per `Thread`.
//! - Creation blocks until the object is constructed and the loop is running, so the returned
//!   [`ActorRef`] can be used right away.
//! - Dropping the `Thread` destroys the object *on the worker thread*, after any message in flight
//!   has finished, then stops the loop and joins the thread.
//!
//! [`ThreadBuilder`] is the two-phase form: references can be handed out and messages queued
//! before the worker thread exists.
//!
//! ```rust
//! use actor_mailbox::runtime::Thread;
//!
//! #[derive(Default)]
//! struct Counter { total: u64 }
//!
//! let thread = Thread::new("counter", |_| Counter::default()).unwrap();
//! let counter = thread.actor();
//! counter.invoke(|c| c.total += 2);
//! assert_eq!(counter.ask(|c| c.total).wait().unwrap(), 2);
//! ```

use crate::framework::actor::{activate_mailbox, Actor};
use crate::framework::actor_ref::ActorRef;
use crate::framework::error::{panic_message, ActorError};
use crate::framework::rendezvous::{rendezvous, Notifier};
use crate::framework::scheduler::{Drain, Scheduler};
use crate::runtime::options::{ThreadOptions, ThreadPriority};
use crate::runtime::platform;
use crate::runtime::run_loop::{Priority, RunLoop};
use parking_lot::Mutex;
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error, info, warn};

/// Two-phase construction of a [`Thread`].
///
/// Holds an aspiring actor: [`actor`](Self::actor) references work immediately, and messages sent
/// through them queue until [`spawn`](Self::spawn) has constructed the object on the new thread.
/// They then drain in the order they were sent.
pub struct ThreadBuilder<O: Send + 'static> {
    options: ThreadOptions,
    actor: Actor<O>,
}

impl<O: Send + 'static> ThreadBuilder<O> {
    pub fn new(options: ThreadOptions) -> Self {
        Self {
            options,
            actor: Actor::aspiring(),
        }
    }

    /// A reference to the actor-to-be.
    pub fn actor(&self) -> ActorRef<O> {
        self.actor.self_ref()
    }

    /// Starts the worker thread and constructs the object on it with `init`.
    ///
    /// Blocks until construction has finished. If `init` panics, messages queued so far are
    /// discarded, the worker is joined and [`ActorError::ConstructionFailed`] is returned. A thread
    /// name containing a NUL byte is rejected with [`ActorError::Spawn`].
    pub fn spawn<F>(self, init: F) -> Result<Thread<O>, ActorError>
    where
        F: FnOnce(ActorRef<O>) -> O + Send + 'static,
    {
        let Self { options, actor } = self;
        if options.name.contains('\0') {
            return Err(ActorError::Spawn(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("thread name {:?} contains a NUL byte", options.name),
            )));
        }
        let run_loop = RunLoop::new();
        let (ready_tx, ready_rx) = rendezvous::<Result<(), String>>();

        // Construction is the first task on the loop, so the object is built on the worker
        // thread with `RunLoop::current` available, before any drain of its mailbox.
        let mailbox = actor.mailbox().clone();
        let scheduler: Arc<dyn Scheduler> = Arc::new(run_loop.clone());
        let construct_loop = run_loop.clone();
        run_loop.invoke(move || {
            let constructed = panic::catch_unwind(AssertUnwindSafe(|| {
                activate_mailbox(&mailbox, scheduler, |self_ref| {
                    Ok::<_, Infallible>(init(self_ref))
                })
            }));
            drop(mailbox);
            match constructed {
                Ok(_) => ready_tx.notify(Ok(())),
                Err(payload) => {
                    ready_tx.notify(Err(panic_message(payload.as_ref())));
                    construct_loop.stop();
                }
            }
        })?;

        let mut builder = thread::Builder::new().name(options.name.clone());
        if let Some(stack_size) = options.stack_size {
            builder = builder.stack_size(stack_size);
        }
        let worker_loop = run_loop.clone();
        let priority = options.priority;
        let worker = builder.spawn(move || {
            if priority == ThreadPriority::Low {
                platform::make_current_thread_low_priority();
            }
            worker_loop.run();
        })?;

        let name = options.name;
        match ready_rx.wait() {
            Some(Ok(())) => {
                info!(thread = %name, "Thread started");
                let self_ref = actor.self_ref();
                Ok(Thread {
                    name,
                    self_ref,
                    actor: Some(actor),
                    run_loop,
                    worker: Some(worker),
                    owner: thread::current().id(),
                    resume: Mutex::new(None),
                })
            }
            outcome => {
                let reason = match outcome {
                    Some(Err(reason)) => reason,
                    _ => "worker thread exited before the object was constructed".to_string(),
                };
                error!(thread = %name, %reason, "Actor construction failed");
                run_loop.stop();
                if worker.join().is_err() {
                    error!(thread = %name, "Worker thread panicked");
                }
                drop(actor);
                Err(ActorError::ConstructionFailed(reason))
            }
        }
    }
}

impl<O: Send + 'static> fmt::Debug for ThreadBuilder<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadBuilder")
            .field("options", &self.options)
            .field("actor", &self.actor)
            .finish()
    }
}

/// An object of type `O` living on its own thread, reachable through [`ActorRef`]s.
///
/// `Thread` is itself a [`Scheduler`]: other actors can be hosted on the same loop via
/// [`scheduler`](Self::scheduler).
pub struct Thread<O: Send + 'static> {
    name: String,
    self_ref: ActorRef<O>,
    actor: Option<Actor<O>>,
    run_loop: RunLoop,
    worker: Option<JoinHandle<()>>,
    owner: ThreadId,
    resume: Mutex<Option<Notifier<()>>>,
}

impl<O: Send + 'static> Thread<O> {
    /// Starts a low-priority thread named `name` and constructs the object on it.
    pub fn new<F>(name: impl Into<String>, init: F) -> Result<Self, ActorError>
    where
        F: FnOnce(ActorRef<O>) -> O + Send + 'static,
    {
        ThreadBuilder::new(ThreadOptions::named(name)).spawn(init)
    }

    /// A non-owning reference to the object.
    ///
    /// It may outlive this `Thread`; sends made after the `Thread` is dropped are no-ops.
    pub fn actor(&self) -> ActorRef<O> {
        self.self_ref.clone()
    }

    /// The worker's run loop as a scheduler, for hosting further actors on this thread.
    ///
    /// Once this `Thread` is dropped, hosted actors' mailboxes are closed: their queued and later
    /// messages are discarded and pending replies resolve to [`ActorError::ActorDropped`].
    pub fn scheduler(&self) -> Arc<dyn Scheduler> {
        Arc::new(self.run_loop.clone())
    }

    pub fn run_loop(&self) -> &RunLoop {
        &self.run_loop
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Suspends the worker thread.
    ///
    /// Blocks until the loop has stopped processing. While paused, no message is drained and no
    /// timer fires; messages sent meanwhile are queued and processed after [`resume`](Self::resume).
    ///
    /// # Panics
    /// Panics if called from a thread other than the one that created this `Thread`, or if the
    /// thread is already paused.
    pub fn pause(&self) {
        self.verify_owner("pause");
        let mut resume = self.resume.lock();
        if resume.is_some() {
            error!(thread = %self.name, "Thread paused twice");
            panic!("Thread {} is already paused", self.name);
        }

        let (paused_tx, paused_rx) = rendezvous::<()>();
        let (resume_tx, resume_rx) = rendezvous::<()>();
        let queued = self.run_loop.invoke_with_priority(Priority::High, move || {
            paused_tx.notify(());
            resume_rx.wait();
        });
        if let Err(e) = queued {
            warn!(thread = %self.name, error = %e, "Cannot pause");
            return;
        }

        paused_rx.wait();
        *resume = Some(resume_tx);
        debug!(thread = %self.name, "Paused");
    }

    /// Resumes a thread suspended by [`pause`](Self::pause).
    ///
    /// # Panics
    /// Panics if called from a thread other than the one that created this `Thread`, or if the
    /// thread is not paused.
    pub fn resume(&self) {
        self.verify_owner("resume");
        let Some(resume) = self.resume.lock().take() else {
            error!(thread = %self.name, "Thread resumed without being paused");
            panic!("Thread {} is not paused", self.name);
        };
        resume.notify(());
        debug!(thread = %self.name, "Resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.resume.lock().is_some()
    }

    fn verify_owner(&self, operation: &str) {
        if thread::current().id() != self.owner {
            error!(thread = %self.name, operation, "Called from a thread that does not own it");
            panic!(
                "Thread::{operation} on {} must be called from the thread that created it",
                self.name
            );
        }
    }
}

impl<O: Send + 'static> Scheduler for Thread<O> {
    fn schedule(&self, mailbox: Weak<dyn Drain>) {
        self.run_loop.schedule(mailbox);
    }
}

impl<O: Send + 'static> Drop for Thread<O> {
    fn drop(&mut self) {
        if let Some(resume) = self.resume.get_mut().take() {
            resume.notify(());
        }

        if let Some(actor) = self.actor.take() {
            let (destroyed_tx, destroyed_rx) = rendezvous::<()>();
            let destroy = self.run_loop.invoke(move || {
                drop(actor);
                destroyed_tx.notify(());
            });
            if destroy.is_err() {
                // The task, and with it the actor, was dropped on this thread.
                warn!(thread = %self.name, "Run loop already stopped, actor destroyed on caller thread");
            }
            destroyed_rx.wait();
        }

        self.run_loop.stop();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!(thread = %self.name, "Worker thread panicked");
            }
        }
        info!(thread = %self.name, "Thread stopped");
    }
}

impl<O: Send + 'static> fmt::Debug for Thread<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.name)
            .field("paused", &self.is_paused())
            .field("run_loop", &self.run_loop)
            .finish()
    }
}
