//! # Actor Mailbox
//!
//! > **Message-passing actors with dedicated threads, built on mailboxes and run loops.**
//!
//! An actor wraps one ordinary object and serializes all access to it: callers never touch the
//! object directly, they send it closures through a reference. Each closure runs later, on the
//! actor's scheduler, with exclusive `&mut` access to the object.
//!
//! ## 🚀 Core Concepts
//!
//! ### Owning and non-owning handles
//! - [`Actor<O>`] owns the object. Dropping it destroys the object exactly once, after any message
//!   running on another thread has finished.
//! - [`ActorRef<O>`] is a weak, cloneable handle. It can be sent anywhere, embedded in messages to
//!   other actors, and may outlive the actor: sends to a dead actor are silent no-ops.
//!
//! ### Sending
//! - [`ActorRef::invoke`] is fire-and-forget.
//! - [`ActorRef::ask`] returns a [`Reply<R>`], which can be awaited, waited on from a plain thread,
//!   or polled with [`Reply::try_wait`]. A panic inside the operation is delivered as
//!   [`ActorError::Panicked`] instead of killing the worker.
//!
//! ### Where messages run
//! Every mailbox is bound to a [`Scheduler`]. The usual one is a [`Thread<O>`], which owns a
//! worker OS thread running a [`RunLoop`] and constructs the object *on* that thread. The
//! [`framework::mock::ManualScheduler`] drains on the calling thread, for tests.
//!
//! ### Two-phase construction
//! A mailbox can exist before its object ([`Actor::aspiring`], [`ThreadBuilder`]). References work
//! immediately; messages queue and drain in order once the object is constructed.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! Actors, references, mailboxes, messages and the [`Scheduler`] seam.
//!
//! ### 2. The Runtime ([`runtime`])
//! [`RunLoop`], [`Thread`], [`ThreadOptions`] and [`setup_tracing`](runtime::setup_tracing).
//!
//! ## 🚀 Quick Start
//!
//! ```rust
//! use actor_mailbox::Thread;
//!
//! struct Counter { value: i64 }
//!
//! impl Counter {
//!     fn add(&mut self, n: i64) { self.value += n; }
//! }
//!
//! let thread = Thread::new("counter", |_| Counter { value: 0 }).unwrap();
//! let counter = thread.actor();
//! counter.invoke(|c| c.add(40));
//! counter.invoke(|c| c.add(2));
//! assert_eq!(counter.ask(|c| c.value).wait().unwrap(), 42);
//! ```
//!
//! ### Running the Demo
//!
//! ```bash
//! # Run with debug logs
//! RUST_LOG=debug cargo run
//! ```

pub mod framework;
pub mod runtime;

pub use framework::{Actor, ActorError, ActorRef, Reply, Scheduler};
pub use runtime::{Priority, RunLoop, Thread, ThreadBuilder, ThreadOptions, ThreadPriority};
