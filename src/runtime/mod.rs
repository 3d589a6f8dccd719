//! Execution contexts for actors.
//!
//! This module contains the infrastructure that actually runs mailboxes:
//!
//! - **Run loops**: single-threaded task queues with priorities and timers
//! - **Dedicated threads**: one object per OS thread, with blocking construction and destruction
//! - **Observability setup**: Initializing tracing and logging
//!
//! # Main Components
//!
//! - [`RunLoop`] - Cooperative task loop; a [`Scheduler`](crate::framework::Scheduler)
//! - [`Thread`] - Owns a worker thread and the object living on it
//! - [`ThreadBuilder`] - Two-phase start of a [`Thread`]
//! - [`ThreadOptions`] - Name, priority and stack size of the worker
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod options;
mod platform;
pub mod run_loop;
pub mod thread;
pub mod tracing;

pub use self::tracing::setup_tracing;
pub use options::{ThreadOptions, ThreadPriority};
pub use run_loop::{Priority, RunLoop};
pub use thread::{Thread, ThreadBuilder};
