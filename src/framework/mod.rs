//! Actor, mailbox and message primitives.
//!
//! # Main Components
//!
//! - [`Actor`] - Owning handle: object lifetime, two-phase construction, synchronous destruction
//! - [`ActorRef`] - Weak handle used to `invoke` and `ask`
//! - [`Mailbox`] - FIFO queue and drain guard for one actor
//! - [`Message`] / [`Reply`] - Deferred operations and their results
//! - [`Scheduler`] - Where and when mailboxes are drained
//! - [`ActorError`] - Common error types
//!
//! # Testing
//!
//! See [`mock`] for a scheduler that is drained explicitly by the caller.

pub mod actor;
pub mod actor_ref;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod mock;
pub mod rendezvous;
pub mod scheduler;

pub use actor::Actor;
pub use actor_ref::ActorRef;
pub use error::ActorError;
pub use mailbox::Mailbox;
pub use message::{Message, Reply};
pub use scheduler::{maybe_receive, Drain, DrainRequest, Scheduler};

/// Last path segment of `O`'s type name (e.g. "Counter" instead of "my_app::stats::Counter").
pub(crate) fn short_type_name<O>() -> &'static str {
    let name = std::any::type_name::<O>();
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}
