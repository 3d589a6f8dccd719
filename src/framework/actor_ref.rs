//! # ActorRef
//!
//! The weak, cloneable handle used to talk to an actor without owning it.

use crate::framework::mailbox::Mailbox;
use crate::framework::message::{Message, Reply};
use crate::framework::short_type_name;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;

/// A non-owning reference to an actor wrapping an object of type `O`.
///
/// Cheap to clone, and safe to hold, clone, and send from any thread. It can be embedded in
/// messages to other actors, which is how actors collaborate.
///
/// A reference may outlive its [`Actor`](crate::framework::Actor). Once the actor is gone,
/// [`invoke`](Self::invoke) does nothing and [`ask`](Self::ask) returns a reply that resolves to
/// [`ActorError::ActorDropped`](crate::framework::ActorError::ActorDropped).
pub struct ActorRef<O> {
    mailbox: Weak<Mailbox<O>>,
}

impl<O: Send + 'static> ActorRef<O> {
    pub(crate) fn new(mailbox: &Arc<Mailbox<O>>) -> Self {
        Self {
            mailbox: Arc::downgrade(mailbox),
        }
    }

    /// Sends a fire-and-forget operation.
    ///
    /// ```rust
    /// use actor_mailbox::framework::mock::ManualScheduler;
    /// use actor_mailbox::Actor;
    ///
    /// let scheduler = ManualScheduler::new();
    /// let actor = Actor::new(scheduler.clone(), |_| Vec::<String>::new());
    /// let lines = actor.self_ref();
    ///
    /// let line = String::from("hello");
    /// lines.invoke(move |v| v.push(line));
    /// scheduler.run_until_idle();
    /// ```
    pub fn invoke<F>(&self, operation: F)
    where
        F: FnOnce(&mut O) + Send + 'static,
    {
        self.send(Message::new(operation));
    }

    /// Sends an operation and returns a handle to its result.
    ///
    /// Never blocks. The reply can be awaited, waited on, or polled with
    /// [`Reply::try_wait`].
    pub fn ask<R, F>(&self, operation: F) -> Reply<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut O) -> R + Send + 'static,
    {
        let (message, reply) = Message::ask(operation);
        self.send(message);
        reply
    }

    /// Whether the owning actor still exists and accepts messages.
    pub fn is_alive(&self) -> bool {
        self.mailbox
            .upgrade()
            .is_some_and(|mailbox| !mailbox.is_closed())
    }

    fn send(&self, message: Message<O>) {
        match self.mailbox.upgrade() {
            Some(mailbox) => mailbox.push(message),
            None => trace!(actor = short_type_name::<O>(), "Send to dead actor dropped"),
        }
    }
}

impl<O> Clone for ActorRef<O> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<O> fmt::Debug for ActorRef<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("target", &std::any::type_name::<O>())
            .field("strong", &self.mailbox.strong_count())
            .finish()
    }
}
