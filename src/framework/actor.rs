//! # Actor
//!
//! The owning handle for one actor instance.
//!
//! An [`Actor<O>`] owns an object of type `O` and the [`Mailbox`] that feeds it. All access to the
//! object goes through messages, which the actor's [`Scheduler`] drains one at a time, so `O` is
//! effectively single-threaded even though [`ActorRef`]s to it are used from many threads.
//!
//! ## Construction
//!
//! - **Single phase** ([`Actor::new`]): the object is built synchronously and the mailbox starts
//!   draining immediately.
//! - **Two phase** ([`Actor::aspiring`] then [`Actor::activate`]): the mailbox exists first, so
//!   references can be handed out and messages queued before the object is built. Nothing is
//!   drained until activation places the object and opens the mailbox.
//!
//! The constructor closure receives an [`ActorRef`] to the actor itself, for self-sends.
//!
//! ## Destruction
//!
//! Dropping the `Actor` closes the mailbox, waits for a message running on another thread to
//! finish, discards the rest of the queue and then drops the object exactly once.
//!
//! Avoid sending shared pointers or references in messages: that reintroduces the concurrent
//! access to shared state the actor exists to prevent.

use crate::framework::actor_ref::ActorRef;
use crate::framework::mailbox::Mailbox;
use crate::framework::message::Reply;
use crate::framework::scheduler::Scheduler;
use crate::framework::short_type_name;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Owning reference to an actor. Not `Clone`: exactly one `Actor` owns a given object.
pub struct Actor<O: Send + 'static> {
    mailbox: Arc<Mailbox<O>>,
}

impl<O: Send + 'static> Actor<O> {
    /// Builds the object with `init` and starts draining on `scheduler`.
    pub fn new<F>(scheduler: Arc<dyn Scheduler>, init: F) -> Self
    where
        F: FnOnce(ActorRef<O>) -> O,
    {
        let actor = Self::aspiring();
        actor.activate(scheduler, init);
        actor
    }

    /// Creates an actor whose object does not exist yet.
    ///
    /// Messages sent to it are queued until [`activate`](Self::activate) is called.
    pub fn aspiring() -> Self {
        Self {
            mailbox: Mailbox::new(),
        }
    }

    /// Builds the object and opens the mailbox on `scheduler`.
    ///
    /// # Panics
    /// Panics if the actor was already activated.
    pub fn activate<F>(&self, scheduler: Arc<dyn Scheduler>, init: F)
    where
        F: FnOnce(ActorRef<O>) -> O,
    {
        let activated = self.try_activate(scheduler, |self_ref| Ok::<_, Infallible>(init(self_ref)));
        match activated {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`activate`](Self::activate).
    ///
    /// If `init` fails the mailbox is closed, messages queued so far are discarded, and the error
    /// is returned.
    pub fn try_activate<F, E>(&self, scheduler: Arc<dyn Scheduler>, init: F) -> Result<(), E>
    where
        F: FnOnce(ActorRef<O>) -> Result<O, E>,
    {
        activate_mailbox(&self.mailbox, scheduler, init)
    }

    /// Returns a reference to this actor, e.g. for handing to other actors.
    pub fn self_ref(&self) -> ActorRef<O> {
        ActorRef::new(&self.mailbox)
    }

    /// See [`ActorRef::invoke`].
    pub fn invoke<F>(&self, operation: F)
    where
        F: FnOnce(&mut O) + Send + 'static,
    {
        self.self_ref().invoke(operation)
    }

    /// See [`ActorRef::ask`].
    pub fn ask<R, F>(&self, operation: F) -> Reply<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut O) -> R + Send + 'static,
    {
        self.self_ref().ask(operation)
    }

    /// Moves draining to `scheduler`, e.g. to hand an object built on one thread to another.
    ///
    /// Queued messages drain on the new scheduler in order, and later sends notify only it. A
    /// message already running finishes on the old one first.
    pub fn set_scheduler(&self, scheduler: Arc<dyn Scheduler>) {
        self.mailbox.open(scheduler);
    }

    /// Whether the object has been constructed.
    pub fn is_established(&self) -> bool {
        self.mailbox.is_established()
    }

    pub(crate) fn mailbox(&self) -> &Arc<Mailbox<O>> {
        &self.mailbox
    }
}

/// Places the object built by `init` into an aspiring mailbox and opens it on `scheduler`.
pub(crate) fn activate_mailbox<O, E, F>(
    mailbox: &Arc<Mailbox<O>>,
    scheduler: Arc<dyn Scheduler>,
    init: F,
) -> Result<(), E>
where
    O: Send + 'static,
    F: FnOnce(ActorRef<O>) -> Result<O, E>,
{
    assert!(
        !mailbox.is_established(),
        "actor {} activated twice",
        short_type_name::<O>()
    );

    match init(ActorRef::new(mailbox)) {
        Ok(object) => {
            if mailbox.establish(object).is_err() {
                debug!(
                    actor = short_type_name::<O>(),
                    "Mailbox closed during construction, object dropped"
                );
                return Ok(());
            }
            mailbox.open(scheduler);
            debug!(actor = short_type_name::<O>(), "Actor established");
            Ok(())
        }
        Err(e) => {
            mailbox.close();
            Err(e)
        }
    }
}

impl<O: Send + 'static> Drop for Actor<O> {
    fn drop(&mut self) {
        self.mailbox.close();
        if let Some(object) = self.mailbox.retire() {
            drop(object);
            debug!(actor = short_type_name::<O>(), "Actor destroyed");
        }
    }
}

impl<O: Send + 'static> From<&Actor<O>> for ActorRef<O> {
    fn from(actor: &Actor<O>) -> Self {
        actor.self_ref()
    }
}

impl<O: Send + 'static> fmt::Debug for Actor<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("target", &std::any::type_name::<O>())
            .field("queued", &self.mailbox.len())
            .field("closed", &self.mailbox.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::error::ActorError;
    use crate::framework::mock::ManualScheduler;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tracked {
        drops: Arc<AtomicUsize>,
        seen: Vec<u32>,
    }

    impl Tracked {
        fn new(drops: &Arc<AtomicUsize>) -> Self {
            Self {
                drops: drops.clone(),
                seen: Vec::new(),
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_constructor_receives_self_reference() {
        let scheduler = ManualScheduler::new();
        let actor = Actor::new(scheduler.clone(), |me: ActorRef<Vec<&'static str>>| {
            me.invoke(|log| log.push("self-sent"));
            vec!["constructed"]
        });
        let reply = actor.ask(|log| log.clone());
        scheduler.run_until_idle();
        assert_eq!(reply.wait().unwrap(), vec!["constructed", "self-sent"]);
    }

    #[test]
    fn test_two_phase_queues_until_activated() {
        let scheduler = ManualScheduler::new();
        let actor = Actor::<Vec<u32>>::aspiring();
        let handle = actor.self_ref();
        for value in 1..=5 {
            handle.invoke(move |log| log.push(value));
        }
        assert!(!actor.is_established());
        assert_eq!(scheduler.run_until_idle(), 0);

        actor.activate(scheduler.clone(), |_| Vec::new());
        assert!(actor.is_established());
        let reply = handle.ask(|log| log.clone());
        scheduler.run_until_idle();
        assert_eq!(reply.wait().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_failed_activation_discards_pending_messages() {
        let scheduler = ManualScheduler::new();
        let actor = Actor::<u32>::aspiring();
        let mut early = actor.ask(|n| *n);

        let result = actor.try_activate(scheduler.clone(), |_| Err("no config"));
        assert_eq!(result, Err("no config"));
        assert!(!actor.is_established());
        assert!(!actor.self_ref().is_alive());
        assert!(matches!(early.try_wait(), Some(Err(ActorError::ActorDropped))));
    }

    #[test]
    #[should_panic(expected = "activated twice")]
    fn test_double_activation_panics() {
        let scheduler = ManualScheduler::new();
        let actor = Actor::new(scheduler.clone(), |_| 1u8);
        actor.activate(scheduler, |_| 2u8);
    }

    #[test]
    fn test_drop_destroys_object_once_and_skips_queue() {
        let scheduler = ManualScheduler::new();
        let drops = Arc::new(AtomicUsize::new(0));
        let actor = Actor::new(scheduler.clone(), |_| Tracked::new(&drops));
        let handle = actor.self_ref();
        handle.invoke(|t| t.seen.push(1));
        let mut pending = handle.ask(|t| t.seen.len());

        drop(actor);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(matches!(pending.try_wait(), Some(Err(ActorError::ActorDropped))));

        scheduler.run_until_idle();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_scheduler_moves_draining() {
        let first = ManualScheduler::new();
        let second = ManualScheduler::new();
        let actor = Actor::new(first.clone(), |_| Vec::<u32>::new());
        for value in 1..=3 {
            actor.invoke(move |log| log.push(value));
        }
        assert_eq!(first.notifications(), 1);

        actor.set_scheduler(second.clone());
        assert_eq!(second.notifications(), 1);
        second.run_until_idle();

        let before = second.notifications();
        let reply = actor.ask(|log| log.clone());
        assert_eq!(second.notifications(), before + 1);
        assert_eq!(first.notifications(), 1);
        second.run_until_idle();
        assert_eq!(reply.wait().unwrap(), vec![1, 2, 3]);

        // The request left on the old scheduler finds nothing to do.
        assert_eq!(first.run_until_idle(), 1);
    }

    #[test]
    fn test_sends_to_dead_actor_are_noops() {
        let scheduler = ManualScheduler::new();
        let handle = {
            let actor = Actor::new(scheduler.clone(), |_| 0u32);
            actor.self_ref()
        };
        assert!(!handle.is_alive());

        handle.invoke(|n| *n += 1);
        let mut reply = handle.ask(|n| *n);
        assert!(matches!(reply.try_wait(), Some(Err(ActorError::ActorDropped))));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_actor_dropped_from_its_own_message() {
        let scheduler = ManualScheduler::new();
        let drops = Arc::new(AtomicUsize::new(0));
        let actor = Actor::new(scheduler.clone(), |_| Tracked::new(&drops));
        let handle = ActorRef::from(&actor);

        let owner = Arc::new(Mutex::new(Some(actor)));
        let observed = drops.clone();
        handle.invoke(move |t| {
            t.seen.push(1);
            drop(owner.lock().take());
            // Still usable: destruction waits for this message to return.
            t.seen.push(2);
            assert_eq!(observed.load(Ordering::SeqCst), 0);
        });
        handle.invoke(|_| panic!("must not run after the actor is gone"));

        scheduler.run_until_idle();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(!handle.is_alive());
    }
}
