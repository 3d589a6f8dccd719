//! # Mailbox
//!
//! The per-actor FIFO queue and the synchronization boundary around the actor's object.
//!
//! ## Locking discipline
//!
//! Three locks cooperate so that producers never wait on a running message:
//!
//! - `receiving` (reentrant) guards draining and also owns the object [`Slot`]. Only one drain runs
//!   at a time. It is reentrant so that an actor can close its own mailbox (by dropping its own
//!   [`Actor`](crate::framework::Actor)) from inside one of its messages.
//! - `pushing` serialises `push` against `open`/`close`. It is *not* held while a message runs, so
//!   a message can send to its own actor without deadlocking.
//! - `queue` is held only for enqueue/dequeue bookkeeping.
//!
//! `open` and `close` acquire `receiving` before `pushing`, the same order a self-sending actor
//! acquires them.
//!
//! The queue is unbounded. Callers that need backpressure must build it on top, e.g. by
//! awaiting `ask` replies.

use crate::framework::message::Message;
use crate::framework::scheduler::{Drain, Scheduler};
use crate::framework::short_type_name;
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Storage for the actor's object.
///
/// A drain only ever runs against `Established`; `Aspiring` lets a mailbox accept messages before
/// the object exists.
pub(crate) enum Slot<O> {
    Aspiring,
    Established(O),
    Retired,
}

/// FIFO queue of pending messages for one actor, plus the actor's object.
///
/// Owned strongly by the [`Actor`](crate::framework::Actor); every
/// [`ActorRef`](crate::framework::ActorRef) and every scheduler only holds a [`Weak`] handle.
pub struct Mailbox<O> {
    this: Weak<Mailbox<O>>,
    scheduler: Mutex<Option<Arc<dyn Scheduler>>>,
    receiving: ReentrantMutex<RefCell<Slot<O>>>,
    pushing: Mutex<()>,
    closed: AtomicBool,
    queue: Mutex<VecDeque<Message<O>>>,
}

impl<O: Send + 'static> Mailbox<O> {
    /// Creates an aspiring mailbox: no scheduler, no object. Pushed messages are held.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            scheduler: Mutex::new(None),
            receiving: ReentrantMutex::new(RefCell::new(Slot::Aspiring)),
            pushing: Mutex::new(()),
            closed: AtomicBool::new(false),
            queue: Mutex::new(VecDeque::new()),
        })
    }

    /// Enqueues `message`, notifying the scheduler if the queue was empty.
    ///
    /// Silently drops the message when the mailbox is closed.
    pub fn push(&self, message: Message<O>) {
        let pushing = self.pushing.lock();
        if self.closed.load(Ordering::Acquire) {
            drop(pushing);
            trace!(actor = short_type_name::<O>(), "Push to closed mailbox dropped");
            return;
        }

        let was_empty = {
            let mut queue = self.queue.lock();
            let was_empty = queue.is_empty();
            queue.push_back(message);
            was_empty
        };
        let scheduler = if was_empty {
            self.scheduler.lock().clone()
        } else {
            None
        };
        drop(pushing);

        if let Some(scheduler) = scheduler {
            scheduler.schedule(self.handle());
        }
    }

    /// Binds the mailbox to `scheduler`, or moves it to a new one.
    ///
    /// Messages already queued are scheduled on `scheduler` immediately. A drain that is running
    /// finishes first; a drain request still queued on the previous scheduler may run there once.
    pub fn open(&self, scheduler: Arc<dyn Scheduler>) {
        let receiving = self.receiving.lock();
        let pushing = self.pushing.lock();
        *self.scheduler.lock() = Some(scheduler.clone());
        let queued = self.queue.lock().len();
        let pending = queued > 0 && !self.closed.load(Ordering::Acquire);
        drop(pushing);
        drop(receiving);

        debug!(actor = short_type_name::<O>(), queued, "Mailbox opened");
        if pending {
            scheduler.schedule(self.handle());
        }
    }

    /// Stops accepting messages and discards the ones still queued.
    ///
    /// Blocks until a drain running on another thread has finished its current message. A drain
    /// that started before the close is never interrupted.
    pub fn close(&self) {
        let receiving = self.receiving.lock();
        let pushing = self.pushing.lock();
        let was_closed = self.closed.swap(true, Ordering::AcqRel);
        let discarded = mem::take(&mut *self.queue.lock());
        drop(pushing);
        drop(receiving);

        if !was_closed {
            debug!(
                actor = short_type_name::<O>(),
                discarded = discarded.len(),
                "Mailbox closed"
            );
        }
        // Message destructors may talk to other actors; run them without our locks.
        drop(discarded);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of messages waiting to be drained.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Places the constructed object. Hands it back if the slot is not aspiring.
    pub(crate) fn establish(&self, object: O) -> Result<(), O> {
        let receiving = self.receiving.lock();
        let Ok(mut slot) = receiving.try_borrow_mut() else {
            return Err(object);
        };
        if matches!(*slot, Slot::Aspiring) && !self.is_closed() {
            *slot = Slot::Established(object);
            Ok(())
        } else {
            Err(object)
        }
    }

    pub(crate) fn is_established(&self) -> bool {
        let receiving = self.receiving.lock();
        let established = match receiving.try_borrow() {
            Ok(slot) => matches!(*slot, Slot::Established(_)),
            // Borrowed by a drain on this thread, which only happens once established.
            Err(_) => true,
        };
        established
    }

    /// Takes the object out of a closed mailbox.
    ///
    /// Returns `None` when a drain on the current thread is still using the object; that drain
    /// retires it as soon as the running message returns.
    pub(crate) fn retire(&self) -> Option<O> {
        let receiving = self.receiving.lock();
        let retired = match receiving.try_borrow_mut() {
            Ok(mut slot) => match mem::replace(&mut *slot, Slot::Retired) {
                Slot::Established(object) => Some(object),
                _ => None,
            },
            Err(_) => None,
        };
        retired
    }

    fn handle(&self) -> Weak<dyn Drain> {
        self.this.clone()
    }
}

impl<O: Send + 'static> Drain for Mailbox<O> {
    fn receive(&self) {
        let receiving = self.receiving.lock();
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let Ok(mut slot) = receiving.try_borrow_mut() else {
            // Re-entered from inside a running message; the outer drain reschedules.
            trace!(actor = short_type_name::<O>(), "Re-entrant receive skipped");
            return;
        };
        let Slot::Established(object) = &mut *slot else {
            return;
        };
        let Some(message) = self.queue.lock().pop_front() else {
            return;
        };

        let unwinding = RescheduleOnUnwind(self);
        message.execute(object);
        mem::forget(unwinding);

        if self.closed.load(Ordering::Acquire) {
            // The message closed its own mailbox.
            let retired = mem::replace(&mut *slot, Slot::Retired);
            drop(slot);
            drop(receiving);
            drop(retired);
            return;
        }

        let scheduler = if self.queue.lock().is_empty() {
            None
        } else {
            self.scheduler.lock().clone()
        };
        drop(slot);
        drop(receiving);

        if let Some(scheduler) = scheduler {
            scheduler.schedule(self.handle());
        }
    }

    fn abandon(&self) {
        if !self.is_closed() {
            debug!(
                actor = short_type_name::<O>(),
                "Scheduler stopped, closing mailbox"
            );
        }
        self.close();
    }
}

/// Reschedules the mailbox when a message unwinds out of `receive` with more messages queued.
struct RescheduleOnUnwind<'a, O: Send + 'static>(&'a Mailbox<O>);

impl<O: Send + 'static> Drop for RescheduleOnUnwind<'_, O> {
    fn drop(&mut self) {
        let mailbox = self.0;
        if mailbox.is_closed() || mailbox.is_empty() {
            return;
        }
        let scheduler = mailbox.scheduler.lock().clone();
        if let Some(scheduler) = scheduler {
            scheduler.schedule(mailbox.handle());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::ManualScheduler;
    use std::sync::atomic::AtomicUsize;

    fn established(log: Vec<u32>) -> Arc<Mailbox<Vec<u32>>> {
        let mailbox = Mailbox::new();
        assert!(mailbox.establish(log).is_ok());
        mailbox
    }

    fn record(value: u32) -> Message<Vec<u32>> {
        Message::new(move |log: &mut Vec<u32>| log.push(value))
    }

    fn snapshot(mailbox: &Mailbox<Vec<u32>>, scheduler: &ManualScheduler) -> Vec<u32> {
        let (message, reply) = Message::ask(|log: &mut Vec<u32>| log.clone());
        mailbox.push(message);
        scheduler.run_until_idle();
        reply.wait().unwrap()
    }

    #[test]
    fn test_drains_in_push_order_with_coalesced_notification() {
        let scheduler = ManualScheduler::new();
        let mailbox = established(Vec::new());
        mailbox.open(scheduler.clone());

        for value in 1..=5 {
            mailbox.push(record(value));
        }
        assert_eq!(scheduler.notifications(), 1);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(mailbox.len(), 5);

        assert_eq!(scheduler.run_until_idle(), 5);
        assert!(mailbox.is_empty());
        assert_eq!(snapshot(&mailbox, &scheduler), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_aspiring_mailbox_holds_messages_until_opened() {
        let scheduler = ManualScheduler::new();
        let mailbox = Mailbox::<Vec<u32>>::new();
        mailbox.push(record(1));
        mailbox.push(record(2));
        assert_eq!(scheduler.notifications(), 0);

        assert!(mailbox.establish(Vec::new()).is_ok());
        mailbox.open(scheduler.clone());
        assert_eq!(scheduler.pending(), 1);
        scheduler.run_until_idle();
        assert_eq!(snapshot(&mailbox, &scheduler), vec![1, 2]);
    }

    #[test]
    fn test_receive_ignores_aspiring_slot() {
        let scheduler = ManualScheduler::new();
        let mailbox = Mailbox::<Vec<u32>>::new();
        mailbox.open(scheduler.clone());
        mailbox.push(record(1));
        scheduler.run_until_idle();
        assert_eq!(mailbox.len(), 1);
    }

    #[test]
    fn test_push_after_close_is_dropped() {
        let scheduler = ManualScheduler::new();
        let mailbox = established(Vec::new());
        mailbox.open(scheduler.clone());
        mailbox.push(record(1));
        mailbox.close();

        assert!(mailbox.is_closed());
        assert!(mailbox.is_empty());
        mailbox.push(record(2));
        assert!(mailbox.is_empty());
        // The drain scheduled before the close finds a closed mailbox.
        scheduler.run_until_idle();
        assert_eq!(mailbox.retire(), Some(Vec::new()));
    }

    #[test]
    fn test_self_send_from_running_message() {
        let scheduler = ManualScheduler::new();
        let mailbox = established(Vec::new());
        mailbox.open(scheduler.clone());

        let weak = Arc::downgrade(&mailbox);
        mailbox.push(Message::new(move |log: &mut Vec<u32>| {
            log.push(1);
            if let Some(mailbox) = weak.upgrade() {
                mailbox.push(record(2));
            }
        }));
        scheduler.run_until_idle();
        assert_eq!(snapshot(&mailbox, &scheduler), vec![1, 2]);
    }

    #[test]
    fn test_reentrant_receive_is_skipped() {
        let scheduler = ManualScheduler::new();
        let mailbox = established(Vec::new());
        mailbox.open(scheduler.clone());

        let weak = Arc::downgrade(&mailbox);
        mailbox.push(Message::new(move |log: &mut Vec<u32>| {
            log.push(1);
            if let Some(mailbox) = weak.upgrade() {
                mailbox.receive();
            }
            log.push(2);
        }));
        mailbox.push(record(3));
        scheduler.run_until_idle();
        assert_eq!(snapshot(&mailbox, &scheduler), vec![1, 2, 3]);
    }

    struct Tracked {
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_close_from_inside_message_retires_after_it_returns() {
        let scheduler = ManualScheduler::new();
        let drops = Arc::new(AtomicUsize::new(0));
        let mailbox = Mailbox::new();
        assert!(mailbox
            .establish(Tracked {
                drops: drops.clone()
            })
            .is_ok());
        mailbox.open(scheduler.clone());

        let weak = Arc::downgrade(&mailbox);
        let observed = drops.clone();
        mailbox.push(Message::new(move |_: &mut Tracked| {
            if let Some(mailbox) = weak.upgrade() {
                mailbox.close();
                assert!(mailbox.retire().is_none());
            }
            assert_eq!(observed.load(Ordering::SeqCst), 0);
        }));
        mailbox.push(Message::new(|_: &mut Tracked| panic!("must not run after close")));

        scheduler.run_until_idle();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(mailbox.retire().is_none());
    }

    struct RejectingScheduler;

    impl Scheduler for RejectingScheduler {
        fn schedule(&self, mailbox: Weak<dyn Drain>) {
            drop(crate::framework::scheduler::DrainRequest::new(mailbox));
        }
    }

    #[test]
    fn test_rejected_drain_closes_mailbox_and_resolves_replies() {
        let mailbox = established(Vec::new());
        mailbox.open(Arc::new(RejectingScheduler));

        let (message, mut reply) = Message::ask(|log: &mut Vec<u32>| log.len());
        mailbox.push(message);
        assert!(mailbox.is_closed());
        assert!(mailbox.is_empty());
        assert!(matches!(
            reply.try_wait(),
            Some(Err(crate::framework::error::ActorError::ActorDropped))
        ));
        assert_eq!(mailbox.retire(), Some(Vec::new()));
    }

    #[test]
    fn test_panicking_message_keeps_queue_draining() {
        let scheduler = ManualScheduler::new();
        let mailbox = established(Vec::new());
        mailbox.open(scheduler.clone());
        mailbox.push(Message::new(|_: &mut Vec<u32>| panic!("bad update")));
        mailbox.push(record(2));
        assert_eq!(scheduler.notifications(), 1);

        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| scheduler.run_once()));
        assert!(outcome.is_err());
        assert_eq!(scheduler.pending(), 1);

        scheduler.run_until_idle();
        assert_eq!(snapshot(&mailbox, &scheduler), vec![2]);
    }
}
