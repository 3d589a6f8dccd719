//! # Scheduling
//!
//! A [`Scheduler`] decides when and where a mailbox gets drained. Mailboxes hand it a weak,
//! type-erased [`Drain`] handle whenever they go from empty to non-empty; the scheduler later
//! calls [`maybe_receive`] on its own execution context.
//!
//! Implementations in this crate:
//! - [`RunLoop`](crate::runtime::RunLoop): the loop behind a dedicated [`Thread`](crate::runtime::Thread).
//! - [`ManualScheduler`](crate::framework::mock::ManualScheduler): drained explicitly by tests.
//!
//! Thread pools or GUI event loops can be plugged in by implementing the trait.
//!
//! ## Stopped schedulers
//!
//! A scheduler that can stop for good should wrap each request in a [`DrainRequest`]. If the
//! request is dropped without running (rejected, or discarded at shutdown) the mailbox is
//! abandoned: it closes and its queued messages are discarded, so pending `ask` replies resolve
//! instead of waiting on a scheduler that will never run them.

use std::sync::Weak;

/// A mailbox as seen by a scheduler: something that can drain one message.
pub trait Drain: Send + Sync {
    /// Pops and executes at most one queued message, rescheduling itself if more remain.
    fn receive(&self);

    /// Called when the scheduler will never drain this mailbox again.
    fn abandon(&self);
}

/// Execution context capable of draining mailboxes.
pub trait Scheduler: Send + Sync {
    /// Arranges for `mailbox` to be drained, at least once, some time in the future.
    ///
    /// The mailbox may already be gone by the time the drain runs; implementations must resolve
    /// the weak handle with [`maybe_receive`] rather than assume it is alive.
    fn schedule(&self, mailbox: Weak<dyn Drain>);
}

/// Drains `mailbox` if it is still alive; otherwise does nothing.
pub fn maybe_receive(mailbox: &Weak<dyn Drain>) {
    if let Some(mailbox) = mailbox.upgrade() {
        mailbox.receive();
    }
}

/// One scheduled drain of one mailbox.
///
/// [`run`](Self::run) drains once. Dropping the request without running it abandons the mailbox.
pub struct DrainRequest {
    mailbox: Option<Weak<dyn Drain>>,
}

impl DrainRequest {
    pub fn new(mailbox: Weak<dyn Drain>) -> Self {
        Self {
            mailbox: Some(mailbox),
        }
    }

    pub fn run(mut self) {
        if let Some(mailbox) = self.mailbox.take() {
            maybe_receive(&mailbox);
        }
    }
}

impl Drop for DrainRequest {
    fn drop(&mut self) {
        if let Some(mailbox) = self.mailbox.take().and_then(|weak| weak.upgrade()) {
            mailbox.abandon();
        }
    }
}
