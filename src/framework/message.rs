//! # Messages
//!
//! A [`Message`] is a deferred, single-shot invocation of one operation against the object owned
//! by an actor. Arguments are captured by move into the closure at send time.
//!
//! `ask` messages carry a one-shot reply channel. The caller holds the receiving half as a
//! [`Reply`], which can be awaited, blocked on, or polled.

use crate::framework::error::{panic_message, ActorError};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::trace;

type Handler<O> = Box<dyn FnOnce(&mut O) + Send + 'static>;

/// One unit of work for an actor of type `O`.
///
/// `execute` consumes the message, so a message runs at most once. A message that is dropped
/// without running (closed mailbox, dead actor) drops its captured arguments and, for `ask`,
/// its reply sender.
pub struct Message<O> {
    handler: Handler<O>,
}

impl<O> Message<O> {
    /// Wraps a fire-and-forget operation.
    pub fn new(handler: impl FnOnce(&mut O) + Send + 'static) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Wraps an operation whose result is delivered through the returned [`Reply`].
    ///
    /// A panic inside `handler` is caught and delivered as [`ActorError::Panicked`] instead of
    /// unwinding into the scheduler.
    pub fn ask<R, F>(handler: F) -> (Self, Reply<R>)
    where
        R: Send + 'static,
        F: FnOnce(&mut O) -> R + Send + 'static,
    {
        let (respond_to, receiver) = oneshot::channel();
        let message = Self::new(move |object: &mut O| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(object)))
                .map_err(|payload| ActorError::Panicked(panic_message(payload.as_ref())));
            if respond_to.send(outcome).is_err() {
                trace!("Reply handle dropped before result was delivered");
            }
        });
        (message, Reply { receiver })
    }

    /// Runs the operation against `object`.
    pub fn execute(self, object: &mut O) {
        (self.handler)(object)
    }
}

impl<O> fmt::Debug for Message<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("target", &std::any::type_name::<O>())
            .finish_non_exhaustive()
    }
}

/// Result handle returned by `ask`.
///
/// Resolves exactly once. If the message is discarded before it runs, the reply resolves to
/// [`ActorError::ActorDropped`].
#[derive(Debug)]
pub struct Reply<R> {
    receiver: oneshot::Receiver<Result<R, ActorError>>,
}

impl<R> Reply<R> {
    /// Blocks the current thread until the result arrives.
    ///
    /// # Panics
    /// Panics when called from inside an asynchronous execution context; `.await` the reply
    /// there instead.
    pub fn wait(self) -> Result<R, ActorError> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(ActorError::ActorDropped))
    }

    /// Returns the result if it is already available, without blocking.
    ///
    /// `None` means the message has not run yet. Once a result has been returned, further calls
    /// report [`ActorError::ActorDropped`].
    pub fn try_wait(&mut self) -> Option<Result<R, ActorError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ActorError::ActorDropped)),
        }
    }
}

impl<R> Future for Reply<R> {
    type Output = Result<R, ActorError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ActorError::ActorDropped)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_runs_captured_arguments() {
        let mut total = 0u32;
        let amount = 7;
        Message::new(move |t: &mut u32| *t += amount).execute(&mut total);
        assert_eq!(total, 7);
    }

    #[test]
    fn test_ask_delivers_result() {
        let mut value = String::from("actor");
        let (message, reply) = Message::ask(|s: &mut String| s.len());
        message.execute(&mut value);
        assert_eq!(reply.wait().unwrap(), 5);
    }

    #[test]
    fn test_ask_captures_panic() {
        let mut value = 0u8;
        let (message, reply) = Message::ask(|_: &mut u8| -> u8 { panic!("boom") });
        message.execute(&mut value);
        match reply.wait() {
            Err(ActorError::Panicked(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_dropped_message_breaks_reply() {
        let (message, mut reply) = Message::<u8>::ask(|v| *v);
        assert!(reply.try_wait().is_none());
        drop(message);
        assert!(matches!(reply.try_wait(), Some(Err(ActorError::ActorDropped))));
    }

    #[tokio::test]
    async fn test_reply_is_awaitable() {
        let mut value = vec![1, 2, 3];
        let (message, reply) = Message::ask(|v: &mut Vec<i32>| v.iter().sum::<i32>());
        message.execute(&mut value);
        assert_eq!(reply.await.unwrap(), 6);
    }
}
