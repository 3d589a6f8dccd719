//! One-shot blocking rendezvous between two threads.
//!
//! Used for every synchronous handshake in the runtime: "object constructed", "loop paused",
//! "loop may resume" and "object destroyed". Unlike an async channel, waiting is legal on any
//! thread, including run-loop threads.
//!
//! Dropping a [`Notifier`] without calling [`Notifier::notify`] abandons the rendezvous and
//! wakes the waiter with `None`, so a waiter can never hang on a task that was discarded.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

enum State<T> {
    Pending,
    Ready(T),
    Abandoned,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    signal: Condvar,
}

/// Sending half. Fires at most once.
pub struct Notifier<T> {
    shared: Option<Arc<Shared<T>>>,
}

/// Receiving half.
pub struct Waiter<T> {
    shared: Arc<Shared<T>>,
}

/// Creates a connected notifier/waiter pair.
pub fn rendezvous<T>() -> (Notifier<T>, Waiter<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::Pending),
        signal: Condvar::new(),
    });
    (
        Notifier {
            shared: Some(shared.clone()),
        },
        Waiter { shared },
    )
}

impl<T> Notifier<T> {
    pub fn notify(mut self, value: T) {
        if let Some(shared) = self.shared.take() {
            *shared.state.lock() = State::Ready(value);
            shared.signal.notify_all();
        }
    }
}

impl<T> Drop for Notifier<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            *shared.state.lock() = State::Abandoned;
            shared.signal.notify_all();
        }
    }
}

impl<T> Waiter<T> {
    /// Blocks until the notifier fires or is dropped.
    ///
    /// Returns `None` if the rendezvous was abandoned.
    pub fn wait(self) -> Option<T> {
        let mut state = self.shared.state.lock();
        loop {
            match std::mem::replace(&mut *state, State::Abandoned) {
                State::Pending => {
                    *state = State::Pending;
                    self.shared.signal.wait(&mut state);
                }
                State::Ready(value) => return Some(value),
                State::Abandoned => return None,
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        !matches!(*self.shared.state.lock(), State::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_receives_value_from_other_thread() {
        let (notifier, waiter) = rendezvous();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            notifier.notify(42);
        });
        assert_eq!(waiter.wait(), Some(42));
        handle.join().unwrap();
    }

    #[test]
    fn test_dropped_notifier_abandons() {
        let (notifier, waiter) = rendezvous::<()>();
        assert!(!waiter.is_ready());
        drop(notifier);
        assert!(waiter.is_ready());
        assert_eq!(waiter.wait(), None);
    }

    #[test]
    fn test_notify_before_wait() {
        let (notifier, waiter) = rendezvous();
        notifier.notify("ready");
        assert_eq!(waiter.wait(), Some("ready"));
    }
}
