//! # Actor Mailbox Demo
//!
//! Hosts a counter on its own thread and drives it from several producers.
//!
//! 1.  Starts a [`Thread`] wrapping a `Counter`.
//! 2.  Three producer threads each send 100 `add(1)` messages.
//! 3.  Pauses the worker, queues more work, and resumes it.
//! 4.  Starts a second counter in two phases, sending messages before its thread exists.
//!
//! ```bash
//! RUST_LOG=debug cargo run
//! ```

use actor_mailbox::runtime::setup_tracing;
use actor_mailbox::{ActorError, ActorRef, Thread, ThreadBuilder, ThreadOptions, ThreadPriority};
use std::thread;
use tracing::info;

const PRODUCERS: usize = 3;
const ADDS_PER_PRODUCER: i64 = 100;

#[derive(Debug, Default)]
struct Counter {
    value: i64,
    updates: usize,
}

impl Counter {
    fn add(&mut self, n: i64) {
        self.value += n;
        self.updates += 1;
    }
}

// Plain blocking main: `Thread` creation, `pause` and teardown all block the calling thread.
fn main() -> Result<(), ActorError> {
    setup_tracing();
    info!("Starting actor mailbox demo");

    let counter_thread = Thread::new("counter", |_| Counter::default())?;
    let counter = counter_thread.actor();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let counter: ActorRef<Counter> = counter.clone();
            thread::Builder::new()
                .name(format!("producer-{producer}"))
                .spawn(move || {
                    for _ in 0..ADDS_PER_PRODUCER {
                        counter.invoke(|c| c.add(1));
                    }
                })
        })
        .collect::<Result<_, _>>()?;
    for producer in producers {
        if producer.join().is_err() {
            tracing::error!("Producer thread panicked");
        }
    }

    let value = {
        let _span = tracing::info_span!("concurrent_adds").entered();
        counter.ask(|c| c.value).wait()?
    };
    info!(value, "Producers finished");

    counter_thread.pause();
    for n in 1..=5 {
        counter.invoke(move |c| c.add(n));
    }
    info!("Queued 5 updates while paused");
    counter_thread.resume();

    let (value, updates) = counter.ask(|c| (c.value, c.updates)).wait()?;
    info!(value, updates, "Resumed and drained");

    let builder = ThreadBuilder::new(
        ThreadOptions::named("deferred-counter").with_priority(ThreadPriority::Normal),
    );
    let deferred = builder.actor();
    for _ in 0..5 {
        deferred.invoke(|c: &mut Counter| c.add(10));
    }
    let deferred_thread = builder.spawn(|_| Counter::default())?;
    let deferred_value = deferred_thread.actor().ask(|c| c.value).wait()?;
    info!(value = deferred_value, "Two-phase counter drained early messages");

    drop(deferred_thread);
    drop(counter_thread);

    // References outlive their actors; sends are now no-ops.
    counter.invoke(|c| c.add(1));
    match counter.ask(|c| c.value).wait() {
        Err(ActorError::ActorDropped) => info!("Counter is gone, ask resolved to ActorDropped"),
        other => info!(?other, "Unexpected reply from dropped counter"),
    }

    info!("Demo completed successfully");
    Ok(())
}
