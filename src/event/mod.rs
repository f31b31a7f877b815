//! The stream engine: cold, push-based, cancellable event streams.
//!
//! An [`Event`] is a recipe for producing values, not a handle to a running
//! producer. Subscribing spawns a dedicated tokio task which pushes values
//! into an unbuffered channel and closes it when the source is exhausted,
//! the consumer goes away, or the run's cancellation token fires. Re-running
//! the same `Event` replays the production from the source.
//!
//! Every delivery in this crate goes through [`emit`], which adjudicates the
//! race between "value accepted" and "run cancelled" in the consumer's
//! favor: once the token is set, no further value reaches the channel.

mod combinators;

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use combinators::{ap, sample_on, Last, Timed};

/// Channel capacity between stream nodes. A rendezvous-sized buffer keeps
/// producers in lockstep with their consumers.
pub(crate) const HANDOFF: usize = 1;

type Runner<A> = dyn Fn(CancellationToken, mpsc::Sender<A>) -> BoxFuture<'static, ()> + Send + Sync;

/// A cold, cancellable stream of values.
///
/// Cloning an `Event` clones the recipe, not a running producer; every call
/// to [`Event::run`] or [`Event::subscribe`] starts an independent
/// production run.
pub struct Event<A> {
    runner: Arc<Runner<A>>,
}

impl<A> Clone for Event<A> {
    fn clone(&self) -> Self {
        Event {
            runner: Arc::clone(&self.runner),
        }
    }
}

impl<A: Send + 'static> Event<A> {
    /// Creates an event from a production function.
    ///
    /// The function is invoked once per run with the run's cancellation
    /// token and the output sender. It must deliver values only through
    /// [`emit`] (or an equivalent cancellation-guarded send) and must
    /// return on the first failed delivery. The output channel closes when
    /// the returned future completes and drops the sender.
    pub fn new<F, Fut>(produce: F) -> Event<A>
    where
        F: Fn(CancellationToken, mpsc::Sender<A>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        Event {
            runner: Arc::new(move |cancel, out| -> BoxFuture<'static, ()> {
                Box::pin(produce(cancel, out))
            }),
        }
    }

    /// Returns one production run as a future.
    ///
    /// The sender is dropped when the future completes, which is what closes
    /// the stream for the consumer; the future completes on natural
    /// exhaustion, on cancellation, and when the receiving end goes away.
    pub fn run(&self, cancel: CancellationToken, out: mpsc::Sender<A>) -> BoxFuture<'static, ()> {
        (*self.runner)(cancel, out)
    }

    /// Spawns a production run on the current runtime and returns the
    /// receiving end of its output channel.
    pub fn subscribe(&self, cancel: &CancellationToken) -> mpsc::Receiver<A> {
        let (tx, rx) = mpsc::channel(HANDOFF);
        tokio::spawn(self.run(cancel.clone(), tx));
        rx
    }
}

/// Delivers one value to `out` unless the run is cancelled.
///
/// Two-step guard: first a non-blocking poll of the token, aborting without
/// touching the channel if it is already set; then a `biased` race between
/// cancellation and the send, with cancellation winning ties. Returns `true`
/// only if the value was accepted; on `false` the producer must stop.
pub async fn emit<A>(cancel: &CancellationToken, out: &mpsc::Sender<A>, value: A) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = out.send(value) => sent.is_ok(),
    }
}

/// Creates an event which emits a single value and ends.
pub fn of<A>(a: A) -> Event<A>
where
    A: Clone + Send + Sync + 'static,
{
    Event::new(move |cancel, out| {
        let a = a.clone();
        async move {
            let _ = emit(&cancel, &out, a).await;
        }
    })
}

/// Creates an event which emits every item of a sequence, in order.
pub fn from_iter<A, I>(items: I) -> Event<A>
where
    A: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = A>,
{
    let items: Vec<A> = items.into_iter().collect();
    Event::new(move |cancel, out| {
        let items = items.clone();
        async move {
            for a in items {
                if !emit(&cancel, &out, a).await {
                    return;
                }
            }
        }
    })
}

/// Creates an event which emits the tick instant periodically, first tick
/// one full period after the run starts.
pub fn interval(period: std::time::Duration) -> Event<tokio::time::Instant> {
    Event::new(move |cancel, out| async move {
        let start = tokio::time::Instant::now() + period;
        let mut ticker = tokio::time::interval_at(start, period);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                tick = ticker.tick() => {
                    if !emit(&cancel, &out, tick).await {
                        return;
                    }
                }
            }
        }
    })
}

/// Creates an event which emits a single value after a delay.
pub fn after<A>(delay: std::time::Duration, a: A) -> Event<A>
where
    A: Clone + Send + Sync + 'static,
{
    Event::new(move |cancel, out| {
        let a = a.clone();
        async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let _ = emit(&cancel, &out, a).await;
        }
    })
}
