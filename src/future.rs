//! Failure-aware streams: events whose values are fallible computations.
//!
//! A [`Future`] is an [`Event`] of [`Task`]s. Constructors resolve or defer
//! work as documented per function; the algebraic lifts route through the
//! task's success channel and short-circuit on error. Cancellation is not
//! an error: a cancelled future stops emitting and closes its channel.
//!
//! Not to be confused with [`std::future::Future`]; this is the stream
//! shape, named for what it carries rather than how it is polled.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::event::{self, emit, Event};
use crate::task::{Task, TaskError};

/// A cold stream of fallible outcomes.
pub type Future<A> = Event<Task<A>>;

/// Creates a future that succeeds once with a value.
pub fn succeed<A>(a: A) -> Future<A>
where
    A: Clone + Send + Sync + 'static,
{
    event::of(Task::succeed(a))
}

/// Creates a future that fails once with an error.
pub fn fail<A>(err: TaskError) -> Future<A>
where
    A: Send + 'static,
{
    event::of(Task::fail(err))
}

/// Lifts a value stream into a future which always succeeds.
pub fn success<A>(ea: Event<A>) -> Future<A>
where
    A: Clone + Send + Sync + 'static,
{
    ea.map(Task::succeed)
}

/// Lifts an error stream into a future which always fails.
pub fn failure<A>(errors: Event<TaskError>) -> Future<A>
where
    A: Send + 'static,
{
    errors.map(Task::fail)
}

/// Creates a future that succeeds with a value after a delay.
pub fn after<A>(delay: Duration, a: A) -> Future<A>
where
    A: Clone + Send + Sync + 'static,
{
    success(event::after(delay, a))
}

/// Creates a future that fails with an error after a delay.
pub fn fail_after<A>(delay: Duration, err: TaskError) -> Future<A>
where
    A: Send + 'static,
{
    failure(event::after(delay, err))
}

/// Creates a future that invokes a synchronous fallible computation once
/// per run, recovering panics.
///
/// The computation runs on the blocking pool. A panic raised during
/// invocation never propagates: it is converted into the error channel by
/// the caller-supplied `on_panic` and emitted as an ordinary failed
/// outcome.
pub fn attempt<A, F>(ra: Task<A>, on_panic: F) -> Future<A>
where
    A: Clone + Send + Sync + 'static,
    F: Fn(Box<dyn Any + Send>) -> TaskError + Send + Sync + 'static,
{
    let on_panic = Arc::new(on_panic);
    Event::new(move |cancel, out| {
        let ra = ra.clone();
        let on_panic = Arc::clone(&on_panic);
        async move {
            let invoke_cancel = cancel.clone();
            let joined = tokio::task::spawn_blocking(move || ra.run(&invoke_cancel)).await;
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) if err.is_panic() => {
                    let converted = (*on_panic)(err.into_panic());
                    debug!(error = %converted, "recovered panic in attempted computation");
                    Err(converted)
                }
                // Runtime shutdown; nothing sensible left to report.
                Err(_) => return,
            };
            let _ = emit(&cancel, &out, Task::from_outcome(outcome)).await;
        }
    })
}

/// Applies a function to every successful outcome; errors pass through
/// unchanged without invoking the function.
pub fn map<A, B, F>(fa: Future<A>, f: F) -> Future<B>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> B + Send + Sync + 'static,
{
    let f = Arc::new(f);
    fa.map(move |ta| {
        let f = Arc::clone(&f);
        ta.map(move |a| (*f)(a))
    })
}

/// Applies the latest task-wrapped function from `fab` to every outcome of
/// `fa`, failing on the first error of either side.
pub fn ap<A, B, F>(fab: Future<F>, fa: Future<A>) -> Future<B>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> B + Send + Sync + 'static,
{
    let lifted = fab.map(|tab: Task<F>| move |ta: Task<A>| crate::task::ap(&tab, &ta));
    event::ap(lifted, fa)
}

/// Sequences futures: each successful outcome selects the next future,
/// which is fully drained before the next upstream outcome is taken. An
/// error outcome skips the continuation and is propagated as-is.
pub fn chain<A, B, F>(ma: Future<A>, f: F) -> Future<B>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> Future<B> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    ma.chain(move |ta: Task<A>| {
        let f = Arc::clone(&f);
        match ta.invoke() {
            Ok(a) => (*f)(a),
            Err(err) => fail(err),
        }
    })
}

/// Merges two futures in real-time arrival order.
pub fn alt<A>(x: Future<A>, y: Future<A>) -> Future<A>
where
    A: Send + 'static,
{
    x.alt(&y)
}
