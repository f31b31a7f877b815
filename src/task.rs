//! Re-invocable fallible computations, the payload type of failure-aware
//! streams.
//!
//! A [`Task`] is the synchronous "invoke and obtain value-or-error"
//! contract: calling [`Task::run`] performs the wrapped computation and
//! yields an [`Outcome`]. Tasks carry no concurrency machinery of their
//! own; the parallel executor decides where and when they run and passes
//! its cancellation token through. Combinators are lazy: composing tasks
//! performs no work until the composed task is invoked, and an error input
//! short-circuits without invoking the supplied function.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The error half of an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// An ordinary domain error.
    #[error("{0}")]
    Message(String),
    /// A panic recovered at a computation boundary.
    #[error("panic: {0}")]
    Panic(String),
}

impl TaskError {
    pub fn msg(text: impl Into<String>) -> TaskError {
        TaskError::Message(text.into())
    }
}

/// What one invocation of a [`Task`] produced: a value or an error, never
/// both, never neither.
pub type Outcome<A> = Result<A, TaskError>;

/// Renders a panic payload for error conversion and diagnostics.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(text) => *text,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(text) => (*text).to_string(),
            Err(_) => "opaque panic payload".to_string(),
        },
    }
}

type Invoke<A> = dyn Fn(&CancellationToken) -> Outcome<A> + Send + Sync;

/// A deferred computation yielding an [`Outcome`] per invocation.
///
/// Tasks are cold and re-invocable: invoking twice may differ in outcome
/// only if the wrapped computation is genuinely effectful.
pub struct Task<A> {
    invoke: Arc<Invoke<A>>,
}

impl<A> Clone for Task<A> {
    fn clone(&self) -> Self {
        Task {
            invoke: Arc::clone(&self.invoke),
        }
    }
}

impl<A: Send + 'static> Task<A> {
    /// Creates a task from a cancellation-aware computation.
    pub fn new<F>(f: F) -> Task<A>
    where
        F: Fn(&CancellationToken) -> Outcome<A> + Send + Sync + 'static,
    {
        Task { invoke: Arc::new(f) }
    }

    /// Creates a task from a computation that ignores cancellation.
    pub fn from_fn<F>(f: F) -> Task<A>
    where
        F: Fn() -> Outcome<A> + Send + Sync + 'static,
    {
        Task::new(move |_| f())
    }

    /// Creates a task which always yields the same value.
    pub fn succeed(a: A) -> Task<A>
    where
        A: Clone + Sync,
    {
        Task::new(move |_| Ok(a.clone()))
    }

    /// Creates a task which always fails with the same error.
    pub fn fail(err: TaskError) -> Task<A> {
        Task::new(move |_| Err(err.clone()))
    }

    /// Creates a task which replays an already-materialized outcome.
    pub fn from_outcome(outcome: Outcome<A>) -> Task<A>
    where
        A: Clone + Sync,
    {
        Task::new(move |_| outcome.clone())
    }

    /// Invokes the computation under the given cancellation signal.
    pub fn run(&self, cancel: &CancellationToken) -> Outcome<A> {
        (*self.invoke)(cancel)
    }

    /// Invokes the computation with no cancellation in effect.
    pub fn invoke(&self) -> Outcome<A> {
        self.run(&CancellationToken::new())
    }

    /// Applies a function to a successful outcome; an error passes through
    /// without invoking the function.
    pub fn map<B, F>(&self, f: F) -> Task<B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let fa = self.clone();
        Task::new(move |cancel| fa.run(cancel).map(&f))
    }

    /// Applies a function to a failed outcome; a success passes through.
    pub fn map_err<F>(&self, f: F) -> Task<A>
    where
        F: Fn(TaskError) -> TaskError + Send + Sync + 'static,
    {
        let fa = self.clone();
        Task::new(move |cancel| fa.run(cancel).map_err(&f))
    }

    /// Maps a pair of functions over the error and success channels.
    pub fn bimap<B, F, G>(&self, on_err: F, on_ok: G) -> Task<B>
    where
        B: Send + 'static,
        F: Fn(TaskError) -> TaskError + Send + Sync + 'static,
        G: Fn(A) -> B + Send + Sync + 'static,
    {
        let fa = self.clone();
        Task::new(move |cancel| match fa.run(cancel) {
            Ok(a) => Ok(on_ok(a)),
            Err(err) => Err(on_err(err)),
        })
    }

    /// Sequences two tasks, feeding the first success into the continuation.
    /// The continuation is not invoked on error.
    pub fn and_then<B, F>(&self, f: F) -> Task<B>
    where
        B: Send + 'static,
        F: Fn(A) -> Task<B> + Send + Sync + 'static,
    {
        let fa = self.clone();
        Task::new(move |cancel| match fa.run(cancel) {
            Ok(a) => f(a).run(cancel),
            Err(err) => Err(err),
        })
    }

    /// Runs both tasks, keeping the first success; fails on the first error.
    pub fn ap_first<B>(&self, fb: &Task<B>) -> Task<A>
    where
        B: Send + 'static,
    {
        let fa = self.clone();
        let fb = fb.clone();
        Task::new(move |cancel| {
            let a = fa.run(cancel)?;
            fb.run(cancel)?;
            Ok(a)
        })
    }

    /// Runs both tasks, keeping the second success; fails on the first error.
    pub fn ap_second<B>(&self, fb: &Task<B>) -> Task<B>
    where
        B: Send + 'static,
    {
        let fa = self.clone();
        let fb = fb.clone();
        Task::new(move |cancel| {
            fa.run(cancel)?;
            fb.run(cancel)
        })
    }

    /// Invokes the task and collapses its outcome with one of two functions.
    pub fn fold<B, F, G>(&self, cancel: &CancellationToken, on_err: F, on_ok: G) -> B
    where
        F: FnOnce(TaskError) -> B,
        G: FnOnce(A) -> B,
    {
        match self.run(cancel) {
            Ok(a) => on_ok(a),
            Err(err) => on_err(err),
        }
    }
}

/// Applies a task-wrapped function to a task-wrapped value, failing on the
/// first error encountered.
pub fn ap<A, B, F>(fab: &Task<F>, fa: &Task<A>) -> Task<B>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> B + Send + Sync + 'static,
{
    let fab = fab.clone();
    let fa = fa.clone();
    Task::new(move |cancel| {
        let f = fab.run(cancel)?;
        let a = fa.run(cancel)?;
        Ok(f(a))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(n: i32) -> i32 {
        n * 2
    }

    #[test]
    fn map_skips_function_on_error() {
        let failed: Task<i32> = Task::fail(TaskError::msg("boom"));
        let mapped: Task<i32> = failed.map(|_| panic!("must not be invoked"));
        assert_eq!(mapped.invoke(), Err(TaskError::msg("boom")));
    }

    #[test]
    fn map_applies_on_success() {
        assert_eq!(Task::succeed(21).map(double).invoke(), Ok(42));
    }

    #[test]
    fn and_then_short_circuits() {
        let failed: Task<i32> = Task::fail(TaskError::msg("first"));
        let chained = failed.and_then(|_| -> Task<i32> { panic!("must not be invoked") });
        assert_eq!(chained.invoke(), Err(TaskError::msg("first")));
    }

    #[test]
    fn ap_fails_on_first_error() {
        let f: Task<fn(i32) -> i32> = Task::fail(TaskError::msg("no function"));
        let got = ap(&f, &Task::succeed(3)).invoke();
        assert_eq!(got, Err(TaskError::msg("no function")));
    }

    #[test]
    fn ap_applies_wrapped_function() {
        let f: Task<fn(i32) -> i32> = Task::succeed(double);
        assert_eq!(ap(&f, &Task::succeed(3)).invoke(), Ok(6));
    }

    #[test]
    fn tasks_are_reinvocable() {
        let t = Task::succeed(7);
        assert_eq!(t.invoke(), Ok(7));
        assert_eq!(t.invoke(), Ok(7));
    }
}
