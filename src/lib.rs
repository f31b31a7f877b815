//! Cancellable push-based event streams for tokio
//!
//! An [`Event`] is a cold producer: each subscription spawns a fresh
//! production run that pushes values into a rendezvous channel until the
//! source is exhausted or the run's cancellation token fires. Everything
//! else is layered on top of it:
//!
//! - `event`: the stream engine, with sources, transformation combinators
//!   and terminal consumers sharing one cancellation-guarded delivery path
//! - `task`: a re-invocable fallible computation, the payload type for
//!   failure-aware streams
//! - `future`: failure-aware streams (`Event` of `Task`) with panic
//!   recovery at the construction boundary
//! - `parallel`: runs a stream of pending tasks with bounded concurrency
//!   while emitting outcomes in input order
//! - `ring`: the fixed-capacity reorder buffer used by `parallel`
//!
//! Cancellation is cooperative and one-way: a single
//! [`CancellationToken`](tokio_util::sync::CancellationToken) is threaded
//! through an entire composition tree, every delivery polls it, and once
//! fired no further value is ever delivered.

pub mod event;
pub mod future;
pub mod parallel;
pub mod ring;
pub mod task;

pub use event::Event;
pub use future::Future;
pub use parallel::parallel;
pub use task::{Outcome, Task, TaskError};
