//! Bounded-concurrency executor that preserves input order.
//!
//! The executor consumes a stream of pending tasks, runs up to `limit` of
//! them at once and emits their outcomes in dequeue order, whatever the
//! completion order. One owning loop holds all mutable state; workers only
//! talk to it through the completion channel, so the reorder buffer never
//! has more than one logical owner and needs no locking of its own.

use tokio::sync::mpsc;
use tracing::debug;

use crate::event::{emit, Event, HANDOFF};
use crate::future::Future;
use crate::ring::Ring;
use crate::task::{panic_message, Outcome, Task, TaskError};

/// A completion report: which slot finished, and with what.
struct Indexed<A> {
    index: usize,
    outcome: Outcome<A>,
}

async fn next_task<A>(upstream: &mut Option<mpsc::Receiver<Task<A>>>) -> Option<Task<A>> {
    match upstream {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Creates a future which runs up to `limit` upstream tasks concurrently
/// while emitting their outcomes in input order.
///
/// Each dequeued task gets the next slot index and an independent worker on
/// the blocking pool; indices are never reused. New tasks are dequeued only
/// while fewer than `limit` slots are in flight, which is the sole
/// concurrency bound. A worker panic is recovered into the error channel
/// rather than tearing the run down. On cancellation the run stops
/// dequeuing, stops waiting for outstanding workers, discards any
/// buffered-but-unemitted outcomes and closes its channel. `limit` 0 is
/// treated as 1.
pub fn parallel<A>(fas: Future<A>, limit: usize) -> Future<A>
where
    A: Clone + Send + Sync + 'static,
{
    let limit = limit.max(1);
    Event::new(move |cancel, out| {
        let fas = fas.clone();
        async move {
            let mut upstream = Some(fas.subscribe(&cancel));
            let (report_tx, mut report_rx) = mpsc::channel::<Indexed<A>>(HANDOFF);
            let mut ring: Ring<Outcome<A>> = Ring::new(limit);
            let mut head = 0usize;
            let mut tail = 0usize;

            'run: loop {
                let below_limit = upstream.is_some() && head - tail < limit;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'run,
                    dequeued = next_task(&mut upstream), if below_limit => {
                        match dequeued {
                            Some(task) => {
                                let index = head;
                                head += 1;
                                let worker_cancel = cancel.clone();
                                let report = report_tx.clone();
                                tokio::spawn(async move {
                                    let invoked = tokio::task::spawn_blocking(move || {
                                        task.run(&worker_cancel)
                                    })
                                    .await;
                                    let outcome = match invoked {
                                        Ok(outcome) => outcome,
                                        Err(err) if err.is_panic() => {
                                            let msg = panic_message(err.into_panic());
                                            debug!(index, %msg, "parallel worker panicked");
                                            Err(TaskError::Panic(msg))
                                        }
                                        Err(_) => return,
                                    };
                                    let _ = report.send(Indexed { index, outcome }).await;
                                });
                            }
                            None => {
                                upstream = None;
                                if head == tail {
                                    break 'run;
                                }
                            }
                        }
                    }
                    completed = report_rx.recv() => {
                        let Some(completed) = completed else { break 'run };
                        ring.put(completed.index, completed.outcome);
                        // Emit the contiguous completed prefix, in slot order.
                        while let Some(outcome) = ring.take(tail) {
                            if !emit(&cancel, &out, Task::from_outcome(outcome)).await {
                                break 'run;
                            }
                            tail += 1;
                        }
                        if upstream.is_none() && head == tail {
                            break 'run;
                        }
                    }
                }
            }

            let buffered = ring.len();
            let in_flight = head.saturating_sub(tail).saturating_sub(buffered);
            if buffered > 0 || in_flight > 0 {
                debug!(buffered, in_flight, "parallel run ended early, discarding unemitted outcomes");
            }
        }
    })
}
