//! Future layer tests: construction, panic recovery and algebraic lifts.

use std::time::Duration;

use ripple::event;
use ripple::future::{self, Future};
use ripple::task::{panic_message, Outcome, Task, TaskError};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

async fn outcomes<A: Send + 'static>(fa: &Future<A>) -> Vec<Outcome<A>> {
    let cancel = CancellationToken::new();
    let mut rx = fa.subscribe(&cancel);
    let mut got = Vec::new();
    while let Some(task) = rx.recv().await {
        got.push(task.invoke());
    }
    got
}

fn double(n: i32) -> i32 {
    n * 2
}

fn fatal(payload: Box<dyn std::any::Any + Send>) -> TaskError {
    TaskError::Message(format!("fatal: {}", panic_message(payload)))
}

#[tokio::test]
async fn succeed_emits_one_ok() {
    assert_eq!(outcomes(&future::succeed(42)).await, vec![Ok(42)]);
}

#[tokio::test]
async fn fail_emits_one_err() {
    let fa: Future<i32> = future::fail(TaskError::msg("failed"));
    assert_eq!(outcomes(&fa).await, vec![Err(TaskError::msg("failed"))]);
}

#[tokio::test]
async fn success_lifts_a_value_stream() {
    let fa = future::success(event::from_iter([1, 2, 3]));
    assert_eq!(outcomes(&fa).await, vec![Ok(1), Ok(2), Ok(3)]);
}

#[tokio::test]
async fn failure_lifts_an_error_stream() {
    let errors = event::from_iter([TaskError::msg("first"), TaskError::msg("second")]);
    let fa: Future<i32> = future::failure(errors);
    assert_eq!(
        outcomes(&fa).await,
        vec![Err(TaskError::msg("first")), Err(TaskError::msg("second"))]
    );
}

#[tokio::test]
async fn after_succeeds_after_the_delay() {
    let fa = future::after(Duration::from_millis(1), 42);
    assert_eq!(outcomes(&fa).await, vec![Ok(42)]);
}

#[tokio::test]
async fn fail_after_fails_after_the_delay() {
    let fa: Future<i32> = future::fail_after(Duration::from_millis(1), TaskError::msg("failed"));
    assert_eq!(outcomes(&fa).await, vec![Err(TaskError::msg("failed"))]);
}

#[tokio::test]
async fn attempt_emits_the_computed_value() {
    let fa = future::attempt(Task::from_fn(|| Ok(42)), fatal);
    assert_eq!(outcomes(&fa).await, vec![Ok(42)]);
}

#[tokio::test]
async fn attempt_emits_the_computed_error() {
    let fa = future::attempt(
        Task::from_fn(|| Err::<i32, _>(TaskError::msg("failed"))),
        fatal,
    );
    assert_eq!(outcomes(&fa).await, vec![Err(TaskError::msg("failed"))]);
}

#[tokio::test]
async fn attempt_converts_a_panic_into_an_error() {
    let boom: Task<i32> = Task::from_fn(|| panic!("barbaz"));
    let fa = future::attempt(boom, fatal);
    assert_eq!(outcomes(&fa).await, vec![Err(TaskError::msg("fatal: barbaz"))]);
}

#[tokio::test]
async fn map_applies_to_successes() {
    let fa = future::map(future::succeed(42), double);
    assert_eq!(outcomes(&fa).await, vec![Ok(84)]);
}

#[tokio::test]
async fn map_propagates_errors_without_invoking() {
    let failed: Future<i32> = future::fail(TaskError::msg("failed"));
    let fa = future::map(failed, |_| -> i32 { panic!("must not be invoked") });
    assert_eq!(outcomes(&fa).await, vec![Err(TaskError::msg("failed"))]);
}

#[tokio::test]
async fn ap_applies_the_wrapped_function() {
    let fns: Vec<fn(i32) -> i32> = vec![double];
    let fa = future::ap(future::success(event::from_iter(fns)), future::succeed(42));
    assert_eq!(outcomes(&fa).await, vec![Ok(84)]);
}

#[tokio::test]
async fn chain_sequences_on_success() {
    let fa = future::chain(future::succeed(2), |a| future::succeed(a * 10));
    assert_eq!(outcomes(&fa).await, vec![Ok(20)]);
}

#[tokio::test]
async fn chain_skips_continuation_on_error() {
    let failed: Future<i32> = future::fail(TaskError::msg("failed"));
    let fa = future::chain(failed, |_| -> Future<i32> { panic!("must not be invoked") });
    assert_eq!(outcomes(&fa).await, vec![Err(TaskError::msg("failed"))]);
}

#[tokio::test]
async fn alt_merges_both_sides() {
    let fa = future::alt(future::succeed(1), future::succeed(2));
    let mut got: Vec<i32> = outcomes(&fa)
        .await
        .into_iter()
        .map(|o| o.expect("both sides succeed"))
        .collect();
    got.sort_unstable();
    assert_eq!(got, vec![1, 2]);
}

#[tokio::test]
async fn cancelled_future_still_closes_its_channel() {
    let fa = future::after(Duration::from_millis(50), 1);
    let cancel = CancellationToken::new();
    let mut rx = fa.subscribe(&cancel);
    cancel.cancel();
    let closed = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("channel must close promptly");
    assert!(closed.is_none());
}
