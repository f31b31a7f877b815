//! Transformation combinators, two-stream constructors and terminal
//! consumers for [`Event`].
//!
//! Each combinator builds a new `Event` whose run subscribes to its
//! upstream(s) on dedicated tasks and relays through the guarded delivery
//! path. Dropping an upstream receiver is how a combinator stops
//! consumption: the upstream's next send fails and its run ends.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures::stream::{SelectAll, StreamExt};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use super::{emit, Event};

/// A value paired with the value that preceded it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Last<A> {
    pub now: A,
    pub last: Option<A>,
}

/// A value paired with the wall-clock time it was observed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timed<A> {
    pub value: A,
    pub at: SystemTime,
}

impl<A: Send + 'static> Event<A> {
    /// Applies a function to every value; order and cardinality preserving.
    pub fn map<B, F>(&self, f: F) -> Event<B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let fa = self.clone();
        let f = Arc::new(f);
        Event::new(move |cancel, out| {
            let fa = fa.clone();
            let f = Arc::clone(&f);
            async move {
                let mut rx = fa.subscribe(&cancel);
                while let Some(a) = rx.recv().await {
                    if !emit(&cancel, &out, (*f)(a)).await {
                        return;
                    }
                }
            }
        })
    }

    /// Keeps only the values for which the predicate holds.
    pub fn filter<P>(&self, keep: P) -> Event<A>
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let fa = self.clone();
        let keep = Arc::new(keep);
        Event::new(move |cancel, out| {
            let fa = fa.clone();
            let keep = Arc::clone(&keep);
            async move {
                let mut rx = fa.subscribe(&cancel);
                while let Some(a) = rx.recv().await {
                    if (*keep)(&a) && !emit(&cancel, &out, a).await {
                        return;
                    }
                }
            }
        })
    }

    /// Maps every value, dropping the ones that map to `None`.
    pub fn filter_map<B, F>(&self, f: F) -> Event<B>
    where
        B: Send + 'static,
        F: Fn(A) -> Option<B> + Send + Sync + 'static,
    {
        let fa = self.clone();
        let f = Arc::new(f);
        Event::new(move |cancel, out| {
            let fa = fa.clone();
            let f = Arc::clone(&f);
            async move {
                let mut rx = fa.subscribe(&cancel);
                while let Some(a) = rx.recv().await {
                    if let Some(b) = (*f)(a) {
                        if !emit(&cancel, &out, b).await {
                            return;
                        }
                    }
                }
            }
        })
    }

    /// For every upstream value, instantiates a sub-event and fully drains
    /// it before taking the next upstream value. Output order is the
    /// concatenation of the sub-streams in upstream order.
    pub fn chain<B, F>(&self, f: F) -> Event<B>
    where
        B: Send + 'static,
        F: Fn(A) -> Event<B> + Send + Sync + 'static,
    {
        let fa = self.clone();
        let f = Arc::new(f);
        Event::new(move |cancel, out| {
            let fa = fa.clone();
            let f = Arc::clone(&f);
            async move {
                let mut rx = fa.subscribe(&cancel);
                while let Some(a) = rx.recv().await {
                    let mut sub = (*f)(a).subscribe(&cancel);
                    while let Some(b) = sub.recv().await {
                        if !emit(&cancel, &out, b).await {
                            return;
                        }
                    }
                }
            }
        })
    }

    /// Merges two sources. Each source's internal order is preserved;
    /// interleaving between the sources follows real-time arrival and is
    /// not deterministic.
    pub fn alt(&self, other: &Event<A>) -> Event<A> {
        let x = self.clone();
        let y = other.clone();
        Event::new(move |cancel, out| {
            let x = x.clone();
            let y = y.clone();
            async move {
                let mut merged = SelectAll::new();
                merged.push(ReceiverStream::new(x.subscribe(&cancel)));
                merged.push(ReceiverStream::new(y.subscribe(&cancel)));
                while let Some(a) = merged.next().await {
                    if !emit(&cancel, &out, a).await {
                        return;
                    }
                }
            }
        })
    }

    /// Emits the first `n` values, then ends the run. Ending drops the
    /// upstream receiver, which stops upstream production rather than
    /// merely suppressing its output.
    pub fn take(&self, n: usize) -> Event<A> {
        let fa = self.clone();
        Event::new(move |cancel, out| {
            let fa = fa.clone();
            async move {
                if n == 0 {
                    return;
                }
                let mut rx = fa.subscribe(&cancel);
                let mut seen = 0usize;
                while let Some(a) = rx.recv().await {
                    if !emit(&cancel, &out, a).await {
                        return;
                    }
                    seen += 1;
                    if seen == n {
                        return;
                    }
                }
            }
        })
    }

    /// Emits values while the predicate fails; ends at the first value for
    /// which it holds, excluding that value.
    pub fn until<P>(&self, stop: P) -> Event<A>
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let fa = self.clone();
        let stop = Arc::new(stop);
        Event::new(move |cancel, out| {
            let fa = fa.clone();
            let stop = Arc::clone(&stop);
            async move {
                let mut rx = fa.subscribe(&cancel);
                while let Some(a) = rx.recv().await {
                    if (*stop)(&a) {
                        return;
                    }
                    if !emit(&cancel, &out, a).await {
                        return;
                    }
                }
            }
        })
    }

    /// Waits for the first value for which the predicate holds, emits
    /// exactly that value and ends. Values before it are consumed and
    /// dropped.
    pub fn once<P>(&self, pred: P) -> Event<A>
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let fa = self.clone();
        let pred = Arc::new(pred);
        Event::new(move |cancel, out| {
            let fa = fa.clone();
            let pred = Arc::clone(&pred);
            async move {
                let mut rx = fa.subscribe(&cancel);
                while let Some(a) = rx.recv().await {
                    if (*pred)(&a) {
                        let _ = emit(&cancel, &out, a).await;
                        return;
                    }
                }
            }
        })
    }

    /// Emits a running left-to-right accumulation, one output per input.
    pub fn fold<B, F>(&self, seed: B, f: F) -> Event<B>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(B, A) -> B + Send + Sync + 'static,
    {
        let fa = self.clone();
        let f = Arc::new(f);
        Event::new(move |cancel, out| {
            let fa = fa.clone();
            let f = Arc::clone(&f);
            let acc = seed.clone();
            async move {
                let mut acc = acc;
                let mut rx = fa.subscribe(&cancel);
                while let Some(a) = rx.recv().await {
                    acc = (*f)(acc, a);
                    if !emit(&cancel, &out, acc.clone()).await {
                        return;
                    }
                }
            }
        })
    }

    /// Emits how many values the source has fired so far.
    pub fn count(&self) -> Event<usize> {
        self.fold(0usize, |n, _| n + 1)
    }

    /// Emits, per source value, the number of values observed within the
    /// trailing time window. Approximate: the window is re-evaluated only
    /// when the source fires.
    pub fn count_window(&self, window: Duration) -> Event<usize> {
        let fa = self.clone();
        Event::new(move |cancel, out| {
            let fa = fa.clone();
            async move {
                let mut stamps: VecDeque<tokio::time::Instant> = VecDeque::new();
                let mut rx = fa.subscribe(&cancel);
                while rx.recv().await.is_some() {
                    let now = tokio::time::Instant::now();
                    stamps.push_back(now);
                    while let Some(oldest) = stamps.front() {
                        if now.duration_since(*oldest) > window {
                            stamps.pop_front();
                        } else {
                            break;
                        }
                    }
                    if !emit(&cancel, &out, stamps.len()).await {
                        return;
                    }
                }
            }
        })
    }

    /// Pairs every value with its predecessor.
    pub fn with_last(&self) -> Event<Last<A>>
    where
        A: Clone,
    {
        let fa = self.clone();
        Event::new(move |cancel, out| {
            let fa = fa.clone();
            async move {
                let mut prev: Option<A> = None;
                let mut rx = fa.subscribe(&cancel);
                while let Some(a) = rx.recv().await {
                    let item = Last {
                        now: a.clone(),
                        last: prev.take(),
                    };
                    prev = Some(a);
                    if !emit(&cancel, &out, item).await {
                        return;
                    }
                }
            }
        })
    }

    /// Pairs every value with the wall-clock time it passed through.
    pub fn with_time(&self) -> Event<Timed<A>> {
        let fa = self.clone();
        Event::new(move |cancel, out| {
            let fa = fa.clone();
            async move {
                let mut rx = fa.subscribe(&cancel);
                while let Some(a) = rx.recv().await {
                    let item = Timed {
                        value: a,
                        at: SystemTime::now(),
                    };
                    if !emit(&cancel, &out, item).await {
                        return;
                    }
                }
            }
        })
    }

    /// Drains the stream, folding left-to-right incrementally.
    pub async fn reduce<B, F>(&self, cancel: &CancellationToken, seed: B, mut f: F) -> B
    where
        F: FnMut(B, A) -> B,
    {
        let mut rx = self.subscribe(cancel);
        let mut acc = seed;
        while let Some(a) = rx.recv().await {
            acc = f(acc, a);
        }
        acc
    }

    /// Buffers the entire stream, then folds right-to-left.
    ///
    /// Memory use is proportional to stream length; a right fold cannot
    /// start before the stream ends. Unsuitable for unbounded sources.
    pub async fn reduce_right<B, F>(&self, cancel: &CancellationToken, seed: B, mut f: F) -> B
    where
        F: FnMut(A, B) -> B,
    {
        let mut rx = self.subscribe(cancel);
        let mut buffered = Vec::new();
        while let Some(a) = rx.recv().await {
            buffered.push(a);
        }
        let mut acc = seed;
        for a in buffered.into_iter().rev() {
            acc = f(a, acc);
        }
        acc
    }

    /// Drains the stream and returns how many values it fired in total.
    pub async fn count_all(&self, cancel: &CancellationToken) -> usize {
        self.reduce(cancel, 0usize, |n, _| n + 1).await
    }
}

/// Creates an event which holds the latest function observed from `fab` and
/// applies it to every value observed from `fa`.
///
/// Application is suspended until the first function arrives; if `fab` ends
/// before producing one, the combinator ends without emitting. Output
/// cardinality equals `fa`'s from that point on.
pub fn ap<A, B, F>(fab: Event<F>, fa: Event<A>) -> Event<B>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> B + Clone + Send + Sync + 'static,
{
    Event::new(move |cancel, out| {
        let fab = fab.clone();
        let fa = fa.clone();
        async move {
            let mut fns = fab.subscribe(&cancel);
            let mut values = fa.subscribe(&cancel);
            let mut latest = match fns.recv().await {
                Some(f) => f,
                None => return,
            };
            let mut fns_open = true;
            let mut values_open = true;
            loop {
                tokio::select! {
                    f = fns.recv(), if fns_open => match f {
                        Some(f) => latest = f,
                        None => {
                            fns_open = false;
                            if !values_open {
                                return;
                            }
                        }
                    },
                    a = values.recv(), if values_open => match a {
                        Some(a) => {
                            if !emit(&cancel, &out, latest(a)).await {
                                return;
                            }
                        }
                        None => {
                            values_open = false;
                            if !fns_open {
                                return;
                            }
                        }
                    },
                    else => return,
                }
            }
        }
    })
}

/// Creates an event which holds the latest value from `fa` and emits
/// `f(latest)` each time the control stream `fab` fires.
///
/// Firings that occur before the first value has arrived are dropped; if
/// `fa` ends before producing one, the combinator ends without emitting.
pub fn sample_on<A, B, F>(fa: Event<A>, fab: Event<F>) -> Event<B>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> B + Send + 'static,
{
    Event::new(move |cancel, out| {
        let fa = fa.clone();
        let fab = fab.clone();
        async move {
            let mut values = fa.subscribe(&cancel);
            let mut fns = fab.subscribe(&cancel);
            let mut latest = match values.recv().await {
                Some(a) => a,
                None => return,
            };
            let mut values_open = true;
            let mut fns_open = true;
            loop {
                tokio::select! {
                    a = values.recv(), if values_open => match a {
                        Some(a) => latest = a,
                        None => {
                            values_open = false;
                            if !fns_open {
                                return;
                            }
                        }
                    },
                    f = fns.recv(), if fns_open => match f {
                        Some(f) => {
                            if !emit(&cancel, &out, f(latest.clone())).await {
                                return;
                            }
                        }
                        None => {
                            fns_open = false;
                            if !values_open {
                                return;
                            }
                        }
                    },
                    else => return,
                }
            }
        }
    })
}
