use std::sync::{
    atomic::{AtomicI64, AtomicU64, Ordering},
    Arc,
};

use super::{MetricValue, Outcome, Scope, Scoped};

/// Tracks the number of operations currently in flight. Scope entry
/// increments, scope exit decrements, so the value is the live count rather
/// than a running total.
#[derive(Clone, Debug, Default)]
pub struct Counter {
    inner: Arc<AtomicI64>,
}

impl Counter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn inc_by(&self, delta: i64) {
        self.inner.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn dec_by(&self, delta: i64) {
        self.inner.fetch_sub(delta, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.dec_by(1);
    }

    /// Snapshot of the current in-flight count.
    pub fn value(&self) -> MetricValue {
        MetricValue::Counter(self.inner.load(Ordering::Relaxed))
    }
}

impl Scoped for Counter {
    fn enter(&self) {
        self.inc();
    }

    fn exit(&self, _outcome: Outcome) {
        self.dec();
    }
}

/// A cumulative total that never decreases, e.g. requests served. Scope entry
/// increments by one; exit is a no-op.
#[derive(Clone, Debug, Default)]
pub struct MonotonicCounter {
    inner: Arc<AtomicU64>,
}

impl MonotonicCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn inc_by(&self, delta: u64) {
        self.inner.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// A scope that counts an explicit delta on entry instead of one.
    pub fn counted(&self, delta: u64) -> Scope<WeightedCount> {
        Scope::new(WeightedCount {
            counter: self.clone(),
            delta,
        })
    }

    /// Snapshot of the running total.
    pub fn value(&self) -> MetricValue {
        MetricValue::MonotonicCounter(self.inner.load(Ordering::Relaxed))
    }
}

impl Scoped for MonotonicCounter {
    fn enter(&self) {
        self.inc();
    }

    fn exit(&self, _outcome: Outcome) {}
}

/// See [`MonotonicCounter::counted`].
#[derive(Clone)]
pub struct WeightedCount {
    counter: MonotonicCounter,
    delta: u64,
}

impl Scoped for WeightedCount {
    fn enter(&self) {
        self.counter.inc_by(self.delta);
    }

    fn exit(&self, _outcome: Outcome) {}
}

/// Counts bracketed units of work that terminated abnormally. Entry is a
/// no-op; exit increments only when the outcome is [`Outcome::Failure`].
#[derive(Clone, Debug, Default)]
pub struct ExceptionCounter {
    inner: Arc<AtomicU64>,
}

impl ExceptionCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the abnormal-termination count.
    pub fn value(&self) -> MetricValue {
        MetricValue::Exceptions(self.inner.load(Ordering::Relaxed))
    }
}

impl Scoped for ExceptionCounter {
    fn enter(&self) {}

    fn exit(&self, outcome: Outcome) {
        if outcome == Outcome::Failure {
            self.inner.fetch_add(1, Ordering::Relaxed);
        }
    }
}
