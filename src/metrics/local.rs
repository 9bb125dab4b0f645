//! Unsynchronized metric variants for values confined to a single thread.
//!
//! Contracts are identical to the shared forms, only the locking differs.
//! These are plain values rather than cloneable handles, are not `Sync`, and
//! cannot live in a [`Registry`](crate::Registry) (registry residency
//! requires the shared forms).

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::Duration;

use super::histogram::HistogramCore;
use super::meter::{Clock, MeterCore, SystemClock};
use super::{MetricValue, Outcome, Scoped};
use crate::Result;

/// Unsynchronized in-flight counter.
#[derive(Debug, Default)]
pub struct LocalCounter {
    value: Cell<i64>,
}

impl LocalCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_by(&self, delta: i64) {
        self.value.set(self.value.get() + delta);
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn dec_by(&self, delta: i64) {
        self.value.set(self.value.get() - delta);
    }

    pub fn dec(&self) {
        self.dec_by(1);
    }

    pub fn value(&self) -> MetricValue {
        MetricValue::Counter(self.value.get())
    }
}

impl Scoped for LocalCounter {
    fn enter(&self) {
        self.inc();
    }

    fn exit(&self, _outcome: Outcome) {
        self.dec();
    }
}

/// Unsynchronized cumulative counter.
#[derive(Debug, Default)]
pub struct LocalMonotonicCounter {
    value: Cell<u64>,
}

impl LocalMonotonicCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_by(&self, delta: u64) {
        self.value.set(self.value.get() + delta);
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn value(&self) -> MetricValue {
        MetricValue::MonotonicCounter(self.value.get())
    }
}

impl Scoped for LocalMonotonicCounter {
    fn enter(&self) {
        self.inc();
    }

    fn exit(&self, _outcome: Outcome) {}
}

/// Unsynchronized abnormal-termination counter.
#[derive(Debug, Default)]
pub struct LocalExceptionCounter {
    value: Cell<u64>,
}

impl LocalExceptionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> MetricValue {
        MetricValue::Exceptions(self.value.get())
    }
}

impl Scoped for LocalExceptionCounter {
    fn enter(&self) {}

    fn exit(&self, outcome: Outcome) {
        if outcome == Outcome::Failure {
            self.value.set(self.value.get() + 1);
        }
    }
}

/// Unsynchronized gauge.
#[derive(Debug, Default)]
pub struct LocalGauge {
    value: Cell<f64>,
}

impl LocalGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: f64) {
        self.value.set(value);
    }

    pub fn inc_by(&self, delta: f64) {
        self.value.set(self.value.get() + delta);
    }

    pub fn inc(&self) {
        self.inc_by(1.0);
    }

    pub fn dec_by(&self, delta: f64) {
        self.value.set(self.value.get() - delta);
    }

    pub fn dec(&self) {
        self.dec_by(1.0);
    }

    pub fn value(&self) -> MetricValue {
        MetricValue::Gauge(self.value.get())
    }
}

impl Scoped for LocalGauge {
    fn enter(&self) {}

    fn exit(&self, _outcome: Outcome) {}
}

/// Unsynchronized cumulative histogram.
#[derive(Debug)]
pub struct LocalHistogram {
    inner: RefCell<HistogramCore>,
}

impl LocalHistogram {
    pub fn new(buckets: &[f64]) -> Result<Self> {
        Ok(Self {
            inner: RefCell::new(HistogramCore::new(buckets)?),
        })
    }

    pub fn mark(&self, value: f64) {
        self.inner.borrow_mut().mark(value);
    }

    pub fn value(&self) -> MetricValue {
        self.inner.borrow().value()
    }
}

impl Scoped for LocalHistogram {
    fn enter(&self) {}

    fn exit(&self, _outcome: Outcome) {}
}

/// Unsynchronized rate meter.
pub struct LocalMeter {
    inner: RefCell<MeterCore>,
}

impl LocalMeter {
    pub fn new(interval: Duration, windows: &[Duration]) -> Result<Self> {
        Self::with_clock(interval, windows, Arc::new(SystemClock))
    }

    pub fn with_clock(
        interval: Duration,
        windows: &[Duration],
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self {
            inner: RefCell::new(MeterCore::new(interval, windows, clock)?),
        })
    }

    pub fn mark_by(&self, value: f64) {
        self.inner.borrow_mut().mark(value);
    }

    pub fn mark(&self) {
        self.mark_by(1.0);
    }

    pub fn value(&self) -> MetricValue {
        self.inner.borrow_mut().value()
    }
}

impl Scoped for LocalMeter {
    fn enter(&self) {}

    fn exit(&self, _outcome: Outcome) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_counter_matches_shared_contract() {
        let counter = LocalCounter::new();
        counter.enter();
        counter.inc_by(4);
        counter.exit(Outcome::Success);
        assert_eq!(counter.value(), MetricValue::Counter(4));
    }

    #[test]
    fn local_exception_counter_counts_failures_only() {
        let counter = LocalExceptionCounter::new();
        counter.exit(Outcome::Success);
        counter.exit(Outcome::Failure);
        counter.exit(Outcome::Failure);
        assert_eq!(counter.value(), MetricValue::Exceptions(2));
    }

    #[test]
    fn local_histogram_is_cumulative() {
        let histogram = LocalHistogram::new(&[1.0, 5.0, 10.0]).unwrap();
        histogram.mark(3.0);
        assert_eq!(
            histogram.value(),
            MetricValue::Histogram(vec![(1.0, 0), (5.0, 1), (10.0, 1), (f64::INFINITY, 1)])
        );
    }
}
