use std::sync::Arc;

use parking_lot::Mutex;

use super::{MetricValue, Outcome, Scoped};

/// A last-write-wins floating point value, no history.
#[derive(Clone, Debug, Default)]
pub struct Gauge {
    inner: Arc<Mutex<f64>>,
}

impl Gauge {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: f64) {
        *self.inner.lock() = value;
    }

    pub fn inc_by(&self, delta: f64) {
        *self.inner.lock() += delta;
    }

    pub fn inc(&self) {
        self.inc_by(1.0);
    }

    pub fn dec_by(&self, delta: f64) {
        *self.inner.lock() -= delta;
    }

    pub fn dec(&self) {
        self.dec_by(1.0);
    }

    /// Snapshot of the current value.
    pub fn value(&self) -> MetricValue {
        MetricValue::Gauge(*self.inner.lock())
    }
}

impl Scoped for Gauge {
    fn enter(&self) {}

    fn exit(&self, _outcome: Outcome) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let gauge = Gauge::new();
        gauge.set(4.5);
        gauge.inc();
        gauge.dec_by(2.0);
        assert_eq!(gauge.value(), MetricValue::Gauge(3.5));
        gauge.set(0.5);
        assert_eq!(gauge.value(), MetricValue::Gauge(0.5));
    }
}
