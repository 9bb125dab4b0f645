use std::fmt;

pub(crate) mod counter;
pub(crate) mod gauge;
pub(crate) mod histogram;
pub(crate) mod local;
pub(crate) mod meter;

/// The kind of a metric. Fixed at creation and never changes for the lifetime
/// of a registry entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MetricKind {
    /// In-flight counter: scope entry increments, scope exit decrements.
    Counter,
    /// Cumulative total that never decreases.
    MonotonicCounter,
    /// Counts units of work that terminated abnormally.
    ExceptionCounter,
    /// Arbitrary last-write-wins value.
    Gauge,
    /// Fixed cumulative buckets.
    Histogram,
    /// EWMA rates over several windows plus a lifetime mean.
    Meter,
}

impl MetricKind {
    /// The type emitted on the exposition `# TYPE` line.
    pub fn exposition_type(self) -> &'static str {
        match self {
            // an in-flight count goes up and down, which the text format
            // models as a gauge
            MetricKind::Counter => "gauge",
            MetricKind::MonotonicCounter | MetricKind::ExceptionCounter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "summary",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Counter => "counter",
            MetricKind::MonotonicCounter => "monotonic-counter",
            MetricKind::ExceptionCounter => "exception-counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "meter",
        };
        f.write_str(name)
    }
}

/// An immutable snapshot of a single metric's value. Snapshots are deep
/// copies: a concurrent mutator can never change one after it is taken, which
/// is what lets the serializer read without holding any metric lock.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Counter(i64),
    MonotonicCounter(u64),
    Exceptions(u64),
    Gauge(f64),
    /// `(upper_bound, cumulative_count)` pairs in ascending bound order,
    /// ending with the `+Inf` bucket.
    Histogram(Vec<(f64, u64)>),
    /// `(window_seconds, rate)` pairs in creation order; a rate is `None`
    /// until the window's first tick. `mean` is total count over wall time
    /// since the meter was created.
    Meter {
        windows: Vec<(f64, Option<f64>)>,
        mean: f64,
    },
}

/// How a bracketed unit of work terminated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Scoped acquisition/release. Every metric implements this so ad-hoc
/// instrumentation ([`Registry::with_tags`](crate::Registry::with_tags)) can
/// bracket a unit of work uniformly; kinds where entry or exit carries no
/// meaning implement them as no-ops.
pub trait Scoped {
    fn enter(&self);
    fn exit(&self, outcome: Outcome);
}

/// Guard pairing one [`Scoped::enter`] with exactly one [`Scoped::exit`].
///
/// Close it explicitly with [`close`](Scope::close). If it is dropped
/// unclosed the exit still runs: with [`Outcome::Failure`] while unwinding
/// from a panic, [`Outcome::Success`] otherwise.
pub struct Scope<M: Scoped> {
    metric: M,
    closed: bool,
}

impl<M: Scoped> Scope<M> {
    pub(crate) fn new(metric: M) -> Self {
        metric.enter();
        Self {
            metric,
            closed: false,
        }
    }

    /// Close the scope with an explicit outcome.
    pub fn close(mut self, outcome: Outcome) {
        self.closed = true;
        self.metric.exit(outcome);
    }
}

impl<M: Scoped> Drop for Scope<M> {
    fn drop(&mut self) {
        if !self.closed {
            let outcome = if std::thread::panicking() {
                Outcome::Failure
            } else {
                Outcome::Success
            };
            self.metric.exit(outcome);
        }
    }
}

/// Entry point for scope guards on cloneable (shared-state) metric handles.
pub trait ScopedExt: Scoped + Clone + Sized {
    /// Enter this metric's scope and return the guard that will exit it.
    fn begin_scope(&self) -> Scope<Self> {
        Scope::new(self.clone())
    }
}

impl<M: Scoped + Clone> ScopedExt for M {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    use super::*;

    #[derive(Clone, Default)]
    struct Probe {
        entered: Arc<AtomicI64>,
        failures: Arc<AtomicI64>,
    }

    impl Scoped for Probe {
        fn enter(&self) {
            self.entered.fetch_add(1, Ordering::Relaxed);
        }

        fn exit(&self, outcome: Outcome) {
            self.entered.fetch_sub(1, Ordering::Relaxed);
            if outcome == Outcome::Failure {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[test]
    fn close_exits_exactly_once() {
        let probe = Probe::default();
        let scope = probe.begin_scope();
        assert_eq!(probe.entered.load(Ordering::Relaxed), 1);
        scope.close(Outcome::Success);
        assert_eq!(probe.entered.load(Ordering::Relaxed), 0);
        assert_eq!(probe.failures.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn unclosed_drop_exits_successfully() {
        let probe = Probe::default();
        drop(probe.begin_scope());
        assert_eq!(probe.entered.load(Ordering::Relaxed), 0);
        assert_eq!(probe.failures.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn panic_unwinds_as_failure() {
        let probe = Probe::default();
        let inner = probe.clone();
        let result = std::panic::catch_unwind(move || {
            let _scope = inner.begin_scope();
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(probe.entered.load(Ordering::Relaxed), 0);
        assert_eq!(probe.failures.load(Ordering::Relaxed), 1);
    }
}
