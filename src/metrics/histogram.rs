use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{MetricValue, Outcome, Scoped};
use crate::{Error, Result};

/// Bucket state shared by the concurrent and single-threaded forms.
///
/// Buckets are cumulative: `counts[i]` is the number of observations less
/// than or equal to `bounds[i]`, so one observation increments every bucket
/// whose upper bound covers it.
#[derive(Debug, Clone)]
pub(crate) struct HistogramCore {
    bounds: Vec<f64>,
    counts: Vec<u64>,
}

impl HistogramCore {
    pub(crate) fn new(buckets: &[f64]) -> Result<Self> {
        if buckets.is_empty() {
            return Err(Error::InvalidParameter(
                "histogram needs at least one bucket bound",
            ));
        }
        if buckets.iter().any(|bound| bound.is_nan()) {
            return Err(Error::InvalidParameter(
                "histogram bucket bounds must not be NaN",
            ));
        }
        let mut bounds = buckets.to_vec();
        bounds.sort_by(f64::total_cmp);
        bounds.dedup();
        if bounds.last() != Some(&f64::INFINITY) {
            bounds.push(f64::INFINITY);
        }
        let counts = vec![0; bounds.len()];
        Ok(Self { bounds, counts })
    }

    pub(crate) fn mark(&mut self, value: f64) {
        for (bound, count) in self.bounds.iter().zip(self.counts.iter_mut()) {
            if value <= *bound {
                *count += 1;
            }
        }
    }

    pub(crate) fn value(&self) -> MetricValue {
        MetricValue::Histogram(
            self.bounds
                .iter()
                .copied()
                .zip(self.counts.iter().copied())
                .collect(),
        )
    }
}

/// A threadsafe histogram over fixed, caller-supplied bucket upper bounds. A
/// `+Inf` bucket is appended when the caller did not provide one.
#[derive(Clone, Debug)]
pub struct Histogram {
    inner: Arc<Mutex<HistogramCore>>,
}

impl Histogram {
    pub(crate) fn new(buckets: &[f64]) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(HistogramCore::new(buckets)?)),
        })
    }

    /// Record one observation.
    pub fn mark(&self, value: f64) {
        self.inner.lock().mark(value);
    }

    pub fn mark_duration_secs(&self, value: Duration) {
        self.mark(value.as_secs_f64());
    }

    /// Snapshot of the per-bucket cumulative counts.
    pub fn value(&self) -> MetricValue {
        self.inner.lock().value()
    }
}

impl Scoped for Histogram {
    fn enter(&self) {}

    fn exit(&self, _outcome: Outcome) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(histogram: &Histogram) -> Vec<(f64, u64)> {
        match histogram.value() {
            MetricValue::Histogram(buckets) => buckets,
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn empty_bucket_list_is_rejected() {
        assert!(Histogram::new(&[]).is_err());
        assert!(Histogram::new(&[f64::NAN]).is_err());
    }

    #[test]
    fn marks_are_cumulative() {
        let histogram = Histogram::new(&[1.0, 5.0, 10.0]).unwrap();
        histogram.mark(3.0);
        assert_eq!(
            counts(&histogram),
            vec![(1.0, 0), (5.0, 1), (10.0, 1), (f64::INFINITY, 1)]
        );
    }

    #[test]
    fn bound_is_inclusive() {
        let histogram = Histogram::new(&[1.0, 5.0]).unwrap();
        histogram.mark(5.0);
        assert_eq!(
            counts(&histogram),
            vec![(1.0, 0), (5.0, 1), (f64::INFINITY, 1)]
        );
    }

    #[test]
    fn explicit_infinity_is_not_duplicated() {
        let histogram = Histogram::new(&[10.0, f64::INFINITY, 1.0]).unwrap();
        histogram.mark(100.0);
        assert_eq!(
            counts(&histogram),
            vec![(1.0, 0), (10.0, 0), (f64::INFINITY, 1)]
        );
    }
}
