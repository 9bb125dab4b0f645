use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use twox_hash::XxHash64;

use crate::metrics::counter::{Counter, ExceptionCounter, MonotonicCounter};
use crate::metrics::gauge::Gauge;
use crate::metrics::histogram::Histogram;
use crate::metrics::meter::Meter;
use crate::metrics::{MetricKind, MetricValue, Outcome, Scoped, ScopedExt};
use crate::{Error, Result};

const MID_SEED: u64 = 0xdeadbeef;

/// Canonical (sorted, deduped, interned) tag-set attached to one metric.
pub type TagSet = SmallVec<[(&'static str, &'static str); 8]>;

/// Kind selector for get-or-create, carrying the construction parameters the
/// kind needs. Tags are passed separately.
#[derive(Debug, Clone)]
pub enum MetricSpec {
    Counter,
    MonotonicCounter,
    ExceptionCounter,
    Gauge,
    /// Bucket upper bounds, inclusive. `+Inf` is appended when absent.
    Histogram { buckets: Vec<f64> },
    /// Tick interval plus one smoothing window per requested rate.
    Meter {
        interval: Duration,
        windows: Vec<Duration>,
    },
}

impl MetricSpec {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricSpec::Counter => MetricKind::Counter,
            MetricSpec::MonotonicCounter => MetricKind::MonotonicCounter,
            MetricSpec::ExceptionCounter => MetricKind::ExceptionCounter,
            MetricSpec::Gauge => MetricKind::Gauge,
            MetricSpec::Histogram { .. } => MetricKind::Histogram,
            MetricSpec::Meter { .. } => MetricKind::Meter,
        }
    }
}

/// A kind-discriminated handle to any registered metric. Cloning is cheap and
/// aliases the same underlying state.
#[derive(Clone)]
pub enum AnyMetric {
    Counter(Counter),
    MonotonicCounter(MonotonicCounter),
    ExceptionCounter(ExceptionCounter),
    Gauge(Gauge),
    Histogram(Histogram),
    Meter(Meter),
}

impl AnyMetric {
    pub fn kind(&self) -> MetricKind {
        match self {
            AnyMetric::Counter(_) => MetricKind::Counter,
            AnyMetric::MonotonicCounter(_) => MetricKind::MonotonicCounter,
            AnyMetric::ExceptionCounter(_) => MetricKind::ExceptionCounter,
            AnyMetric::Gauge(_) => MetricKind::Gauge,
            AnyMetric::Histogram(_) => MetricKind::Histogram,
            AnyMetric::Meter(_) => MetricKind::Meter,
        }
    }

    /// Take an atomic snapshot of the current value.
    pub fn value(&self) -> MetricValue {
        match self {
            AnyMetric::Counter(m) => m.value(),
            AnyMetric::MonotonicCounter(m) => m.value(),
            AnyMetric::ExceptionCounter(m) => m.value(),
            AnyMetric::Gauge(m) => m.value(),
            AnyMetric::Histogram(m) => m.value(),
            AnyMetric::Meter(m) => m.value(),
        }
    }
}

impl Scoped for AnyMetric {
    fn enter(&self) {
        match self {
            AnyMetric::Counter(m) => m.enter(),
            AnyMetric::MonotonicCounter(m) => m.enter(),
            AnyMetric::ExceptionCounter(m) => m.enter(),
            AnyMetric::Gauge(m) => m.enter(),
            AnyMetric::Histogram(m) => m.enter(),
            AnyMetric::Meter(m) => m.enter(),
        }
    }

    fn exit(&self, outcome: Outcome) {
        match self {
            AnyMetric::Counter(m) => m.exit(outcome),
            AnyMetric::MonotonicCounter(m) => m.exit(outcome),
            AnyMetric::ExceptionCounter(m) => m.exit(outcome),
            AnyMetric::Gauge(m) => m.exit(outcome),
            AnyMetric::Histogram(m) => m.exit(outcome),
            AnyMetric::Meter(m) => m.exit(outcome),
        }
    }
}

/// A point-in-time copy of one registered metric, the serializer's input.
#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    pub name: &'static str,
    pub kind: MetricKind,
    /// Sorted by key.
    pub tags: TagSet,
    pub value: MetricValue,
}

struct MetricMetadata {
    name: &'static str,
    tags: TagSet,
    metric: AnyMetric,
}

/// Our string interning routine just leaks heap allocations and tracks them
/// in a [`HashSet`]. Entries live for the process lifetime, which matches the
/// registry's no-deletion contract.
#[derive(Default)]
struct Interner {
    inner: Mutex<HashSet<&'static str>>,
}

impl Interner {
    fn intern(&self, s: &str) -> &'static str {
        let mut inner = self.inner.lock();
        Self::intern_locked(&mut inner, s)
    }

    fn intern_tags(&self, tags: &[(&str, &str)]) -> TagSet {
        let mut inner = self.inner.lock();
        tags.iter()
            .map(|(k, v)| {
                (
                    Self::intern_locked(&mut inner, k),
                    Self::intern_locked(&mut inner, v),
                )
            })
            .collect()
    }

    fn intern_locked(inner: &mut HashSet<&'static str>, s: &str) -> &'static str {
        if let Some(&interned) = inner.get(s) {
            interned
        } else {
            let leaked: &'static str = Box::leak(String::from(s).into_boxed_str());
            inner.insert(leaked);
            leaked
        }
    }
}

/// Owns every metric instance, keyed by `(name, canonical tag-set)`. The
/// single source of truth exporters iterate.
///
/// There is deliberately no process-global instance: create one at startup
/// and thread it (or an `Arc` of it) through call sites.
#[derive(Default)]
pub struct Registry {
    metrics: DashMap<u64, MetricMetadata>,
    interner: Interner,
}

impl Registry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Calculate the metric-id used as the registry key.
    /// NOTE: tags **must** be sorted to get a stable mid.
    fn mid(name: &str, tags: &[(&'static str, &'static str)]) -> u64 {
        debug_assert!(tags.is_sorted());
        let mut hasher = XxHash64::with_seed(MID_SEED);
        name.hash(&mut hasher);
        tags.hash(&mut hasher);
        hasher.finish()
    }

    /// Resolve the metric registered under `(name, tags)`, creating it from
    /// `spec` on first use. Tag order does not matter: tag-sets are sorted
    /// and deduped before keying, so permutations collide to one instance.
    ///
    /// Racing callers on the same key resolve inside the map entry, at most
    /// one instance is ever created. An existing entry of a different kind is
    /// a [`Error::TypeConflict`] and is left untouched; construction
    /// parameters of an existing histogram or meter are not re-checked (first
    /// creation wins).
    pub fn get_or_create(
        &self,
        name: &str,
        spec: &MetricSpec,
        tags: &[(&str, &str)],
    ) -> Result<AnyMetric> {
        let name = self.interner.intern(name);
        let mut tags = self.interner.intern_tags(tags);
        tags.sort_unstable();
        tags.dedup();
        let mid = Self::mid(name, &tags);
        match self.metrics.entry(mid) {
            Entry::Occupied(entry) => {
                let existing = &entry.get().metric;
                if existing.kind() != spec.kind() {
                    return Err(Error::TypeConflict {
                        name: name.to_string(),
                        existing: existing.kind(),
                        requested: spec.kind(),
                    });
                }
                Ok(existing.clone())
            }
            Entry::Vacant(entry) => {
                let metric = Self::build(spec)?;
                tracing::debug!(name, kind = %metric.kind(), "registered metric");
                entry.insert(MetricMetadata {
                    name,
                    tags,
                    metric: metric.clone(),
                });
                Ok(metric)
            }
        }
    }

    fn build(spec: &MetricSpec) -> Result<AnyMetric> {
        Ok(match spec {
            MetricSpec::Counter => AnyMetric::Counter(Counter::new()),
            MetricSpec::MonotonicCounter => AnyMetric::MonotonicCounter(MonotonicCounter::new()),
            MetricSpec::ExceptionCounter => AnyMetric::ExceptionCounter(ExceptionCounter::new()),
            MetricSpec::Gauge => AnyMetric::Gauge(Gauge::new()),
            MetricSpec::Histogram { buckets } => AnyMetric::Histogram(Histogram::new(buckets)?),
            MetricSpec::Meter { interval, windows } => {
                AnyMetric::Meter(Meter::new(*interval, windows)?)
            }
        })
    }

    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> Result<Counter> {
        match self.get_or_create(name, &MetricSpec::Counter, tags)? {
            AnyMetric::Counter(metric) => Ok(metric),
            other => Err(Self::conflict(name, &other, MetricKind::Counter)),
        }
    }

    pub fn monotonic_counter(&self, name: &str, tags: &[(&str, &str)]) -> Result<MonotonicCounter> {
        match self.get_or_create(name, &MetricSpec::MonotonicCounter, tags)? {
            AnyMetric::MonotonicCounter(metric) => Ok(metric),
            other => Err(Self::conflict(name, &other, MetricKind::MonotonicCounter)),
        }
    }

    pub fn exception_counter(&self, name: &str, tags: &[(&str, &str)]) -> Result<ExceptionCounter> {
        match self.get_or_create(name, &MetricSpec::ExceptionCounter, tags)? {
            AnyMetric::ExceptionCounter(metric) => Ok(metric),
            other => Err(Self::conflict(name, &other, MetricKind::ExceptionCounter)),
        }
    }

    pub fn gauge(&self, name: &str, tags: &[(&str, &str)]) -> Result<Gauge> {
        match self.get_or_create(name, &MetricSpec::Gauge, tags)? {
            AnyMetric::Gauge(metric) => Ok(metric),
            other => Err(Self::conflict(name, &other, MetricKind::Gauge)),
        }
    }

    pub fn histogram(&self, name: &str, tags: &[(&str, &str)], buckets: &[f64]) -> Result<Histogram> {
        let spec = MetricSpec::Histogram {
            buckets: buckets.to_vec(),
        };
        match self.get_or_create(name, &spec, tags)? {
            AnyMetric::Histogram(metric) => Ok(metric),
            other => Err(Self::conflict(name, &other, MetricKind::Histogram)),
        }
    }

    pub fn meter(
        &self,
        name: &str,
        tags: &[(&str, &str)],
        interval: Duration,
        windows: &[Duration],
    ) -> Result<Meter> {
        let spec = MetricSpec::Meter {
            interval,
            windows: windows.to_vec(),
        };
        match self.get_or_create(name, &spec, tags)? {
            AnyMetric::Meter(metric) => Ok(metric),
            other => Err(Self::conflict(name, &other, MetricKind::Meter)),
        }
    }

    // get_or_create already kind-checks, so this arm is unreachable in
    // practice; surface it as the same conflict error rather than panicking.
    fn conflict(name: &str, existing: &AnyMetric, requested: MetricKind) -> Error {
        Error::TypeConflict {
            name: name.to_string(),
            existing: existing.kind(),
            requested,
        }
    }

    /// Resolve or create the metric, enter its scope, run `work`, and close
    /// the scope with the outcome of `work`'s result. The idiomatic surface
    /// for ad-hoc instrumentation: exception counters see an `Err` as an
    /// abnormal termination.
    ///
    /// The outer `Result` carries registration failures, the inner one is
    /// `work`'s own verbatim.
    pub fn with_tags<T, E>(
        &self,
        name: &str,
        spec: &MetricSpec,
        tags: &[(&str, &str)],
        work: impl FnOnce() -> std::result::Result<T, E>,
    ) -> Result<std::result::Result<T, E>> {
        let metric = self.get_or_create(name, spec, tags)?;
        let scope = metric.begin_scope();
        let result = work();
        match &result {
            Ok(_) => scope.close(Outcome::Success),
            Err(_) => scope.close(Outcome::Failure),
        }
        Ok(result)
    }

    /// Snapshot every registered metric, sorted by name then tags for stable
    /// exposition output.
    ///
    /// Iteration is weakly consistent: it does not block concurrent
    /// get-or-create, and a metric added mid-iteration may or may not appear.
    /// Each individual value is still an atomic copy under that metric's own
    /// lock, never torn.
    pub fn snapshot(&self) -> Vec<MetricSnapshot> {
        let mut snapshots: Vec<MetricSnapshot> = self
            .metrics
            .iter()
            .map(|entry| MetricSnapshot {
                name: entry.name,
                kind: entry.metric.kind(),
                tags: entry.tags.clone(),
                value: entry.metric.value(),
            })
            .collect();
        snapshots.sort_by(|a, b| a.name.cmp(b.name).then_with(|| a.tags.cmp(&b.tags)));
        snapshots
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
