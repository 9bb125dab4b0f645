use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{MetricValue, Outcome, Scoped};
use crate::ewma::Ewma;
use crate::{Error, Result};

/// Wall-clock source injected into meters. Production code uses
/// [`SystemClock`]; tests drive decay deterministically with a manual one.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub(crate) struct MeterCore {
    clock: Arc<dyn Clock>,
    started: Instant,
    last_tick: Instant,
    interval: Duration,
    total: f64,
    mean: f64,
    windows: Vec<Ewma>,
}

impl MeterCore {
    pub(crate) fn new(
        interval: Duration,
        windows: &[Duration],
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidParameter("meter interval must be positive"));
        }
        if windows.is_empty() {
            return Err(Error::InvalidParameter("meter needs at least one window"));
        }
        let windows = windows
            .iter()
            .map(|window| Ewma::new(interval, *window))
            .collect::<Result<Vec<_>>>()?;
        let now = clock.now();
        Ok(Self {
            clock,
            started: now,
            last_tick: now,
            interval,
            total: 0.0,
            mean: 0.0,
            windows,
        })
    }

    /// Lazy tick: advance every EWMA once when more than one interval of wall
    /// time has elapsed since the last advance. There is no background timer;
    /// advancement only happens from `mark` and `value` calls. Intentional:
    /// an idle meter's rates only move when somebody looks at or touches it.
    pub(crate) fn update(&mut self) {
        let now = self.clock.now();
        if now.duration_since(self.last_tick) > self.interval {
            for window in &mut self.windows {
                window.update();
            }
            let elapsed = now.duration_since(self.started).as_secs_f64();
            if elapsed > 0.0 {
                self.mean = self.total / elapsed;
            }
            self.last_tick = now;
        }
    }

    pub(crate) fn mark(&mut self, value: f64) {
        self.update();
        self.total += value;
        for window in &mut self.windows {
            window.add(value);
        }
    }

    pub(crate) fn value(&mut self) -> MetricValue {
        self.update();
        MetricValue::Meter {
            windows: self
                .windows
                .iter()
                .map(|window| (window.window().as_secs_f64(), window.rate()))
                .collect(),
            mean: self.mean,
        }
    }
}

/// Composite rate meter: one [`Ewma`] per smoothing window plus a lifetime
/// mean (total count over wall time since creation).
#[derive(Clone)]
pub struct Meter {
    inner: Arc<Mutex<MeterCore>>,
}

impl Meter {
    pub(crate) fn new(interval: Duration, windows: &[Duration]) -> Result<Self> {
        Self::with_clock(interval, windows, Arc::new(SystemClock))
    }

    /// Build a meter reading wall time from `clock` instead of the system
    /// clock.
    pub fn with_clock(
        interval: Duration,
        windows: &[Duration],
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(MeterCore::new(interval, windows, clock)?)),
        })
    }

    /// Record `value` observations: ticks the windows if due, then adds to
    /// the running total and every window's pending count.
    pub fn mark_by(&self, value: f64) {
        self.inner.lock().mark(value);
    }

    pub fn mark(&self) {
        self.mark_by(1.0);
    }

    /// Snapshot of the window rates and lifetime mean. Ticks the windows
    /// first if an interval has elapsed, like [`mark_by`](Meter::mark_by).
    pub fn value(&self) -> MetricValue {
        self.inner.lock().value()
    }
}

impl Scoped for Meter {
    fn enter(&self) {}

    fn exit(&self, _outcome: Outcome) {}
}
