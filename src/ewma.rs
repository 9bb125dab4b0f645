//! Exponentially-weighted moving average over a fixed tick interval.
//!
//! An [`Ewma`] accumulates a pending count between ticks and folds it into a
//! smoothed per-second rate on each [`update`](Ewma::update). It holds no lock
//! of its own: the owning [`Meter`](crate::Meter) serializes all access.

use std::time::Duration;

use crate::{Error, Result};

#[derive(Debug)]
pub struct Ewma {
    window: Duration,
    interval_secs: f64,
    alpha: f64,
    rate: Option<f64>,
    pending: f64,
}

impl Ewma {
    /// `interval` is the tick duration, `window` the smoothing horizon.
    /// `alpha = 1 - exp(-interval/window)`.
    pub fn new(interval: Duration, window: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidParameter("ewma interval must be positive"));
        }
        if window.is_zero() {
            return Err(Error::InvalidParameter("ewma window must be positive"));
        }
        let interval_secs = interval.as_secs_f64();
        let alpha = 1.0 - (-interval_secs / window.as_secs_f64()).exp();
        Ok(Self {
            window,
            interval_secs,
            alpha,
            rate: None,
            pending: 0.0,
        })
    }

    /// The smoothing window this average was created with.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Accumulate observations for the current tick.
    pub fn add(&mut self, value: f64) {
        self.pending += value;
    }

    /// Fold the pending count into the smoothed rate and reset it. Must be
    /// called at most once per elapsed interval; the owner enforces that.
    ///
    /// The first update seeds the rate from the instant rate directly. An
    /// update with nothing pending decays the rate toward zero by
    /// `1 - alpha`, it never freezes at the previous value.
    pub fn update(&mut self) {
        let instant = self.pending / self.interval_secs;
        self.rate = Some(match self.rate {
            Some(rate) => rate + self.alpha * (instant - rate),
            None => instant,
        });
        self.pending = 0.0;
    }

    /// The smoothed per-second rate, `None` until the first update.
    pub fn rate(&self) -> Option<f64> {
        self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_durations() {
        assert!(Ewma::new(Duration::ZERO, Duration::from_secs(60)).is_err());
        assert!(Ewma::new(Duration::from_secs(1), Duration::ZERO).is_err());
    }

    #[test]
    fn uninitialized_until_first_update() {
        let mut ewma = Ewma::new(Duration::from_secs(1), Duration::from_secs(60)).unwrap();
        assert_eq!(ewma.rate(), None);
        ewma.add(1.0);
        assert_eq!(ewma.rate(), None);
        ewma.update();
        assert_eq!(ewma.rate(), Some(1.0));
    }

    #[test]
    fn first_update_seeds_instant_rate() {
        let mut ewma = Ewma::new(Duration::from_secs(1), Duration::from_secs(60)).unwrap();
        ewma.add(60.0);
        ewma.update();
        assert_eq!(ewma.rate(), Some(60.0));
    }

    #[test]
    fn idle_updates_decay_toward_zero() {
        let mut ewma = Ewma::new(Duration::from_secs(1), Duration::from_secs(60)).unwrap();
        ewma.add(60.0);
        ewma.update();
        let seeded = ewma.rate().unwrap();

        ewma.update();
        let decayed = ewma.rate().unwrap();
        assert!(decayed > 0.0);
        assert!(decayed < seeded);

        // repeated idle ticks keep shrinking, never go negative
        let mut prev = decayed;
        for _ in 0..100 {
            ewma.update();
            let rate = ewma.rate().unwrap();
            assert!(rate >= 0.0);
            assert!(rate < prev);
            prev = rate;
        }
    }

    #[test]
    fn pending_resets_after_update() {
        let mut ewma = Ewma::new(Duration::from_secs(5), Duration::from_secs(60)).unwrap();
        ewma.add(10.0);
        ewma.update();
        assert_eq!(ewma.rate(), Some(2.0));
        // second tick saw no adds, the previous pending count must not leak in
        ewma.update();
        assert!(ewma.rate().unwrap() < 2.0);
    }
}
