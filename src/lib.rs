//! meterbank: tagged in-process metrics with Prometheus text exposition.
//!
//! Application code records counters, gauges, exception tallies, histograms,
//! and rate meters under a [`Registry`] keyed by `(name, tag-set)`; exporters
//! serialize the registry into the text exposition format and either serve it
//! over HTTP ([`export::pull`]) or push it to a remote collector on a fixed
//! interval ([`export::push`]).
//!
//! ```no_run
//! use std::sync::Arc;
//! use meterbank::{MetricSpec, Registry};
//!
//! # fn handle() -> Result<(), std::io::Error> { Ok(()) }
//! # fn main() -> meterbank::Result<()> {
//! let registry = Arc::new(Registry::new());
//!
//! // long-lived handle, registered once
//! let requests = registry.monotonic_counter("requests", &[("method", "GET")])?;
//! requests.inc();
//!
//! // ad-hoc scoped instrumentation; an Err counts as an abnormal termination
//! let outcome = registry.with_tags(
//!     "handler_errors",
//!     &MetricSpec::ExceptionCounter,
//!     &[("method", "GET")],
//!     || handle(),
//! )?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```
//!
//! There is no global registry: create one at startup and thread it through
//! call sites, handing exporters an `Arc` of it.

mod error;
mod ewma;
mod metrics;
mod registry;

pub mod export;
pub mod wire;

pub use error::{Error, Result};
pub use ewma::Ewma;
pub use metrics::counter::{Counter, ExceptionCounter, MonotonicCounter, WeightedCount};
pub use metrics::gauge::Gauge;
pub use metrics::histogram::Histogram;
pub use metrics::local::{
    LocalCounter, LocalExceptionCounter, LocalGauge, LocalHistogram, LocalMeter,
    LocalMonotonicCounter,
};
pub use metrics::meter::{Clock, Meter, SystemClock};
pub use metrics::{MetricKind, MetricValue, Outcome, Scope, Scoped, ScopedExt};
pub use registry::{AnyMetric, MetricSnapshot, MetricSpec, Registry, TagSet};
