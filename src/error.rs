use thiserror::Error;

use crate::metrics::MetricKind;

/// Shared result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for construction, registration, and push transport.
#[derive(Debug, Error)]
pub enum Error {
    /// A construction parameter failed validation (non-positive interval or
    /// window, empty bucket list, ...). Always surfaced synchronously.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// A get-or-create hit an existing metric of a different kind under the
    /// same name and tag-set. The existing entry is left untouched.
    #[error("metric {name:?} is registered as {existing}, requested {requested}")]
    TypeConflict {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },

    /// A push attempt failed for network reasons. The payload is dropped and
    /// the loop continues with a fresh connection on the next tick.
    #[error("transient transport error: {0}")]
    TransientTransport(Box<dyn std::error::Error + Send + Sync>),

    /// The push destination is unusable (malformed URL). Terminates the push
    /// loop instead of retrying forever.
    #[error("fatal transport error: {0}")]
    FatalTransport(String),
}

impl Error {
    /// True for errors the push loop must not retry past.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::FatalTransport(_))
    }
}
