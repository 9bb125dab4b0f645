//! Push exporter: a background loop that serializes the registry on a fixed
//! interval and PUTs it to a remote collector.
//!
//! Delivery is at-most-once per tick. A transient network failure drops that
//! tick's payload, the transport reconnects, and the next tick pushes a fresh
//! snapshot; nothing is buffered or replayed. Only a fatal (malformed
//! destination) error stops the loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::registry::Registry;
use crate::{wire, Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivery seam for the push loop, so the loop's retry behavior can be
/// exercised without a network.
pub trait Transport: Send {
    /// Deliver one serialized payload. [`Error::TransientTransport`] means
    /// "drop it and try again next tick with a fresh connection";
    /// [`Error::FatalTransport`] terminates the loop.
    fn push(&mut self, body: Vec<u8>) -> impl Future<Output = Result<()>> + Send;
}

/// PUT-based transport speaking `http://<host>/metrics/jobs/<job>`.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: reqwest::Url,
    timeout: Duration,
}

impl HttpTransport {
    /// Fails with [`Error::FatalTransport`] when the destination does not
    /// form a valid URL.
    pub fn new(host: &str, job: &str, timeout: Duration) -> Result<Self> {
        let raw = format!("http://{host}/metrics/jobs/{job}");
        let url = reqwest::Url::parse(&raw)
            .map_err(|err| Error::FatalTransport(format!("{raw}: {err}")))?;
        Ok(Self {
            client: Self::client(timeout)?,
            url,
            timeout,
        })
    }

    fn client(timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::FatalTransport(err.to_string()))
    }
}

impl Transport for HttpTransport {
    async fn push(&mut self, body: Vec<u8>) -> Result<()> {
        match self.client.put(self.url.clone()).body(body).send().await {
            Ok(response) => {
                // read and discard so the connection is freed for reuse; the
                // response itself is not interpreted
                let _ = response.bytes().await;
                Ok(())
            }
            Err(err) => {
                // swap in a fresh client so the next tick reconnects instead
                // of reusing a broken pooled connection
                self.client = Self::client(self.timeout)?;
                Err(Error::TransientTransport(Box::new(err)))
            }
        }
    }
}

/// The background push loop. Construct, then `tokio::spawn(exporter.run())`.
pub struct PushExporter<T = HttpTransport> {
    registry: Arc<Registry>,
    transport: T,
    interval: Duration,
}

impl PushExporter<HttpTransport> {
    /// Push `registry` to `http://<host>/metrics/jobs/<job>` every
    /// `interval`, with a default per-request timeout.
    pub fn new(registry: Arc<Registry>, host: &str, job: &str, interval: Duration) -> Result<Self> {
        Ok(Self::with_transport(
            registry,
            HttpTransport::new(host, job, DEFAULT_TIMEOUT)?,
            interval,
        ))
    }
}

impl<T: Transport> PushExporter<T> {
    pub fn with_transport(registry: Arc<Registry>, transport: T, interval: Duration) -> Self {
        Self {
            registry,
            transport,
            interval,
        }
    }

    /// Run until a fatal transport error, which is returned. Transient
    /// failures are logged and the loop keeps going.
    pub async fn run(mut self) -> Error {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            let body = wire::serialize(&self.registry.snapshot()).into_bytes();
            match self.transport.push(body).await {
                Ok(()) => tracing::trace!("pushed metrics"),
                Err(err) if err.is_fatal() => {
                    tracing::error!(error = %err, "push destination unusable, stopping exporter");
                    return err;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "push failed, payload dropped until next tick");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Plays back a scripted sequence of push results while recording every
    /// attempted payload.
    struct ScriptedTransport {
        script: VecDeque<Result<()>>,
        attempts: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl Transport for ScriptedTransport {
        async fn push(&mut self, body: Vec<u8>) -> Result<()> {
            self.attempts.lock().unwrap().push(body);
            self.script
                .pop_front()
                .unwrap_or_else(|| Err(Error::FatalTransport("script exhausted".to_string())))
        }
    }

    fn transient() -> Error {
        Error::TransientTransport("connection reset".into())
    }

    #[tokio::test]
    async fn transient_errors_drop_payload_and_continue() {
        let registry = Arc::new(Registry::new());
        registry.monotonic_counter("ticks", &[]).unwrap().inc();

        let attempts = Arc::new(Mutex::new(Vec::new()));
        let transport = ScriptedTransport {
            script: VecDeque::from([
                Ok(()),
                Err(transient()),
                Ok(()),
                Err(Error::FatalTransport("done".to_string())),
            ]),
            attempts: attempts.clone(),
        };
        let exporter =
            PushExporter::with_transport(registry, transport, Duration::from_millis(1));

        let err = tokio::time::timeout(Duration::from_secs(5), exporter.run())
            .await
            .expect("loop should reach the scripted fatal error");
        assert!(err.is_fatal());

        // the transient failure on tick 2 did not stop ticks 3 and 4, and
        // every tick carried a fresh serialization
        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), 4);
        for body in attempts.iter() {
            assert!(std::str::from_utf8(body).unwrap().contains("ticks 1\n"));
        }
    }

    #[tokio::test]
    async fn fatal_error_stops_the_loop() {
        let registry = Arc::new(Registry::new());
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let transport = ScriptedTransport {
            script: VecDeque::from([Err(Error::FatalTransport("bad destination".to_string()))]),
            attempts: attempts.clone(),
        };
        let exporter =
            PushExporter::with_transport(registry, transport, Duration::from_millis(1));

        let err = tokio::time::timeout(Duration::from_secs(5), exporter.run())
            .await
            .expect("loop should stop on the first tick");
        assert!(err.is_fatal());
        assert_eq!(attempts.lock().unwrap().len(), 1);
    }

    #[test]
    fn malformed_destination_is_fatal_at_construction() {
        let err = HttpTransport::new("not a host", "job", DEFAULT_TIMEOUT).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn well_formed_destination_builds() {
        let transport =
            HttpTransport::new("collector.internal:9091", "web", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            transport.url.as_str(),
            "http://collector.internal:9091/metrics/jobs/web"
        );
    }
}
