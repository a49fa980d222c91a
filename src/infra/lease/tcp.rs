//! TCP admission client.
//!
//! Every acquire and relinquish opens a fresh connection, writes one
//! request, waits for the acknowledgment, and closes. Connect failures are
//! retried with exponential backoff because nothing has reached the
//! scheduler yet. Once a request has been written it is never resent, so a
//! timeout cannot turn into a double acquire.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::AdmissionConfig;
use crate::core::protocol::{LeaseRequest, MAX_ACK_BYTES};
use crate::core::{AdmissionError, LeaseBackend};

/// Stateless client for the core scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionClient {
    endpoint: String,
    timeout: Duration,
    max_attempts: u32,
    backoff: Duration,
}

impl AdmissionClient {
    /// Client for `endpoint` (`host:port`) with one connect attempt.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Client configured from [`AdmissionConfig`].
    #[must_use]
    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(config.endpoint(), config.timeout())
            .with_retry(config.max_attempts, config.backoff())
    }

    /// Retry failed connects up to `max_attempts` in total, waiting
    /// `backoff`, `2 * backoff`, ... in between.
    #[must_use]
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Scheduler endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Lease `count` cores, tagged with the operation name.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::SchedulerUnreachable`] when no connection could be
    /// made, [`AdmissionError::SchedulerTimeout`] when no acknowledgment
    /// arrived in time.
    pub async fn acquire(&self, count: u32, tag: Option<&str>) -> Result<(), AdmissionError> {
        self.exchange(&LeaseRequest::acquire(count, tag)).await
    }

    /// Return `count` cores.
    ///
    /// # Errors
    ///
    /// Same as [`acquire`](Self::acquire).
    pub async fn relinquish(&self, count: u32) -> Result<(), AdmissionError> {
        self.exchange(&LeaseRequest::relinquish(count)).await
    }

    async fn connect(&self) -> Result<TcpStream, AdmissionError> {
        let mut delay = self.backoff;
        let mut attempt = 1;
        loop {
            let err = match tokio::time::timeout(self.timeout, TcpStream::connect(&self.endpoint)).await {
                Ok(Ok(stream)) => return Ok(stream),
                Ok(Err(e)) => e,
                Err(_) => std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
            };
            if attempt >= self.max_attempts {
                return Err(AdmissionError::SchedulerUnreachable {
                    endpoint: self.endpoint.clone(),
                    source: err,
                });
            }
            tracing::debug!(
                endpoint = %self.endpoint,
                attempt,
                error = %err,
                "scheduler connect failed, retrying"
            );
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
            attempt += 1;
        }
    }

    async fn exchange(&self, request: &LeaseRequest) -> Result<(), AdmissionError> {
        let mut stream = self.connect().await?;
        let message = request.encode();
        tracing::debug!(endpoint = %self.endpoint, message = %message, "sending lease request");

        let exchange = async {
            stream.write_all(message.as_bytes()).await?;
            stream.flush().await?;
            let mut ack = [0u8; MAX_ACK_BYTES];
            let n = stream.read(&mut ack).await?;
            Ok::<usize, std::io::Error>(n)
        };
        let read = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(read) => read?,
            Err(_) => {
                return Err(AdmissionError::SchedulerTimeout {
                    endpoint: self.endpoint.clone(),
                    after: self.timeout,
                })
            }
        };
        tracing::debug!(endpoint = %self.endpoint, ack_bytes = read, "lease request acknowledged");
        Ok(())
    }
}

#[async_trait]
impl LeaseBackend for AdmissionClient {
    async fn acquire(&self, count: u32, tag: Option<&str>) -> Result<(), AdmissionError> {
        Self::acquire(self, count, tag).await
    }

    async fn relinquish(&self, count: u32) -> Result<(), AdmissionError> {
        Self::relinquish(self, count).await
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}
