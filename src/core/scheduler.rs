//! Core scheduler server.
//!
//! Accepts one lease request per connection, applies it to a shared
//! [`CorePool`], and only then writes the acknowledgment. An acquire that
//! cannot be satisfied parks the connection until cores are released or the
//! client hangs up.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::SchedulerConfig;
use crate::core::audit::{build_lease_event, AuditAction, InMemoryLeaseAudit, LeaseAuditSink};
use crate::core::protocol::{LeaseAction, LeaseRequest, ACK, MAX_REQUEST_BYTES};
use crate::core::{AdmissionError, CorePool, PoolSnapshot};

/// Abstraction for spawning connection handlers on a runtime.
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Scheduler owning the shared core pool.
pub struct Scheduler {
    pool: Arc<CorePool>,
    audit: Option<Arc<Mutex<dyn LeaseAuditSink>>>,
}

impl Scheduler {
    /// Create a scheduler with `max_cores` of capacity and no audit sink.
    #[must_use]
    pub fn new(max_cores: u32) -> Self {
        Self {
            pool: Arc::new(CorePool::new(max_cores)),
            audit: None,
        }
    }

    /// Create a scheduler from configuration, with an in-memory audit trail
    /// when `audit_capacity` is non-zero.
    #[must_use]
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let scheduler = Self::new(config.max_cores);
        if config.audit_capacity == 0 {
            return scheduler;
        }
        scheduler.with_audit(Arc::new(Mutex::new(InMemoryLeaseAudit::new(
            config.audit_capacity,
        ))))
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit<A>(mut self, audit: Arc<Mutex<A>>) -> Self
    where
        A: LeaseAuditSink + 'static,
    {
        let audit: Arc<Mutex<dyn LeaseAuditSink>> = audit;
        self.audit = Some(audit);
        self
    }

    /// Shared pool handle.
    #[must_use]
    pub fn pool(&self) -> Arc<CorePool> {
        Arc::clone(&self.pool)
    }

    /// Current pool counters.
    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        self.pool.snapshot()
    }

    /// Accept connections forever, handling each on `spawner`.
    ///
    /// # Errors
    ///
    /// Returns the accept error that stopped the loop.
    pub async fn serve<S>(self: Arc<Self>, listener: TcpListener, spawner: S) -> std::io::Result<()>
    where
        S: Spawn,
    {
        let local = listener.local_addr()?;
        tracing::info!(%local, max_cores = self.pool.max_cores(), "core scheduler listening");
        loop {
            let (stream, peer) = listener.accept().await?;
            let this = Arc::clone(&self);
            spawner.spawn(async move {
                if let Err(e) = this.handle_connection(stream, peer).await {
                    tracing::warn!(%peer, error = %e, "lease connection failed");
                }
            });
        }
    }

    /// Serve until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an accept error if one stops the loop first.
    pub async fn serve_until<S, F>(
        self: Arc<Self>,
        listener: TcpListener,
        spawner: S,
        shutdown: F,
    ) -> std::io::Result<()>
    where
        S: Spawn,
        F: Future<Output = ()>,
    {
        tokio::select! {
            res = self.serve(listener, spawner) => res,
            () = shutdown => {
                tracing::info!("core scheduler shutting down");
                Ok(())
            }
        }
    }

    /// Handle a single request/acknowledgment exchange.
    async fn handle_connection(
        &self,
        mut stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<(), AdmissionError> {
        let mut buf = [0u8; MAX_REQUEST_BYTES];
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            tracing::debug!(%peer, "connection closed before a request arrived");
            return Ok(());
        }
        let text = std::str::from_utf8(&buf[..n])
            .map_err(|e| AdmissionError::MalformedRequest(e.to_string()))?;
        let request = LeaseRequest::parse(text)?;
        tracing::debug!(%peer, request = %request, "lease request");

        let peer_label = Some(peer.to_string());
        match request.action {
            LeaseAction::Acquire => {
                let granted = tokio::select! {
                    biased;
                    () = wait_for_hangup(&mut stream) => false,
                    () = self.pool.acquire(request.count) => true,
                };
                if !granted {
                    tracing::info!(%peer, count = request.count, "client left while parked");
                    self.record(AuditAction::Abandoned, &request, peer_label);
                    return Ok(());
                }
                // A closed peer still accepts the ack write, so check before it.
                if peer_closed(&stream) {
                    self.pool.release(request.count);
                    tracing::info!(
                        %peer,
                        count = request.count,
                        "client left before the ack; grant rolled back"
                    );
                    self.record(AuditAction::RolledBack, &request, peer_label);
                    return Ok(());
                }
                tracing::info!(
                    %peer,
                    count = request.count,
                    tag = request.tag.as_deref().unwrap_or(""),
                    in_use = self.pool.snapshot().in_use,
                    "cores granted"
                );
                self.record(AuditAction::Grant, &request, peer_label.clone());
                if let Err(e) = acknowledge(&mut stream).await {
                    self.pool.release(request.count);
                    self.record(AuditAction::RolledBack, &request, peer_label);
                    return Err(e);
                }
            }
            LeaseAction::Relinquish => {
                let action = if self.pool.release(request.count) {
                    AuditAction::Release
                } else {
                    AuditAction::UnmatchedRelease
                };
                self.record(action, &request, peer_label);
                tracing::info!(%peer, count = request.count, "cores released");
                acknowledge(&mut stream).await?;
            }
        }
        Ok(())
    }

    fn record(&self, action: AuditAction, request: &LeaseRequest, peer: Option<String>) {
        if let Some(audit) = &self.audit {
            audit.lock().record(build_lease_event(
                action,
                request.count,
                request.tag.as_deref(),
                peer,
            ));
        }
    }
}

async fn acknowledge(stream: &mut TcpStream) -> Result<(), AdmissionError> {
    stream.write_all(ACK).await?;
    stream.flush().await?;
    Ok(())
}

/// Whether the client has already closed its side, checked without waiting.
///
/// The check peeks through a duplicate of the socket so it sees the kernel
/// state rather than the runtime's cached readiness. A client that
/// half-closes before reading the ack counts as gone.
#[cfg(unix)]
fn peer_closed(stream: &TcpStream) -> bool {
    use std::os::fd::AsFd;

    let Ok(fd) = stream.as_fd().try_clone_to_owned() else {
        return false;
    };
    let dup = std::net::TcpStream::from(fd);
    let mut byte = [0u8; 1];
    match dup.peek(&mut byte) {
        Ok(0) => true,
        Ok(_) => false,
        Err(e) => e.kind() != std::io::ErrorKind::WouldBlock,
    }
}

#[cfg(not(unix))]
fn peer_closed(stream: &TcpStream) -> bool {
    let mut byte = [0u8; 1];
    matches!(stream.try_read(&mut byte), Ok(0))
}

/// Resolves once the client closes its side of the connection.
async fn wait_for_hangup(stream: &mut TcpStream) {
    let mut scratch = [0u8; 64];
    loop {
        match stream.read(&mut scratch).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}
