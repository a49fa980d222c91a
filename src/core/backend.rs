//! Transport-independent view of the scheduler.

use async_trait::async_trait;

use crate::core::AdmissionError;

/// Something that can grant and take back cores.
///
/// Both calls are blocking round-trips: they return only after the
/// scheduler has applied the request, or with an error.
#[async_trait]
pub trait LeaseBackend: Send + Sync {
    /// Take `count` cores, tagged with the operation name when known.
    async fn acquire(&self, count: u32, tag: Option<&str>) -> Result<(), AdmissionError>;

    /// Return `count` cores.
    async fn relinquish(&self, count: u32) -> Result<(), AdmissionError>;

    /// Human-readable location used in log lines.
    fn endpoint(&self) -> String;
}
