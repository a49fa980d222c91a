//! Lease protocol, call classification, instrumented calls, and the core
//! pool served by the scheduler.

pub mod audit;
pub mod backend;
pub mod classifier;
pub mod coverage;
pub mod error;
pub mod pool;
pub mod protocol;
pub mod rpc;
pub mod scheduler;
pub mod wrapper;

pub use audit::{build_lease_event, AuditAction, InMemoryLeaseAudit, LeaseAuditSink, LeaseEvent};
pub use backend::LeaseBackend;
pub use classifier::{CallClass, CallClassifier};
pub use coverage::{coverage_filename, write_all_rpc_commands, CoverageLog};
pub use error::{AdmissionError, AppResult, ConfigError, CoverageError, RpcError};
pub use pool::{CorePool, PoolSnapshot};
pub use protocol::{LeaseAction, LeaseRequest};
pub use rpc::{operation_id, OperationOutcome, RpcClient};
pub use scheduler::{Scheduler, Spawn};
pub use wrapper::{InstrumentedClient, LeaseGuard, OutstandingLease, PairingPolicy};
