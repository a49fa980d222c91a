//! Lease backends: the TCP admission client and an in-process pool.

pub mod memory;
pub mod tcp;

pub use memory::InMemoryLeaseBackend;
pub use tcp::AdmissionClient;
