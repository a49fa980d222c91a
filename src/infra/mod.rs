//! Infrastructure adapters for reaching the core scheduler.

pub mod lease;

pub use lease::{AdmissionClient, InMemoryLeaseBackend};
