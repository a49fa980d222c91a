//! Configuration models for the admission client and the scheduler.

pub mod admission;
pub mod env;
pub mod scheduler;

pub use admission::AdmissionConfig;
pub use scheduler::SchedulerConfig;
