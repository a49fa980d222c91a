//! # Admission Lease
//!
//! Admission control for fleets of concurrent test processes driving a node
//! over RPC.
//!
//! Some RPC operations are expensive enough that running many of them at
//! once starves the machine. Before issuing one, a test process leases a
//! number of abstract "cores" from a shared scheduler and returns them once
//! the work is done. This crate provides both ends of that exchange.
//!
//! ## Components
//!
//! - **Wire protocol** (`core::protocol`): `"<count>,A[,<tag>]"` and
//!   `"<count>,R"`, one request per TCP connection.
//! - **Admission client** (`infra::lease::AdmissionClient`): stateless
//!   round-trips with a bounded wait and bounded connect retries.
//! - **Call classifier** (`core::classifier`): plain, sync-heavy,
//!   async-heavy, or poll.
//! - **Instrumented client** (`core::wrapper::InstrumentedClient`): wraps any
//!   [`core::RpcClient`], leases around heavy calls, hands async leases to
//!   the poll that observes completion, and writes coverage logs.
//! - **Scheduler** (`core::scheduler::Scheduler`): a bounded core counter
//!   served over TCP; acquirers park until capacity is released.
//!
//! ## Lease lifecycle
//!
//! | Path | Acquire | Relinquish |
//! |---|---|---|
//! | plain call | no | no |
//! | sync-heavy call | before | after, success or failure |
//! | async-heavy call fails | before | immediately |
//! | async-heavy call succeeds | before | when a poll reports completion |
//! | poll with results | no | one outstanding async lease |
//!
//! If the scheduler is unreachable the call still runs (advisory mode) and a
//! warning is logged.
//!
//! ```rust,ignore
//! use admission_lease::builders::InstrumentedClientBuilder;
//! use admission_lease::config::AdmissionConfig;
//!
//! let client = InstrumentedClientBuilder::new(node_rpc)
//!     .config(AdmissionConfig::from_env()?)
//!     .coverage_dir("/tmp/coverage", 0)
//!     .build()?;
//!
//! let opid = client.invoke("z_shieldcoinbase", &params).await?;
//! let outcome = client
//!     .wait_for_operation(opid.as_str().unwrap_or_default(), 300, Duration::from_secs(1))
//!     .await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Lease protocol, classification, instrumented calls, and the scheduler.
pub mod core;
/// Configuration models for the client and the scheduler.
pub mod config;
/// Builders to construct instrumented clients from configuration.
pub mod builders;
/// Infrastructure adapters reaching the scheduler.
pub mod infra;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;
