//! Builders to construct instrumented clients from configuration.

pub mod client_builder;

pub use client_builder::InstrumentedClientBuilder;
