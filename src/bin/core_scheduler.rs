//! Core scheduler process.
//!
//! Configured through `SCHEDULER_*` environment variables (see
//! `SchedulerConfig::from_env`); stops on Ctrl-C.

use std::sync::Arc;

use admission_lease::config::SchedulerConfig;
use admission_lease::core::{AppResult, Scheduler};
use admission_lease::runtime::TokioSpawner;
use admission_lease::util::init_tracing;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> AppResult<()> {
    init_tracing();

    let config = SchedulerConfig::from_env()?;
    let listener = TcpListener::bind(config.bind_addr()).await?;
    let scheduler = Arc::new(Scheduler::from_config(&config));

    scheduler
        .serve_until(listener, TokioSpawner::current(), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c; serving until killed");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
