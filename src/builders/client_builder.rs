//! Builder assembling an [`InstrumentedClient`] from [`AdmissionConfig`].

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AdmissionConfig;
use crate::core::coverage::coverage_filename;
use crate::core::{CallClassifier, ConfigError, InstrumentedClient, LeaseBackend, RpcClient};
use crate::infra::AdmissionClient;

/// Fluent builder for [`InstrumentedClient`].
pub struct InstrumentedClientBuilder<C> {
    inner: C,
    config: AdmissionConfig,
    backend: Option<Arc<dyn LeaseBackend>>,
    coverage_log: Option<PathBuf>,
}

impl<C> InstrumentedClientBuilder<C>
where
    C: RpcClient,
{
    /// Start from default configuration.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            config: AdmissionConfig::default(),
            backend: None,
            coverage_log: None,
        }
    }

    /// Use `config` for lease size, pairing, classifier overrides, and the
    /// scheduler endpoint.
    #[must_use]
    pub fn config(mut self, config: AdmissionConfig) -> Self {
        self.config = config;
        self
    }

    /// Lease through `backend` instead of a TCP client built from the config.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn LeaseBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Append successful operation names to `path`.
    #[must_use]
    pub fn coverage_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.coverage_log = Some(path.into());
        self
    }

    /// Log coverage to this process's file for node `node_index` in `dir`.
    #[must_use]
    pub fn coverage_dir(self, dir: impl Into<PathBuf>, node_index: usize) -> Self {
        let path = coverage_filename(&dir.into(), node_index);
        self.coverage_log(path)
    }

    /// Current configuration.
    pub const fn current_config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Validate the configuration and build the client.
    ///
    /// With `enabled = false` no backend is attached and heavy calls run
    /// without leases.
    ///
    /// # Errors
    ///
    /// Returns the validation error.
    pub fn build(self) -> Result<InstrumentedClient<C>, ConfigError> {
        self.config.validate()?;

        let mut classifier = CallClassifier::with_defaults();
        classifier.extend(self.config.overrides.clone());

        let mut client = InstrumentedClient::new(self.inner)
            .with_classifier(classifier)
            .with_lease_size(self.config.lease_size)
            .with_pairing(self.config.pairing);

        if self.config.enabled {
            let backend = self.backend.unwrap_or_else(|| {
                let tcp: Arc<dyn LeaseBackend> = Arc::new(AdmissionClient::from_config(&self.config));
                tcp
            });
            client = client.with_backend(backend);
        } else {
            tracing::info!("admission control disabled by configuration");
        }
        if let Some(path) = self.coverage_log {
            client = client.with_coverage_log(path);
        }
        Ok(client)
    }
}
