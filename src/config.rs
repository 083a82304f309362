//! # Stage Configuration
//!
//! Construction-time configuration for a stage worker: identity, intake
//! endpoint, routing table, and polling behavior. Environment overrides
//! follow the `PIPESTAGE_*` convention.

use crate::constants::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_INTAKE_ENDPOINT, DEFAULT_POLL_TIMEOUT_MS, DEFAULT_STAGE_NAME,
};
use crate::error::{PipestageError, Result};
use std::collections::HashMap;

/// Configuration for a single stage worker
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Stage name, used for status reporting only (never routing)
    pub stage_name: String,
    /// Endpoint identifier of the inbound job channel
    pub intake_endpoint: String,
    /// Monitoring endpoint; `None` makes status publication a no-op
    pub monitoring_endpoint: Option<String>,
    /// Routing table: symbolic destination name -> sink endpoint names.
    /// A single name may fan out to several endpoints.
    pub routes: HashMap<String, Vec<String>>,
    /// Which routing entry is the default downstream target
    pub default_route: Option<String>,
    /// Bounded intake poll timeout in milliseconds
    pub poll_timeout_ms: u64,
    /// Buffer size for job and credit channels
    pub channel_capacity: usize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            stage_name: DEFAULT_STAGE_NAME.to_string(),
            intake_endpoint: DEFAULT_INTAKE_ENDPOINT.to_string(),
            monitoring_endpoint: None,
            routes: HashMap::new(),
            default_route: None,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl StageConfig {
    /// Build configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("PIPESTAGE_STAGE_NAME") {
            if !name.is_empty() {
                config.stage_name = name;
            }
        }

        if let Ok(endpoint) = std::env::var("PIPESTAGE_INTAKE_ENDPOINT") {
            config.intake_endpoint = endpoint;
        }

        if let Ok(monitoring) = std::env::var("PIPESTAGE_MONITORING_ENDPOINT") {
            config.monitoring_endpoint = Some(monitoring);
        }

        if let Ok(timeout) = std::env::var("PIPESTAGE_POLL_TIMEOUT_MS") {
            config.poll_timeout_ms = timeout.parse().map_err(|e| {
                PipestageError::Configuration(format!("Invalid poll_timeout_ms: {e}"))
            })?;
        }

        if let Ok(capacity) = std::env::var("PIPESTAGE_CHANNEL_CAPACITY") {
            config.channel_capacity = capacity.parse().map_err(|e| {
                PipestageError::Configuration(format!("Invalid channel_capacity: {e}"))
            })?;
        }

        Ok(config)
    }

    /// Add a routing entry mapping a symbolic name to one or more sink endpoints
    pub fn with_route(
        mut self,
        name: impl Into<String>,
        endpoints: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.routes.insert(
            name.into(),
            endpoints.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Designate which routing entry is the default downstream target
    pub fn with_default_route(mut self, name: impl Into<String>) -> Self {
        self.default_route = Some(name.into());
        self
    }

    /// Set the monitoring endpoint; absent, status publication is a no-op
    pub fn with_monitoring_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.monitoring_endpoint = Some(endpoint.into());
        self
    }
}
