//! # Destination Router
//!
//! Resolves a symbolic destination name to one or more transport endpoints
//! and performs the send. `None` as destination means "use the configured
//! default downstream target". A single symbolic name may fan a send to
//! several endpoints; that wiring is configuration, opaque to the worker.

use crate::config::StageConfig;
use crate::error::{PipestageError, Result};
use crate::messaging::{SendEndpoint, TransportContext};
use std::collections::HashMap;
use tracing::debug;

/// Routing table held by each stage worker
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: HashMap<String, Vec<SendEndpoint>>,
    default_route: Option<String>,
}

impl Router {
    pub fn new(default_route: Option<String>) -> Self {
        Self {
            routes: HashMap::new(),
            default_route,
        }
    }

    /// Add an endpoint under a symbolic destination name
    pub fn add_route(&mut self, name: impl Into<String>, endpoint: SendEndpoint) {
        self.routes.entry(name.into()).or_default().push(endpoint);
    }

    /// Build a router from configuration, resolving every named endpoint
    /// against the transport context. Fails if the default route names a
    /// missing table entry or an endpoint is unknown.
    pub fn from_config(context: &TransportContext, config: &StageConfig) -> Result<Self> {
        if let Some(default) = &config.default_route {
            if !config.routes.contains_key(default) {
                return Err(PipestageError::Configuration(format!(
                    "default route '{default}' has no routing table entry"
                )));
            }
        }

        let mut router = Self::new(config.default_route.clone());
        for (name, endpoints) in &config.routes {
            for endpoint_name in endpoints {
                router.add_route(name.clone(), context.sink(endpoint_name)?);
            }
        }
        Ok(router)
    }

    /// Send one payload to a destination. Resolution order: explicit selector,
    /// else the default downstream target. Sends to multi-endpoint routes
    /// complete in registration order before this call returns.
    pub async fn send(&self, payload: &[u8], destination: Option<&str>) -> Result<()> {
        let name = match destination {
            Some(name) => name,
            None => self.default_route.as_deref().ok_or_else(|| {
                PipestageError::Configuration(
                    "no destination given and no default route configured".to_string(),
                )
            })?,
        };

        let endpoints = self.routes.get(name).ok_or_else(|| {
            PipestageError::Transport(format!("no route for destination: {name}"))
        })?;

        for endpoint in endpoints {
            endpoint.send(payload).await?;
        }

        debug!(
            destination = %name,
            endpoints = endpoints.len(),
            bytes = payload.len(),
            "Routed payload"
        );
        Ok(())
    }

    pub fn default_route(&self) -> Option<&str> {
        self.default_route.as_deref()
    }
}
