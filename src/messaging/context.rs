//! # Transport Context
//!
//! Explicit, shared registry of named transport endpoints. A pipeline builds
//! one context, binds its channels under symbolic names, and hands each
//! worker an `Arc` clone at construction. The context outlives the workers;
//! workers hold non-owning references. There is no process-global state.
//!
//! Two kinds of endpoint live here:
//!
//! - **job channels**: credit-based intake channels, claimed exclusively by
//!   one worker (`claim_intake`) and fed by one producer (`bind_job_channel`);
//! - **sinks**: plain one-way envelope streams used as routing targets, with
//!   any number of cloned senders and a single consumer.

use crate::error::{PipestageError, Result};
use crate::messaging::channel::{job_channel, JobFeed, JobIntake};
use crate::messaging::envelope::JobEnvelope;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// Shared endpoint registry for one pipeline
#[derive(Debug, Default)]
pub struct TransportContext {
    intakes: DashMap<String, Option<JobIntake>>,
    sinks: DashMap<String, mpsc::Sender<JobEnvelope>>,
}

impl TransportContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a credit-based job channel under `endpoint`, returning the
    /// producer-side feed. The worker-side intake stays registered until a
    /// worker claims it.
    pub fn bind_job_channel(&self, endpoint: &str, capacity: usize) -> Result<JobFeed> {
        match self.intakes.entry(endpoint.to_string()) {
            Entry::Occupied(_) => Err(PipestageError::Transport(format!(
                "job channel already bound: {endpoint}"
            ))),
            Entry::Vacant(slot) => {
                let (feed, intake) = job_channel(capacity);
                slot.insert(Some(intake));
                debug!(endpoint = %endpoint, "Bound job channel");
                Ok(feed)
            }
        }
    }

    /// Claim the worker side of a bound job channel. Each intake is owned by
    /// exactly one worker; a second claim is an error.
    pub fn claim_intake(&self, endpoint: &str) -> Result<JobIntake> {
        let mut slot = self.intakes.get_mut(endpoint).ok_or_else(|| {
            PipestageError::Transport(format!("unknown intake endpoint: {endpoint}"))
        })?;
        slot.value_mut().take().ok_or_else(|| {
            PipestageError::Transport(format!("intake endpoint already claimed: {endpoint}"))
        })
    }

    /// Open a sink endpoint under `name`, returning the consumer side.
    pub fn open_sink(&self, name: &str, capacity: usize) -> Result<mpsc::Receiver<JobEnvelope>> {
        match self.sinks.entry(name.to_string()) {
            Entry::Occupied(_) => Err(PipestageError::Transport(format!(
                "sink endpoint already open: {name}"
            ))),
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::channel(capacity.max(1));
                slot.insert(tx);
                debug!(endpoint = %name, "Opened sink endpoint");
                Ok(rx)
            }
        }
    }

    /// Resolve a sink endpoint to a cloneable send handle
    pub fn sink(&self, name: &str) -> Result<SendEndpoint> {
        self.sinks
            .get(name)
            .map(|tx| SendEndpoint {
                name: name.to_string(),
                tx: tx.clone(),
            })
            .ok_or_else(|| {
                PipestageError::Transport(format!("unknown sink endpoint: {name}"))
            })
    }
}

/// Cloneable send handle to a sink endpoint
#[derive(Debug, Clone)]
pub struct SendEndpoint {
    name: String,
    tx: mpsc::Sender<JobEnvelope>,
}

impl SendEndpoint {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deliver one payload to the sink, wrapped in a fresh envelope
    pub async fn send(&self, payload: &[u8]) -> Result<()> {
        self.tx
            .send(JobEnvelope::new(payload.to_vec()))
            .await
            .map_err(|_| {
                PipestageError::Transport(format!("sink endpoint closed: {}", self.name))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_bind_rejected() {
        let context = TransportContext::new();
        context.bind_job_channel("intake", 4).expect("first bind");
        let result = context.bind_job_channel("intake", 4);
        assert!(matches!(result, Err(PipestageError::Transport(_))));
    }

    #[test]
    fn test_intake_claimed_exactly_once() {
        let context = TransportContext::new();
        let _feed = context.bind_job_channel("intake", 4).expect("bind");

        assert!(context.claim_intake("intake").is_ok());
        assert!(matches!(
            context.claim_intake("intake"),
            Err(PipestageError::Transport(_))
        ));
        assert!(matches!(
            context.claim_intake("never_bound"),
            Err(PipestageError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_sink_round_trip() {
        let context = TransportContext::new();
        let mut rx = context.open_sink("downstream", 4).expect("open");

        let endpoint = context.sink("downstream").expect("resolve");
        endpoint.send(b"routed").await.expect("send");

        let envelope = rx.recv().await.expect("receive");
        assert_eq!(envelope.payload(), b"routed");
    }

    #[test]
    fn test_unknown_sink_rejected() {
        let context = TransportContext::new();
        assert!(matches!(
            context.sink("missing"),
            Err(PipestageError::Transport(_))
        ));
    }
}
