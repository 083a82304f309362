//! # Status Publication
//!
//! Fire-and-forget status events for monitoring consumers. A worker publishes
//! one event on every `running` transition; delivery is best-effort with no
//! acknowledgment, and a publish failure must never abort the job loop. With
//! no monitoring endpoint configured, publication is a no-op.

use crate::config::StageConfig;
use crate::constants::STATUS_TOPIC;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// One stage status transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Stage identity name
    pub name: String,
    /// New running state: true at job start, false at job completion
    pub running: bool,
    /// Reserved for future payloads; always `None` today
    pub reserved: Option<serde_json::Value>,
}

impl StatusEvent {
    pub fn new(name: impl Into<String>, running: bool) -> Self {
        Self {
            name: name.into(),
            running,
            reserved: None,
        }
    }
}

/// Best-effort publisher handle owned by each worker
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    tx: Option<mpsc::Sender<StatusEvent>>,
}

impl StatusPublisher {
    /// Create a publisher and its subscriber end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StatusEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// Publisher with no monitoring target: every publish is a no-op
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Build from configuration: a live channel when a monitoring endpoint
    /// is configured, otherwise the no-op publisher.
    pub fn from_config(config: &StageConfig) -> (Self, Option<mpsc::Receiver<StatusEvent>>) {
        match &config.monitoring_endpoint {
            Some(endpoint) => {
                debug!(monitoring_endpoint = %endpoint, "Binding status channel");
                let (publisher, rx) = Self::channel(config.channel_capacity);
                (publisher, Some(rx))
            }
            None => (Self::disabled(), None),
        }
    }

    /// Publish one event. Never blocks and never fails the caller: a full
    /// or closed channel drops the event.
    pub fn publish(&self, event: StatusEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(event) {
            debug!(topic = STATUS_TOPIC, error = %e, "Dropped status event");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_receive() {
        let (publisher, mut rx) = StatusPublisher::channel(4);
        publisher.publish(StatusEvent::new("STAGER", true));
        publisher.publish(StatusEvent::new("STAGER", false));

        assert_eq!(rx.try_recv().unwrap(), StatusEvent::new("STAGER", true));
        assert_eq!(rx.try_recv().unwrap(), StatusEvent::new("STAGER", false));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_disabled_publisher_is_noop() {
        let publisher = StatusPublisher::disabled();
        assert!(!publisher.is_enabled());
        // must not panic or block
        publisher.publish(StatusEvent::new("STAGER", true));
    }

    #[test]
    fn test_publish_failure_is_swallowed() {
        let (publisher, rx) = StatusPublisher::channel(1);
        drop(rx);
        // closed channel: event silently dropped
        publisher.publish(StatusEvent::new("STAGER", true));
    }

    #[test]
    fn test_from_config_respects_monitoring_endpoint() {
        let plain = StageConfig::default();
        let (publisher, rx) = StatusPublisher::from_config(&plain);
        assert!(!publisher.is_enabled());
        assert!(rx.is_none());

        let monitored = StageConfig::default().with_monitoring_endpoint("monitor");
        let (publisher, rx) = StatusPublisher::from_config(&monitored);
        assert!(publisher.is_enabled());
        assert!(rx.is_some());
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = StatusEvent::new("STAGER", true);
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["name"], "STAGER");
        assert_eq!(value["running"], true);
        assert!(value["reserved"].is_null());
    }
}
