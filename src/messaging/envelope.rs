//! # Job Envelope
//!
//! The opaque message unit carried on job channels. A stage worker never
//! interprets the frames beyond handing the payload to its processing unit;
//! the envelope received is retained verbatim so it can be echoed back as
//! the acknowledgment token. No separate job id is minted by this layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to an envelope at enqueue time.
///
/// Informational only: never used for routing and never mutated in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    pub enqueued_at: DateTime<Utc>,
}

impl Default for EnvelopeMetadata {
    fn default() -> Self {
        Self {
            enqueued_at: Utc::now(),
        }
    }
}

/// Opaque multipart job message.
///
/// The first frame is the job payload; additional frames travel with the
/// envelope untouched and are echoed with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    frames: Vec<Vec<u8>>,
    metadata: EnvelopeMetadata,
}

impl JobEnvelope {
    /// Build a single-frame envelope around a payload
    pub fn new(payload: Vec<u8>) -> Self {
        Self::from_frames(vec![payload])
    }

    /// Build an envelope from pre-assembled frames
    pub fn from_frames(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames,
            metadata: EnvelopeMetadata::default(),
        }
    }

    /// The job payload: the first frame, or empty if the envelope has none
    pub fn payload(&self) -> &[u8] {
        self.frames.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// All frames, in wire order
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    pub fn metadata(&self) -> &EnvelopeMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame_payload() {
        let envelope = JobEnvelope::new(b"job data".to_vec());
        assert_eq!(envelope.payload(), b"job data");
        assert_eq!(envelope.frames().len(), 1);
    }

    #[test]
    fn test_multipart_preserves_frame_order() {
        let envelope =
            JobEnvelope::from_frames(vec![b"payload".to_vec(), b"trailer".to_vec()]);
        assert_eq!(envelope.payload(), b"payload");
        assert_eq!(envelope.frames()[1], b"trailer");
    }

    #[test]
    fn test_empty_envelope_has_empty_payload() {
        let envelope = JobEnvelope::from_frames(vec![]);
        assert_eq!(envelope.payload(), b"");
    }

    #[test]
    fn test_clone_is_verbatim_echo() {
        let envelope = JobEnvelope::from_frames(vec![b"a".to_vec(), b"b".to_vec()]);
        let echo = envelope.clone();
        assert_eq!(envelope, echo);
    }

    #[test]
    fn test_envelope_serialization() {
        let envelope = JobEnvelope::new(b"42".to_vec());
        let serialized = serde_json::to_string(&envelope).expect("Failed to serialize");
        let deserialized: JobEnvelope =
            serde_json::from_str(&serialized).expect("Failed to deserialize");
        assert_eq!(envelope, deserialized);
    }
}
