//! # Messaging Layer
//!
//! Transport primitives for stage workers: opaque job envelopes, the
//! credit-based intake channel, and the shared endpoint registry.

pub mod channel;
pub mod context;
pub mod envelope;

pub use channel::{job_channel, Credit, JobFeed, JobIntake};
pub use context::{SendEndpoint, TransportContext};
pub use envelope::{EnvelopeMetadata, JobEnvelope};
