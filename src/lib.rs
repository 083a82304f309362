#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # pipestage
//!
//! Credit-based pipeline stage worker: the synchronization and flow-control
//! primitive of a multi-stage processing pipeline where stages run as
//! independent concurrent workers connected by channels rather than direct
//! calls.
//!
//! ## Overview
//!
//! A [`StageWorker`] pulls jobs one at a time from an upstream producer over
//! a credit-based intake channel, applies a user-supplied [`ProcessingUnit`]
//! to each job, forwards zero or more results to downstream destinations
//! through its [`Router`], and reports availability on a monitoring channel
//! via [`StatusPublisher`]. The worker advertises its own capacity: one
//! `Ready` credit at bind time, then one acknowledgment per completed job,
//! echoing the job's envelope verbatim. Exactly one job is in flight per
//! worker, which gives strict back-pressure with no buffering between
//! stages.
//!
//! ## Architecture
//!
//! ```text
//! upstream  ──jobs──▶  ┌─────────────┐  ──outputs──▶  Router ──▶ sinks
//!           ◀─credits─ │ StageWorker │
//!                      └─────────────┘  ──status────▶  StatusPublisher
//! ```
//!
//! ## Module Organization
//!
//! - [`worker`] - The stage worker core: poll/dispatch loop and lifecycle
//! - [`messaging`] - Job envelopes, the credit channel, and the transport context
//! - [`routing`] - Symbolic destination resolution and fan-out sends
//! - [`processing`] - The processing-unit seam and tagged output shapes
//! - [`status`] - Fire-and-forget status publication
//! - [`config`] - Stage configuration with environment overrides
//! - [`error`] - Structured error handling
//! - [`logging`] - Environment-aware structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pipestage::{
//!     ProcessingUnit, Router, StageConfig, StageOutput, StageWorker, StatusPublisher,
//!     TransportContext,
//! };
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Doubler;
//!
//! #[async_trait]
//! impl ProcessingUnit for Doubler {
//!     async fn run(&mut self, job: &[u8]) -> pipestage::Result<StageOutput> {
//!         let n: i64 = serde_json::from_slice(job)
//!             .map_err(|e| pipestage::PipestageError::Processing(e.to_string()))?;
//!         let doubled = serde_json::to_vec(&(n * 2)).expect("serializable");
//!         Ok(StageOutput::single(doubled))
//!     }
//! }
//!
//! # async fn example() -> pipestage::Result<()> {
//! let context = Arc::new(TransportContext::new());
//! let _sink = context.open_sink("downstream", 16)?;
//! let _feed = context.bind_job_channel("stage_intake", 16)?;
//!
//! let config = StageConfig::default()
//!     .with_route("main", ["downstream"])
//!     .with_default_route("main");
//! let router = Router::from_config(&context, &config)?;
//!
//! let mut worker = StageWorker::new(
//!     Some(Box::new(Doubler)),
//!     router,
//!     StatusPublisher::disabled(),
//!     context.clone(),
//!     config,
//! );
//! let handle = worker.handle();
//! assert!(worker.init());
//! let _join = worker.spawn();
//!
//! // ... feed jobs, then:
//! while !handle.finish() {
//!     tokio::task::yield_now().await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod processing;
pub mod routing;
pub mod status;
pub mod worker;

pub use config::StageConfig;
pub use constants::{DEFAULT_POLL_TIMEOUT_MS, DEFAULT_STAGE_NAME, STATUS_TOPIC};
pub use error::{PipestageError, Result};
pub use messaging::{job_channel, Credit, JobEnvelope, JobFeed, JobIntake, TransportContext};
pub use processing::{OutputSends, ProcessingUnit, StageOutput};
pub use routing::Router;
pub use status::{StatusEvent, StatusPublisher};
pub use worker::{StageHandle, StageStatus, StageWorker};
