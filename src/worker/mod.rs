//! # Stage Worker Core
//!
//! The synchronization and flow-control primitive of a multi-stage pipeline.
//! One `StageWorker` owns one credit-based intake channel and drives the
//! poll/dispatch/acknowledge loop on one spawned task:
//!
//! ```text
//! INITIALIZED -> IDLE <-> BUSY -> STOPPING -> DONE
//! ```
//!
//! - `IDLE`: bounded recv on the intake channel; each timeout adds one poll
//!   interval to the idle counter and re-checks the stop flag.
//! - `BUSY`: run the processing unit, route every output in yield order,
//!   echo the envelope as the acknowledgment, bump the completed-job count.
//!   Status events bracket the transition (running true, then false).
//! - `STOPPING`: observed only between polls; an in-flight job always
//!   completes before the loop exits.
//! - `DONE`: channels dropped, unit drained, terminal.
//!
//! Shutdown is cooperative. [`StageHandle::finish`] sets the stop flag and
//! reports (without blocking) whether the loop has already reached `DONE`;
//! callers poll it until it reports completion.

use crate::config::StageConfig;
use crate::error::{PipestageError, Result};
use crate::messaging::{JobEnvelope, JobIntake, TransportContext};
use crate::processing::{ProcessingUnit, StageOutput};
use crate::routing::Router;
use crate::status::{StatusEvent, StatusPublisher};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle flags and runtime counters, shared with [`StageHandle`].
///
/// Written only by the worker's own task; external reads are stale-tolerant
/// snapshots.
#[derive(Debug, Default)]
struct WorkerState {
    running: AtomicBool,
    stop_requested: AtomicBool,
    done: AtomicBool,
    jobs_done: AtomicU64,
    idle_ms: AtomicU64,
}

/// Point-in-time view of a worker's counters and lifecycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageStatus {
    pub name: String,
    pub running: bool,
    pub jobs_done: u64,
    pub idle_ms: u64,
    pub done: bool,
}

/// External control and observation handle for one worker
#[derive(Debug, Clone)]
pub struct StageHandle {
    name: String,
    state: Arc<WorkerState>,
}

impl StageHandle {
    /// Request cooperative shutdown and report whether the loop has already
    /// reached `DONE`. Never blocks; callers re-poll until it returns true.
    /// The in-flight job, if any, completes first.
    pub fn finish(&self) -> bool {
        self.state.stop_requested.store(true, Ordering::SeqCst);
        self.state.done.load(Ordering::SeqCst)
    }

    pub fn is_done(&self) -> bool {
        self.state.done.load(Ordering::SeqCst)
    }

    /// Stale-tolerant snapshot of the worker's counters
    pub fn snapshot(&self) -> StageStatus {
        StageStatus {
            name: self.name.clone(),
            running: self.state.running.load(Ordering::SeqCst),
            jobs_done: self.state.jobs_done.load(Ordering::SeqCst),
            idle_ms: self.state.idle_ms.load(Ordering::SeqCst),
            done: self.state.done.load(Ordering::SeqCst),
        }
    }
}

/// One pipeline stage worker
pub struct StageWorker {
    name: String,
    worker_id: String,
    unit: Option<Box<dyn ProcessingUnit>>,
    router: Router,
    publisher: StatusPublisher,
    context: Arc<TransportContext>,
    config: StageConfig,
    intake: Option<JobIntake>,
    state: Arc<WorkerState>,
}

impl StageWorker {
    /// Construct a worker. `unit` may be absent, in which case `init` fails
    /// and binds nothing. The transport context is shared and non-owning:
    /// it must outlive the worker.
    pub fn new(
        unit: Option<Box<dyn ProcessingUnit>>,
        router: Router,
        publisher: StatusPublisher,
        context: Arc<TransportContext>,
        config: StageConfig,
    ) -> Self {
        let name = if config.stage_name.is_empty() {
            crate::constants::DEFAULT_STAGE_NAME.to_string()
        } else {
            config.stage_name.clone()
        };
        let worker_id = format!("stage_{}_{}", name, Uuid::new_v4());

        info!(
            worker_id = %worker_id,
            stage_name = %name,
            intake_endpoint = %config.intake_endpoint,
            "Creating stage worker"
        );

        Self {
            name,
            worker_id,
            unit,
            router,
            publisher,
            context,
            config,
            intake: None,
            state: Arc::new(WorkerState::default()),
        }
    }

    /// Control handle for this worker; cheap to clone and hand around
    pub fn handle(&self) -> StageHandle {
        StageHandle {
            name: self.name.clone(),
            state: self.state.clone(),
        }
    }

    /// Initialize the worker: run the unit's own `init`, claim the intake
    /// channel, and announce initial capacity. Returns false on any failure,
    /// in which case no channel has been bound. Must be called exactly once
    /// before the loop starts.
    pub fn init(&mut self) -> bool {
        let Some(unit) = self.unit.as_mut() else {
            warn!(worker_id = %self.worker_id, "No processing unit configured");
            return false;
        };
        if !unit.init() {
            warn!(worker_id = %self.worker_id, "Processing unit init failed");
            return false;
        }

        let intake = match self.context.claim_intake(&self.config.intake_endpoint) {
            Ok(intake) => intake,
            Err(e) => {
                error!(
                    worker_id = %self.worker_id,
                    intake_endpoint = %self.config.intake_endpoint,
                    error = %e,
                    "Failed to claim intake channel"
                );
                return false;
            }
        };

        if let Err(e) = intake.send_ready() {
            error!(worker_id = %self.worker_id, error = %e, "Failed to announce capacity");
            return false;
        }

        self.state.stop_requested.store(false, Ordering::SeqCst);
        self.intake = Some(intake);

        info!(
            worker_id = %self.worker_id,
            poll_timeout_ms = self.config.poll_timeout_ms,
            "Stage worker initialized, initial capacity announced"
        );
        true
    }

    /// Run the poll/dispatch loop to completion, consuming the worker.
    ///
    /// Exits `Ok` after a cooperative stop, `Err` on a fatal transport or
    /// processing failure. Either way the channels are released, the unit's
    /// `finish` runs exactly once, and `done` becomes observable through the
    /// handle only after both.
    pub async fn run(mut self) -> Result<()> {
        let mut intake = self.intake.take().ok_or_else(|| {
            PipestageError::InvalidState(
                "worker loop started before a successful init()".to_string(),
            )
        })?;
        let poll_timeout = Duration::from_millis(self.config.poll_timeout_ms);

        let result = self.poll_loop(&mut intake, poll_timeout).await;

        // Release the intake and status channels before the done flag
        // becomes visible
        drop(intake);
        self.publisher = StatusPublisher::disabled();
        if let Some(unit) = self.unit.as_mut() {
            unit.finish();
        }
        self.state.done.store(true, Ordering::SeqCst);

        match &result {
            Ok(()) => info!(
                worker_id = %self.worker_id,
                jobs_done = self.state.jobs_done.load(Ordering::SeqCst),
                "Stage worker shutdown complete"
            ),
            Err(e) => error!(
                worker_id = %self.worker_id,
                error = %e,
                "Stage worker terminated on fatal error"
            ),
        }
        result
    }

    /// Spawn the loop on the current runtime
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    async fn poll_loop(&mut self, intake: &mut JobIntake, poll_timeout: Duration) -> Result<()> {
        let poll_ms = poll_timeout.as_millis() as u64;

        while !self.state.stop_requested.load(Ordering::SeqCst) {
            match intake.recv_timeout(poll_timeout).await? {
                Some(envelope) => self.dispatch(intake, envelope).await?,
                None => {
                    self.state.idle_ms.fetch_add(poll_ms, Ordering::SeqCst);
                }
            }
        }

        debug!(worker_id = %self.worker_id, "Stop flag observed, leaving poll loop");
        Ok(())
    }

    /// One BUSY cycle: run the unit, route every output, acknowledge.
    ///
    /// The ack echoes the received envelope verbatim and is sent only after
    /// all routed sends for this job have completed. A unit or routing error
    /// aborts the cycle with no ack: the job is lost and the error is fatal
    /// to this worker.
    async fn dispatch(&mut self, intake: &JobIntake, envelope: JobEnvelope) -> Result<()> {
        self.state.idle_ms.store(0, Ordering::SeqCst);
        self.set_running(true);

        debug!(
            worker_id = %self.worker_id,
            payload_bytes = envelope.payload().len(),
            "Job received"
        );

        let output = {
            let Some(unit) = self.unit.as_mut() else {
                self.set_running(false);
                return Err(PipestageError::InvalidState(
                    "processing unit missing after init".to_string(),
                ));
            };
            unit.run(envelope.payload()).await
        };

        let routed = match output {
            Ok(output) => self.route_output(output).await,
            Err(e) => Err(e),
        };
        if let Err(e) = routed {
            self.set_running(false);
            return Err(e);
        }

        intake.send_ack(envelope)?;
        self.state.jobs_done.fetch_add(1, Ordering::SeqCst);
        self.set_running(false);

        debug!(
            worker_id = %self.worker_id,
            jobs_done = self.state.jobs_done.load(Ordering::SeqCst),
            "Job acknowledged"
        );
        Ok(())
    }

    /// Expand one unit output into routed sends, in yield order. Each send
    /// completes before the next item is pulled from the sequence.
    async fn route_output(&self, output: StageOutput) -> Result<()> {
        for (payload, destination) in output.into_sends() {
            self.router.send(&payload, destination.as_deref()).await?;
        }
        Ok(())
    }

    fn set_running(&self, running: bool) {
        self.state.running.store(running, Ordering::SeqCst);
        self.publisher
            .publish(StatusEvent::new(self.name.clone(), running));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ProcessingUnit for Echo {
        async fn run(&mut self, job: &[u8]) -> Result<StageOutput> {
            Ok(StageOutput::single(job.to_vec()))
        }
    }

    struct RefusesInit;

    #[async_trait]
    impl ProcessingUnit for RefusesInit {
        fn init(&mut self) -> bool {
            false
        }

        async fn run(&mut self, _job: &[u8]) -> Result<StageOutput> {
            Ok(StageOutput::empty())
        }
    }

    fn worker_with(unit: Option<Box<dyn ProcessingUnit>>) -> (StageWorker, Arc<TransportContext>) {
        let context = Arc::new(TransportContext::new());
        let config = StageConfig::default();
        let worker = StageWorker::new(
            unit,
            Router::new(None),
            StatusPublisher::disabled(),
            context.clone(),
            config,
        );
        (worker, context)
    }

    #[tokio::test]
    async fn test_init_fails_without_unit_and_binds_nothing() {
        let (mut worker, context) = worker_with(None);
        let _feed = context
            .bind_job_channel(&worker.config.intake_endpoint, 4)
            .expect("bind");

        assert!(!worker.init());
        // intake was never claimed
        assert!(context.claim_intake(&worker.config.intake_endpoint).is_ok());
    }

    #[tokio::test]
    async fn test_init_fails_when_unit_init_refuses() {
        let (mut worker, context) = worker_with(Some(Box::new(RefusesInit)));
        let _feed = context
            .bind_job_channel(&worker.config.intake_endpoint, 4)
            .expect("bind");

        assert!(!worker.init());
        assert!(context.claim_intake(&worker.config.intake_endpoint).is_ok());
    }

    #[tokio::test]
    async fn test_init_fails_without_bound_channel() {
        let (mut worker, _context) = worker_with(Some(Box::new(Echo)));
        assert!(!worker.init());
    }

    #[tokio::test]
    async fn test_run_without_init_is_invalid_state() {
        let (worker, _context) = worker_with(Some(Box::new(Echo)));
        let result = worker.run().await;
        assert!(matches!(result, Err(PipestageError::InvalidState(_))));
    }

    #[test]
    fn test_run_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let (worker, _context) = worker_with(Some(Box::new(Echo)));
        // the loop future must be spawnable onto a multi-threaded runtime
        assert_send(&worker.run());
    }

    #[tokio::test]
    async fn test_handle_snapshot_defaults() {
        let (worker, _context) = worker_with(Some(Box::new(Echo)));
        let snapshot = worker.handle().snapshot();
        assert_eq!(snapshot.name, "STAGER");
        assert!(!snapshot.running);
        assert!(!snapshot.done);
        assert_eq!(snapshot.jobs_done, 0);
        assert_eq!(snapshot.idle_ms, 0);
    }
}
