//! # Credit-Based Job Channel
//!
//! Point-to-point intake channel between an upstream producer and one stage
//! worker. Jobs flow downstream; credits flow upstream. The protocol is a
//! strict request/grant handshake: the worker announces capacity with one
//! `Ready` credit after binding, and every later credit is an `Ack` echoing
//! the completed job's envelope verbatim. The producer must never push a
//! second job before receiving the previous acknowledgment.

use crate::error::{PipestageError, Result};
use crate::messaging::envelope::JobEnvelope;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Capacity signal sent from worker to producer
#[derive(Debug, Clone, PartialEq)]
pub enum Credit {
    /// Initial "I can accept exactly one job" announcement, sent once at bind
    Ready,
    /// Completion acknowledgment echoing the processed job's envelope;
    /// doubles as the next capacity grant
    Ack(JobEnvelope),
}

/// Create a job channel pair: the producer-side feed and the worker-side intake
pub fn job_channel(capacity: usize) -> (JobFeed, JobIntake) {
    let (job_tx, job_rx) = mpsc::channel(capacity.max(1));
    let (credit_tx, credit_rx) = mpsc::channel(capacity.max(1));

    let feed = JobFeed {
        jobs: job_tx,
        credits: credit_rx,
    };
    let intake = JobIntake {
        jobs: job_rx,
        credits: credit_tx,
    };
    (feed, intake)
}

/// Producer-side handle: submit jobs, receive credits
#[derive(Debug)]
pub struct JobFeed {
    jobs: mpsc::Sender<JobEnvelope>,
    credits: mpsc::Receiver<Credit>,
}

impl JobFeed {
    /// Submit one job. Legal only after a credit has been received.
    pub async fn send_job(&self, envelope: JobEnvelope) -> Result<()> {
        self.jobs
            .send(envelope)
            .await
            .map_err(|_| PipestageError::Transport("job channel closed by worker".to_string()))
    }

    /// Wait for the next credit; `None` once the worker released the channel
    pub async fn recv_credit(&mut self) -> Option<Credit> {
        self.credits.recv().await
    }

    /// Non-blocking credit check, for callers polling between other work
    pub fn try_recv_credit(&mut self) -> Option<Credit> {
        self.credits.try_recv().ok()
    }
}

/// Worker-side handle: receive jobs, emit credits
#[derive(Debug)]
pub struct JobIntake {
    jobs: mpsc::Receiver<JobEnvelope>,
    credits: mpsc::Sender<Credit>,
}

impl JobIntake {
    /// Bounded receive: `Ok(None)` on timeout, `Err` once the producer side
    /// is gone (fatal to the worker loop).
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<JobEnvelope>> {
        match tokio::time::timeout(timeout, self.jobs.recv()).await {
            Err(_) => Ok(None),
            Ok(Some(envelope)) => Ok(Some(envelope)),
            Ok(None) => Err(PipestageError::Transport(
                "job channel closed by producer".to_string(),
            )),
        }
    }

    /// Announce initial capacity. Sent exactly once, immediately after bind.
    pub fn send_ready(&self) -> Result<()> {
        debug!("Announcing initial capacity on intake channel");
        self.credits.try_send(Credit::Ready).map_err(|_| {
            PipestageError::Transport("failed to announce capacity: credit channel unavailable".to_string())
        })
    }

    /// Acknowledge a completed job by echoing its envelope upstream.
    ///
    /// One ack per job, sent only after every routed output of that job.
    pub fn send_ack(&self, envelope: JobEnvelope) -> Result<()> {
        self.credits.try_send(Credit::Ack(envelope)).map_err(|_| {
            PipestageError::Transport("failed to send acknowledgment: credit channel unavailable".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_then_job_then_ack_round_trip() {
        let (mut feed, mut intake) = job_channel(4);

        intake.send_ready().expect("ready should send");
        assert_eq!(feed.recv_credit().await, Some(Credit::Ready));

        let envelope = JobEnvelope::new(b"job-1".to_vec());
        feed.send_job(envelope.clone()).await.expect("send should succeed");

        let received = intake
            .recv_timeout(Duration::from_millis(50))
            .await
            .expect("recv should succeed")
            .expect("job should arrive");
        assert_eq!(received, envelope);

        intake.send_ack(received).expect("ack should send");
        match feed.recv_credit().await {
            Some(Credit::Ack(echo)) => assert_eq!(echo, envelope),
            other => panic!("expected ack credit, got {other:?}"),
        }
    }

    #[test]
    fn test_recv_timeout_expires_without_traffic() {
        tokio_test::block_on(async {
            let (_feed, mut intake) = job_channel(1);
            let result = intake.recv_timeout(Duration::from_millis(10)).await;
            assert!(matches!(result, Ok(None)));
        });
    }

    #[tokio::test]
    async fn test_recv_fails_after_producer_drop() {
        let (feed, mut intake) = job_channel(1);
        drop(feed);
        let result = intake.recv_timeout(Duration::from_millis(10)).await;
        assert!(matches!(result, Err(PipestageError::Transport(_))));
    }

    #[tokio::test]
    async fn test_send_job_fails_after_worker_drop() {
        let (feed, intake) = job_channel(1);
        drop(intake);
        let result = feed.send_job(JobEnvelope::new(b"orphan".to_vec())).await;
        assert!(matches!(result, Err(PipestageError::Transport(_))));
    }
}
