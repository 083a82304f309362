//! # Processing Unit Seam
//!
//! The user-supplied unit of business logic a stage worker drives, and the
//! tagged output shape the worker expands into routed sends. The unit is
//! opaque to this crate: it is initialized once, invoked once per job on the
//! worker's task, and drained once at shutdown.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Output of one processing-unit invocation.
///
/// The three shapes the worker understands, resolved by pattern matching:
/// a bare payload routed to the default downstream target, a payload with an
/// explicit destination selector, or a finite lazy sequence of outputs
/// drained in yield order. An empty stream is legal; the job still
/// acknowledges.
pub enum StageOutput {
    /// Payload for the default downstream target
    Single(Vec<u8>),
    /// Payload with an explicit destination selector
    Addressed(Vec<u8>, String),
    /// Finite lazy sequence; items route independently, in yield order
    Stream(Box<dyn Iterator<Item = StageOutput> + Send>),
}

impl StageOutput {
    pub fn single(payload: impl Into<Vec<u8>>) -> Self {
        StageOutput::Single(payload.into())
    }

    pub fn addressed(payload: impl Into<Vec<u8>>, destination: impl Into<String>) -> Self {
        StageOutput::Addressed(payload.into(), destination.into())
    }

    pub fn stream<I>(items: I) -> Self
    where
        I: IntoIterator<Item = StageOutput>,
        I::IntoIter: Send + 'static,
    {
        StageOutput::Stream(Box::new(items.into_iter()))
    }

    /// A zero-output result. The worker still acknowledges the job.
    pub fn empty() -> Self {
        StageOutput::Stream(Box::new(std::iter::empty()))
    }

    /// Flatten into `(payload, destination)` pairs, lazily and in yield
    /// order. Nested streams are drained depth-first, preserving order.
    pub fn into_sends(self) -> OutputSends {
        OutputSends {
            stack: vec![Box::new(std::iter::once(self))],
        }
    }
}

impl fmt::Debug for StageOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutput::Single(payload) => {
                f.debug_tuple("Single").field(&payload.len()).finish()
            }
            StageOutput::Addressed(payload, destination) => f
                .debug_tuple("Addressed")
                .field(&payload.len())
                .field(destination)
                .finish(),
            StageOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Lazy flattening of a [`StageOutput`] into routed sends
pub struct OutputSends {
    stack: Vec<Box<dyn Iterator<Item = StageOutput> + Send>>,
}

impl Iterator for OutputSends {
    type Item = (Vec<u8>, Option<String>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                Some(StageOutput::Single(payload)) => return Some((payload, None)),
                Some(StageOutput::Addressed(payload, destination)) => {
                    return Some((payload, Some(destination)))
                }
                Some(StageOutput::Stream(inner)) => self.stack.push(inner),
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

/// User-supplied processing capability driven by a stage worker.
///
/// `init` runs before the worker binds any channel; returning false aborts
/// worker initialization. `run` executes on the worker's task, one job at a
/// time; an `Err` is fatal to the worker (the job is lost, no ack is sent,
/// retry belongs upstream). `finish` is called exactly once at loop exit.
#[async_trait]
pub trait ProcessingUnit: Send + Sync {
    fn init(&mut self) -> bool {
        true
    }

    async fn run(&mut self, job: &[u8]) -> Result<StageOutput>;

    fn finish(&mut self) {}
}
