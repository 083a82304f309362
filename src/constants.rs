//! # System Constants
//!
//! Shared defaults for stage identity, polling, and channel sizing.

/// Sentinel stage name used when configuration leaves the name unset
pub const DEFAULT_STAGE_NAME: &str = "STAGER";

/// Bounded poll timeout for the intake channel, in milliseconds.
///
/// The timeout exists solely to make the stop flag observable between
/// messages; it bounds shutdown latency to one poll interval.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 100;

/// Fixed topic on which stage status transitions are published
pub const STATUS_TOPIC: &str = "stage_status_change";

/// Default buffer size for job and sink channels
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Default endpoint identifier for a stage's inbound job channel
pub const DEFAULT_INTAKE_ENDPOINT: &str = "stage_intake";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        assert_eq!(DEFAULT_STAGE_NAME, "STAGER");
        assert!(DEFAULT_POLL_TIMEOUT_MS > 0);
        assert!(DEFAULT_CHANNEL_CAPACITY > 0);
    }
}
