//! Destinations (spec.md §4.D): where a finished artifact ends up.
//!
//! `Destination` is a plain trait object rather than a class hierarchy —
//! `LocalDestination` and `S3Destination` are the two concrete shapes, and
//! the orchestrator holds `Vec<Box<dyn Destination>>` built from whichever
//! of `backup.local`/`backup.s3` are enabled.

pub mod local;
pub mod s3;
pub mod sigv4;

use std::path::Path;
use std::time::Duration;

pub use local::LocalDestination;
pub use s3::S3Destination;

use crate::error::BackupError;
use crate::model::BackupArtifact;

/// Metadata about a previously-delivered artifact, as listed back from a
/// destination (used by the retention sweeper).
#[derive(Debug, Clone)]
pub struct DestinationEntry {
    pub name: String,
    pub modified_at: chrono::DateTime<chrono::Utc>,
    pub size: u64,
}

pub trait Destination: Send + Sync {
    /// Human-readable identifier used in `BackupResult`/log output.
    fn name(&self) -> &str;

    /// Copy `local_path` to this destination, returning the delivered artifact.
    fn deliver(&self, local_path: &Path) -> Result<BackupArtifact, BackupError>;

    /// List backup-pattern entries currently held at this destination.
    fn list(&self) -> Result<Vec<DestinationEntry>, BackupError>;

    /// Remove a previously-listed entry by name.
    fn delete(&self, name: &str) -> Result<(), BackupError>;
}

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BACKOFFS_MS: [u64; 3] = [1000, 2000, 4000];

/// Shared retry policy for destinations whose transport can fail
/// transiently (spec.md §4.D): up to 3 attempts, 1s/2s/4s backoff. 4xx
/// responses are terminal (retrying won't fix a bad credential or bucket
/// name); 5xx and transport-level errors are retried.
pub fn with_retry<T>(
    mut attempt: impl FnMut(u32) -> Result<T, BackupError>,
    is_retryable: impl Fn(&BackupError) -> bool,
) -> Result<T, BackupError> {
    let mut last_err = None;
    for attempt_no in 0..RETRY_ATTEMPTS {
        match attempt(attempt_no) {
            Ok(v) => return Ok(v),
            Err(e) if is_retryable(&e) && attempt_no + 1 < RETRY_ATTEMPTS => {
                std::thread::sleep(Duration::from_millis(RETRY_BACKOFFS_MS[attempt_no as usize]));
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.expect("loop always assigns before exhausting attempts"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retries_until_success_within_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, BackupError> = with_retry(
            |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(BackupError::DeliveryFailed {
                        destination: "x".into(),
                        message: "transient".into(),
                    })
                } else {
                    Ok(42)
                }
            },
            |_| true,
        );
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn non_retryable_error_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, BackupError> = with_retry(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BackupError::DeliveryFailed {
                    destination: "x".into(),
                    message: "bad request".into(),
                })
            },
            |_| false,
        );
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
