//! Error taxonomy shared by every stage of the pipeline.
//!
//! Each variant corresponds to one of the error kinds a `BackupResult` needs
//! to be able to report; `ErrorKind` is the unit-only projection stored
//! alongside the human message so callers can match on kind without caring
//! about the payload.

use std::fmt;

/// Discriminant for a [`BackupError`], stored in [`crate::model::RecordedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConfigInvalid,
    ConnectionFailed,
    DumpFailed,
    WriteFailed,
    CompressionFailed,
    DeliveryFailed,
    ChecksumFailed,
    ValidationFailed,
    RetentionFailed,
    SchedulerFailed,
    CronInvalid,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::ConnectionFailed => "ConnectionFailed",
            ErrorKind::DumpFailed => "DumpFailed",
            ErrorKind::WriteFailed => "WriteFailed",
            ErrorKind::CompressionFailed => "CompressionFailed",
            ErrorKind::DeliveryFailed => "DeliveryFailed",
            ErrorKind::ChecksumFailed => "ChecksumFailed",
            ErrorKind::ValidationFailed => "ValidationFailed",
            ErrorKind::RetentionFailed => "RetentionFailed",
            ErrorKind::SchedulerFailed => "SchedulerFailed",
            ErrorKind::CronInvalid => "CronInvalid",
        };
        f.write_str(s)
    }
}

/// The core error type propagated within a single pipeline run.
#[derive(thiserror::Error, Debug)]
pub enum BackupError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(#[source] anyhow::Error),

    #[error("dump failed: {0}")]
    DumpFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("compression failed: {0}")]
    CompressionFailed(#[source] std::io::Error),

    #[error("delivery to {destination} failed: {message}")]
    DeliveryFailed { destination: String, message: String },

    #[error("checksum failed: {0}")]
    ChecksumFailed(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("retention sweep failed: {0}")]
    RetentionFailed(String),

    #[error("scheduler failed: {0}")]
    SchedulerFailed(String),

    #[error("invalid cron expression: {0}")]
    CronInvalid(String),
}

impl BackupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackupError::ConfigInvalid(_) => ErrorKind::ConfigInvalid,
            BackupError::ConnectionFailed(_) => ErrorKind::ConnectionFailed,
            BackupError::DumpFailed(_) => ErrorKind::DumpFailed,
            BackupError::WriteFailed(_) => ErrorKind::WriteFailed,
            BackupError::CompressionFailed(_) => ErrorKind::CompressionFailed,
            BackupError::DeliveryFailed { .. } => ErrorKind::DeliveryFailed,
            BackupError::ChecksumFailed(_) => ErrorKind::ChecksumFailed,
            BackupError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            BackupError::RetentionFailed(_) => ErrorKind::RetentionFailed,
            BackupError::SchedulerFailed(_) => ErrorKind::SchedulerFailed,
            BackupError::CronInvalid(_) => ErrorKind::CronInvalid,
        }
    }

    /// Walk the `source()` chain into a flat list of messages, innermost last removed first
    /// (outermost first), matching `RecordedError.cause_chain`'s documented order.
    pub fn cause_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(self);
        while let Some(err) = current {
            chain.push(err.to_string());
            current = err.source();
        }
        chain
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
