//! Shared data model: [`TableDescriptor`], [`BackupArtifact`], [`BackupResult`]
//! and supporting types, as specified in spec.md §3.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Column metadata captured during table discovery. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

/// A schema-qualified table discovered by the Dump Engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
    pub row_count_estimate: Option<i64>,
}

impl TableDescriptor {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }
}

/// Checksum algorithm used to fingerprint an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Md5,
    Sha256,
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumAlgorithm::Md5 => write!(f, "md5"),
            ChecksumAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

/// A computed checksum, carrying enough metadata to detect staleness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    pub hex_digest: String,
    pub computed_at: DateTime<Utc>,
    pub computation_ms: u64,
    pub observed_file_size: u64,
}

/// A single artifact produced by one run at one destination.
#[derive(Debug, Clone)]
pub struct BackupArtifact {
    pub path: PathBuf,
    pub byte_size: u64,
    pub checksum: Option<Checksum>,
    pub destination: String,
    pub created_at: DateTime<Utc>,
}

/// Severity of a validation finding. Errors invalidate the artifact; warnings don't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ValidationFinding {
    pub severity: Severity,
    pub message: String,
}

/// Outcome of post-write inspection for a single artifact.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub artifact_path: PathBuf,
    pub findings: Vec<ValidationFinding>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        !self
            .findings
            .iter()
            .any(|f| f.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }
}

/// A single recorded error, attributable to a destination when relevant.
#[derive(Debug, Clone)]
pub struct RecordedError {
    pub kind: ErrorKind,
    pub destination: Option<String>,
    pub message: String,
    pub cause_chain: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

impl RecordedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            destination: None,
            message: message.into(),
            cause_chain: Vec::new(),
            occurred_at,
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_cause_chain(mut self, cause_chain: Vec<String>) -> Self {
        self.cause_chain = cause_chain;
        self
    }
}

/// Overall status of a run, auto-derived from its artifacts/errors/validations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStatus {
    Success,
    PartialSuccess,
    Failed,
    ValidationFailed,
}

impl std::fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackupStatus::Success => "SUCCESS",
            BackupStatus::PartialSuccess => "PARTIAL_SUCCESS",
            BackupStatus::Failed => "FAILED",
            BackupStatus::ValidationFailed => "VALIDATION_FAILED",
        };
        f.write_str(s)
    }
}

/// The aggregated result of one pipeline run.
#[derive(Debug, Clone)]
pub struct BackupResult {
    pub backup_id: String,
    pub status: BackupStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub artifacts: Vec<BackupArtifact>,
    pub errors: Vec<RecordedError>,
    pub validations: Vec<ValidationOutcome>,
}

impl BackupResult {
    /// Derive `status` from the current artifacts/errors/validations, per spec.md §3:
    /// FAILED if any error and no artifact reached any destination;
    /// PARTIAL_SUCCESS if an artifact reached at least one destination but errors exist;
    /// VALIDATION_FAILED if all validations failed but delivery succeeded;
    /// otherwise SUCCESS.
    pub fn derive_status(
        delivered_any: bool,
        has_errors: bool,
        validations: &[ValidationOutcome],
    ) -> BackupStatus {
        if has_errors && !delivered_any {
            return BackupStatus::Failed;
        }
        if has_errors {
            return BackupStatus::PartialSuccess;
        }
        if !validations.is_empty() && validations.iter().all(|v| !v.is_valid()) {
            return BackupStatus::ValidationFailed;
        }
        BackupStatus::Success
    }

    pub fn exit_code(&self) -> i32 {
        match self.status {
            BackupStatus::Success => 0,
            BackupStatus::PartialSuccess => 0,
            BackupStatus::Failed => 1,
            BackupStatus::ValidationFailed => 3,
        }
    }
}

/// Generate a timestamped, process-unique backup id (`<db>-<YYYYMMDDHHMMSS>-<short-uuid>`).
pub fn generate_backup_id(database: &str, at: DateTime<Utc>) -> String {
    let short = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        database,
        at.format("%Y%m%d%H%M%S"),
        &short[..8]
    )
}

/// Returns true if `name` matches one of the FilePattern globs:
/// `*.sql`, `*.sql.gz`, `*.sql.gzip`.
pub fn is_backup_filename(name: &str) -> bool {
    name.ends_with(".sql") || name.ends_with(".sql.gz") || name.ends_with(".sql.gzip")
}
