//! Orchestrator (spec.md §4.G): wires the Dump Engine, Output Pipeline,
//! Integrity Validator, Destinations, and Retention Sweeper into one run,
//! and hosts the Scheduler for repeated runs.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::checksum;
use crate::clock::Clock;
use crate::config::BackupConfig;
use crate::destination::{Destination, LocalDestination, S3Destination};
use crate::dialect::ConnectionInfo;
use crate::dump::DumpEngine;
use crate::error::BackupError;
use crate::model::{
    generate_backup_id, BackupArtifact, BackupResult, Checksum, ChecksumAlgorithm, RecordedError,
    ValidationOutcome,
};
use crate::notifier::Notifier;
use crate::pipeline::{artifact_file_name, ArtifactWriter};
use crate::retention;
use crate::scheduler::Scheduler;
use crate::validate;

/// Aggregate every configuration error, mirroring `BackupConfig::validate`
/// but as the orchestrator's own entry point.
pub fn validate_config(config: &BackupConfig) -> Result<(), Vec<BackupError>> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn build_destinations(config: &BackupConfig) -> Vec<Box<dyn Destination>> {
    let mut destinations: Vec<Box<dyn Destination>> = Vec::new();
    if config.backup.local.enabled {
        destinations.push(Box::new(LocalDestination::new(
            config.backup.local.path.clone(),
        )));
    }
    if config.backup.s3.enabled {
        destinations.push(Box::new(S3Destination::new(
            config.backup.s3.bucket.clone(),
            config.backup.s3.prefix.clone(),
            config.backup.s3.region.clone(),
            config.backup.s3.access_key.clone(),
            config.backup.s3.secret_key.clone(),
        )));
    }
    destinations
}

/// Run the full pipeline once: connect, dump, write, checksum, validate,
/// deliver to every enabled destination, sweep local retention, and
/// notify. Never panics on a stage failure — every error is recorded onto
/// the returned [`BackupResult`] instead of propagated, so a scheduled run
/// can always compute its next fire time regardless of this run's outcome.
pub fn run_once(
    config: &BackupConfig,
    clock: &dyn Clock,
    notifier: &dyn Notifier,
) -> BackupResult {
    let started_at = clock.now();
    let mut errors: Vec<RecordedError> = Vec::new();
    let mut artifacts: Vec<BackupArtifact> = Vec::new();
    let mut validations: Vec<ValidationOutcome> = Vec::new();

    let connection_info = match ConnectionInfo::parse(&config.database.url) {
        Ok(info) => info,
        Err(e) => {
            let backup_id = generate_backup_id("unknown", started_at);
            errors.push(record(&e, started_at));
            return finish(backup_id, started_at, clock.now(), artifacts, errors, validations);
        }
    };
    let backup_id = generate_backup_id(&connection_info.database, started_at);

    let mut engine = match DumpEngine::connect(
        &connection_info,
        &config.database.username,
        &config.database.password,
    ) {
        Ok(engine) => engine,
        Err(e) => {
            errors.push(record(&e, started_at));
            return finish(backup_id, started_at, clock.now(), artifacts, errors, validations);
        }
    };

    let tables = match engine.discover_filtered_tables(
        &config.database.include_table_patterns,
        config.database.exclude_system_tables.0,
        &config.database.exclude_table_patterns,
    ) {
        Ok(tables) => tables,
        Err(e) => {
            errors.push(record(&e, started_at));
            return finish(backup_id, started_at, clock.now(), artifacts, errors, validations);
        }
    };

    let compress = config.backup.local.compress;
    let file_name = artifact_file_name(&connection_info.database, started_at, compress);
    let scratch_path = std::env::temp_dir().join(format!("{backup_id}-{file_name}"));

    let dump_outcome = (|| -> Result<(u64, String), BackupError> {
        let mut writer = ArtifactWriter::create(&scratch_path, compress)?;
        engine.dump_tables(&tables, &mut writer, started_at)?;
        writer.finish()
    })();

    let (size, digest) = match dump_outcome {
        Ok(pair) => pair,
        Err(e) => {
            errors.push(record(&e, started_at));
            return finish(backup_id, started_at, clock.now(), artifacts, errors, validations);
        }
    };

    let outcome = validate::validate_artifact(&scratch_path);
    if !outcome.is_valid() {
        warn!(backup_id = %backup_id, "artifact failed post-write validation");
    }
    validations.push(outcome);

    let checksum = Checksum {
        algorithm: ChecksumAlgorithm::Sha256,
        hex_digest: digest,
        computed_at: clock.now(),
        computation_ms: 0,
        observed_file_size: size,
    };

    let destinations = build_destinations(config);
    for destination in &destinations {
        match destination.deliver(&scratch_path) {
            Ok(mut artifact) => {
                artifact.checksum = Some(checksum.clone());
                info!(backup_id = %backup_id, destination = destination.name(), "artifact delivered");
                artifacts.push(artifact);
            }
            Err(e) => {
                error!(backup_id = %backup_id, destination = destination.name(), error = %e, "delivery failed");
                errors.push(record(&e, clock.now()).with_destination(destination.name()));
            }
        }
    }

    let _ = std::fs::remove_file(&scratch_path);

    if config.backup.local.enabled && config.backup.local.retention > 0 {
        if let Some(local) = destinations
            .iter()
            .find(|d| d.name() == "local")
        {
            match retention::sweep(
                local.as_ref(),
                config.backup.local.retention,
                Arc::new(crate::clock::SystemClock),
                false,
            ) {
                Ok(report) => info!(backup_id = %backup_id, deleted = report.deleted, "retention sweep complete"),
                Err(e) => {
                    errors.push(record(&e, clock.now()));
                }
            }
        }
    }

    let result = finish(backup_id, started_at, clock.now(), artifacts, errors, validations);
    notifier.notify(&result);
    result
}

fn record(error: &BackupError, at: chrono::DateTime<Utc>) -> RecordedError {
    RecordedError::new(error.kind(), error.to_string(), at).with_cause_chain(error.cause_chain())
}

fn finish(
    backup_id: String,
    started_at: chrono::DateTime<Utc>,
    ended_at: chrono::DateTime<Utc>,
    artifacts: Vec<BackupArtifact>,
    errors: Vec<RecordedError>,
    validations: Vec<ValidationOutcome>,
) -> BackupResult {
    let status = BackupResult::derive_status(!artifacts.is_empty(), !errors.is_empty(), &validations);
    BackupResult {
        backup_id,
        status,
        started_at,
        ended_at,
        artifacts,
        errors,
        validations,
    }
}

/// Build and start a [`Scheduler`] that invokes [`run_once`] on every fire.
/// The caller owns the returned handle and is responsible for `stop()` and
/// `await_termination()` — e.g. on a Ctrl-C signal — since the orchestrator
/// has no opinion on the host process's shutdown mechanism.
pub fn run_scheduled(
    config: Arc<BackupConfig>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
) -> Result<Arc<Scheduler>, BackupError> {
    let tz: chrono_tz::Tz = config
        .schedule
        .timezone
        .as_deref()
        .unwrap_or("UTC")
        .parse()
        .map_err(|_| {
            BackupError::ConfigInvalid(format!(
                "unrecognized schedule.timezone: {:?}",
                config.schedule.timezone
            ))
        })?;

    let scheduler = Arc::new(Scheduler::new(&config.schedule.cron, tz, clock.clone())?);

    let pipeline_config = config;
    let pipeline_clock = clock;
    let pipeline_notifier = notifier;
    scheduler.start(Box::new(move || {
        run_once(&pipeline_config, pipeline_clock.as_ref(), pipeline_notifier.as_ref())
    }))?;

    Ok(scheduler)
}
