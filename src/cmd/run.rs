use std::path::PathBuf;

use tracing::info;

use crate::clock::SystemClock;
use crate::error::BackupError;
use crate::notifier::NullNotifier;
use crate::orchestrator;

use super::{load_config, ConfigFormat};

pub fn run(config_path: PathBuf, format: ConfigFormat, dry_run: bool) -> Result<(), BackupError> {
    let config = load_config(&config_path, format)?;

    if let Err(errors) = orchestrator::validate_config(&config) {
        for error in &errors {
            eprintln!("{error}");
        }
        return Err(BackupError::ConfigInvalid(format!(
            "{} configuration error(s)",
            errors.len()
        )));
    }

    if dry_run {
        println!("configuration is valid");
        return Ok(());
    }

    let clock = SystemClock;
    let notifier = NullNotifier;
    let result = orchestrator::run_once(&config, &clock, &notifier);

    info!(
        backup_id = %result.backup_id,
        status = %result.status,
        artifacts = result.artifacts.len(),
        errors = result.errors.len(),
        "backup run complete"
    );
    println!("{} [{}]", result.backup_id, result.status);
    for error in &result.errors {
        eprintln!("  error: {}", error.message);
    }

    std::process::exit(result.exit_code());
}
