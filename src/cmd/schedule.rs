use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::error::BackupError;
use crate::notifier::{NullNotifier, Notifier};
use crate::orchestrator;

use super::{load_config, ConfigFormat};

pub fn run(config_path: PathBuf, format: ConfigFormat) -> Result<(), BackupError> {
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

    if !config.schedule.enabled {
        return Err(BackupError::ConfigInvalid(
            "schedule.enabled must be true to run the scheduler".into(),
        ));
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier: Arc<dyn Notifier> = Arc::new(NullNotifier);
    let scheduler = orchestrator::run_scheduled(Arc::new(config), clock, notifier)?;

    info!(cron = %scheduler.cron_source(), "scheduler started");
    println!("scheduler started, press Ctrl-C to stop");

    let shutdown = scheduler.clone();
    ctrlc::set_handler(move || shutdown.stop())
        .map_err(|e| BackupError::SchedulerFailed(format!("failed to install Ctrl-C handler: {e}")))?;

    scheduler.await_termination();
    Ok(())
}
