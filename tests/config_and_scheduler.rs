use std::sync::Arc;

use db_backup4j::clock::{Clock, FixedClock};
use db_backup4j::config::BackupConfig;
use db_backup4j::scheduler::Scheduler;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const YAML: &str = r#"
database:
  url: "jdbc:postgresql://localhost:5432/reporting?currentSchema=public"
  username: "app"
  password: "secret"
backup:
  local:
    enabled: true
    path: "/var/backups/reporting"
    retention: 14
    compress: true
schedule:
  enabled: true
  cron: "0 2 * * *"
  timezone: "America/New_York"
"#;

#[test]
fn full_yaml_config_parses_and_validates() {
    let config = BackupConfig::from_yaml_str(YAML).unwrap();
    assert!(config.is_valid(), "{:?}", config.validate());
    assert_eq!(config.database.username, "app");
    assert_eq!(config.backup.local.retention, 14);
    assert_eq!(config.schedule.cron, "0 2 * * *");
    assert_eq!(config.dialect().unwrap().display_name(), "PostgreSQL");
}

#[test]
fn scheduler_fires_and_records_history_against_a_real_cron_expression() {
    let config = BackupConfig::from_yaml_str(YAML).unwrap();
    let clock = Arc::new(FixedClock::new(
        chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc),
    ));
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    let tz: chrono_tz::Tz = config.schedule.timezone.as_deref().unwrap().parse().unwrap();
    let scheduler = Scheduler::new(&config.schedule.cron, tz, clock_dyn).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_clone = fired.clone();
    scheduler
        .start(Box::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
            db_backup4j::model::BackupResult {
                backup_id: "test".into(),
                status: db_backup4j::model::BackupStatus::Success,
                started_at: chrono::Utc::now(),
                ended_at: chrono::Utc::now(),
                artifacts: vec![],
                errors: vec![],
                validations: vec![],
            }
        }))
        .unwrap();

    for _ in 0..100 {
        clock.advance(chrono::Duration::hours(1));
        std::thread::sleep(Duration::from_millis(10));
        if fired.load(Ordering::SeqCst) > 0 {
            break;
        }
    }

    scheduler.stop();
    scheduler.await_termination();
    assert!(fired.load(Ordering::SeqCst) >= 1);
    assert!(!scheduler.history().is_empty());
}

#[test]
fn invalid_cron_is_rejected_during_config_validation() {
    let mut config = BackupConfig::from_yaml_str(YAML).unwrap();
    config.schedule.cron = "61 * * * *".into();
    let errors = config.validate();
    assert!(!errors.is_empty());
}
