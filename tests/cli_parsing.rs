//! Argument parsing for every subcommand, independent of any database or
//! filesystem state.

use clap::Parser;
use db_backup4j::cmd::Cli;

#[test]
fn run_subcommand_accepts_config_and_format() {
    let cli = Cli::try_parse_from([
        "db-backup4j",
        "run",
        "--config",
        "backup.yaml",
        "--format",
        "yaml",
    ])
    .unwrap();
    match cli.command {
        db_backup4j::cmd::Commands::Run { config, dry_run, .. } => {
            assert_eq!(config.to_str().unwrap(), "backup.yaml");
            assert!(!dry_run);
        }
        _ => panic!("expected Run subcommand"),
    }
}

#[test]
fn run_subcommand_short_alias_works() {
    let cli = Cli::try_parse_from(["db-backup4j", "r", "-c", "backup.yaml"]).unwrap();
    assert!(matches!(cli.command, db_backup4j::cmd::Commands::Run { .. }));
}

#[test]
fn schedule_subcommand_requires_config() {
    let result = Cli::try_parse_from(["db-backup4j", "schedule"]);
    assert!(result.is_err());
}

#[test]
fn dry_run_flag_parses() {
    let cli = Cli::try_parse_from([
        "db-backup4j",
        "run",
        "--config",
        "backup.yaml",
        "--dry-run",
    ])
    .unwrap();
    match cli.command {
        db_backup4j::cmd::Commands::Run { dry_run, .. } => assert!(dry_run),
        _ => panic!("expected Run subcommand"),
    }
}

#[test]
fn schema_subcommand_takes_no_arguments() {
    let cli = Cli::try_parse_from(["db-backup4j", "schema"]).unwrap();
    assert!(matches!(cli.command, db_backup4j::cmd::Commands::Schema));
}

#[test]
fn completions_subcommand_requires_a_shell() {
    let cli = Cli::try_parse_from(["db-backup4j", "completions", "bash"]).unwrap();
    assert!(matches!(
        cli.command,
        db_backup4j::cmd::Commands::Completions { .. }
    ));
}

#[test]
fn no_arguments_is_an_error_not_a_panic() {
    let result = Cli::try_parse_from(["db-backup4j"]);
    assert!(result.is_err());
}
