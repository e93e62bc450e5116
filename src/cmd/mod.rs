mod run;
mod schedule;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::{generate, Shell};

use crate::config::BackupConfig;
use crate::error::BackupError;

const AFTER_HELP: &str = "\x1b[1mCommon workflows:\x1b[0m
  Run a single backup immediately:
    db-backup4j run --config backup.yaml

  Start the cron-driven scheduler and block until Ctrl-C:
    db-backup4j schedule --config backup.yaml

  Print the configuration file's JSON Schema:
    db-backup4j schema

\x1b[1mMore info:\x1b[0m
  Run 'db-backup4j <command> --help' for command-specific options.
  Enable completions: db-backup4j completions <shell>";

#[derive(Parser)]
#[command(name = "db-backup4j")]
#[command(author = "db-backup4j contributors")]
#[command(version)]
#[command(about = "Scheduled relational-database backups with multi-destination delivery")]
#[command(after_help = AFTER_HELP)]
#[command(arg_required_else_help = true)]
#[command(max_term_width = 100)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

const INPUT_OUTPUT: &str = "Input/Output";
const BEHAVIOR: &str = "Behavior";

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Properties,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one backup immediately and exit
    #[command(visible_alias = "r")]
    Run {
        /// Path to the backup configuration file
        #[arg(long, short, value_hint = ValueHint::FilePath, help_heading = INPUT_OUTPUT)]
        config: PathBuf,

        /// Configuration file format
        #[arg(long, value_enum, default_value = "yaml", help_heading = INPUT_OUTPUT)]
        format: ConfigFormat,

        /// Validate configuration and exit without running a backup
        #[arg(long, help_heading = BEHAVIOR)]
        dry_run: bool,
    },

    /// Start the cron-driven scheduler and block until terminated
    #[command(visible_alias = "s")]
    Schedule {
        /// Path to the backup configuration file
        #[arg(long, short, value_hint = ValueHint::FilePath, help_heading = INPUT_OUTPUT)]
        config: PathBuf,

        /// Configuration file format
        #[arg(long, value_enum, default_value = "yaml", help_heading = INPUT_OUTPUT)]
        format: ConfigFormat,
    },

    /// Print the configuration file's JSON Schema
    Schema,

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> Result<(), BackupError> {
    match cli.command {
        Commands::Run { config, format, dry_run } => run::run(config, format, dry_run),
        Commands::Schedule { config, format } => schedule::run(config, format),
        Commands::Schema => {
            print_schema();
            Ok(())
        }
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "db-backup4j", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn print_schema() {
    let schema = schemars::schema_for!(BackupConfig);
    println!("{}", serde_json::to_string_pretty(&schema).expect("schema always serializes"));
}

pub(crate) fn load_config(path: &PathBuf, format: ConfigFormat) -> Result<BackupConfig, BackupError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        BackupError::ConfigInvalid(format!("could not read config file {}: {e}", path.display()))
    })?;
    match format {
        ConfigFormat::Yaml => BackupConfig::from_yaml_str(&text),
        ConfigFormat::Properties => BackupConfig::from_properties_str(&text),
    }
}
