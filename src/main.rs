use clap::Parser;
use db_backup4j::cmd::{self, Cli};
use db_backup4j::error::ErrorKind;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = cmd::run(cli) {
        eprintln!("{e}");
        // spec.md §6: exit code 2 is reserved for configuration-invalid;
        // every other top-level error (a run's own exit_code() handles
        // SUCCESS/FAILED/VALIDATION_FAILED already) falls back to 1.
        let code = if e.kind() == ErrorKind::ConfigInvalid { 2 } else { 1 };
        std::process::exit(code);
    }
}
