use std::process::ExitCode;

use clap::Parser;

use depsweep_cli::cli::{Cli, Commands};
use depsweep_cli::commands::{self, LoadedConfig};
use depsweep_cli::error::CliError;
use depsweep_cli::logging;
use depsweep_cli::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    // `config validate` reports on the file itself, before anything else reads it.
    let command = match cli.command {
        Commands::Config(args) => {
            return commands::config::execute(args, &cli.config, &writer).await;
        }
        other => other,
    };

    let LoadedConfig { mut config, source } = commands::load_config(&cli.config).await?;
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
        config.validate()?;
    }
    logging::init_tracing(&config.general).map_err(|e| CliError::Config(e.to_string()))?;
    // no-op until a metrics recorder is installed
    depsweep_core::metrics::describe_metrics();

    match &source {
        Some(path) => tracing::debug!(config = %path.display(), "configuration loaded"),
        None => tracing::debug!(
            config = %cli.config.display(),
            "configuration file not found, using defaults"
        ),
    }

    match command {
        Commands::Collect(args) => commands::collect::execute(args, &config, &writer).await,
        Commands::Collectors => commands::collectors::execute(&config, &writer),
        Commands::Config(_) => Ok(()),
    }
}
