mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use itenv::{Config, Error as EnvError, Orchestrator, Parser as ConfigParser};
use output::{CliOutput, JsonOutput, UserOutput};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(env_error) = e.downcast_ref::<EnvError>() {
            eprintln!("Error: {}", env_error);
            if let Some(suggestion) = env_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let config = load_config(cli.config.as_deref())?;
    let mut settings = config.settings.clone();
    if let Some(prefix) = cli.prefix {
        settings.prefix = prefix;
    }
    let registry = Arc::new(config.registry()?);

    match cli.command {
        Commands::Services { json } => commands::run_services(registry.as_ref(), json, &CliOutput),
        Commands::Up {
            services,
            ports,
            json,
        } => {
            let mut builder = Orchestrator::builder().registry(registry).settings(settings);
            for (service, port) in ports {
                builder = builder.port_override(service, port);
            }
            let orchestrator = builder.build()?;

            let out: &dyn UserOutput = if json { &JsonOutput } else { &CliOutput };
            commands::run_up(&orchestrator, services, json, out).await
        }
        Commands::Down { services } => {
            let orchestrator = Orchestrator::builder()
                .registry(registry)
                .settings(settings)
                .build()?;
            commands::run_down(&orchestrator, services, &CliOutput).await
        }
    }
}

/// Load an explicit config file, or the nearest `itenv.yaml`, or defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let parser = ConfigParser::new();
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => parser.find_config_file()?,
    };

    match path {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            Ok(parser.load_config(&path)?)
        }
        None => Ok(Config::default()),
    }
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
