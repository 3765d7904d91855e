use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "itenv")]
#[command(about = "Disposable Docker service environments for integration tests")]
pub struct Cli {
    /// Config file path (defaults to itenv.yaml, searched upwards)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Container name prefix (overrides the config file)
    #[arg(short, long, global = true)]
    pub prefix: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start services and keep them running until Ctrl-C
    Up {
        /// Services to start (defaults to the configured default set)
        services: Vec<String>,

        /// Host port override for a service's primary port (can be repeated)
        #[arg(long = "port", value_name = "NAME=PORT", value_parser = parse_port_override)]
        ports: Vec<(String, u16)>,

        /// Print connection info as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove leftover containers from earlier runs
    Down {
        /// Services to remove (defaults to every known service)
        services: Vec<String>,
    },
    /// List supported services
    Services {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Parse `NAME=PORT` for `--port`.
pub fn parse_port_override(value: &str) -> Result<(String, u16), String> {
    let (name, port) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PORT, got '{}'", value))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing service name in '{}'", value));
    }

    let port: u16 = port
        .trim()
        .parse()
        .map_err(|_| format!("invalid port in '{}'", value))?;
    if port == 0 {
        return Err(format!("port must not be 0 in '{}'", value));
    }

    Ok((name.to_string(), port))
}
