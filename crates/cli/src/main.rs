use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use ticket_info_config::Config;
use ticket_info_output::{OutputFormat, OutputRenderer};
use ticket_info_tracker::{new_client, TicketError};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ticket-info", version, about = "Look up ticket metadata from an issue tracker", long_about = None)]
struct Cli {
    /// Path to config file (defaults to ~/.ticket-info/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for command results
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: TicketCommand,
}

#[derive(Subcommand, Debug, Clone)]
enum TicketCommand {
    /// Fetch a ticket and print its details
    Fetch {
        /// Ticket ID (e.g. DEV-123)
        ticket: String,

        /// Override the configured lookup mode
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// Check whether the configured lookup backend can be used
    Check {
        /// Override the configured lookup mode
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    Cli,
    Api,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Cli => "cli",
            Mode::Api => "api",
        }
    }
}

#[derive(Serialize)]
struct Availability {
    mode: String,
    available: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let mut config = Config::load(cli.config.as_ref())?;
    let renderer = OutputRenderer::new(cli.output);

    match cli.command {
        TicketCommand::Fetch { ticket, mode } => {
            apply_mode(&mut config, mode);
            let client = new_client(&config).map_err(describe)?;
            let info = client
                .fetch_ticket_details(&ticket)
                .await
                .map_err(describe)?;
            renderer.render(&info)?;
        }
        TicketCommand::Check { mode } => {
            apply_mode(&mut config, mode);
            let client = new_client(&config).map_err(describe)?;
            let status = Availability {
                mode: config
                    .tracker
                    .mode
                    .clone()
                    .unwrap_or_else(|| Mode::Cli.as_str().to_string()),
                available: client.is_available(),
            };
            renderer.render(&status)?;
            if !status.available {
                bail!("{} backend is not available", status.mode);
            }
        }
    }

    Ok(())
}

fn apply_mode(config: &mut Config, mode: Option<Mode>) {
    if let Some(mode) = mode {
        debug!(mode = mode.as_str(), "Mode overridden on command line");
        config.tracker.mode = Some(mode.as_str().to_string());
    }
}

fn describe(err: TicketError) -> anyhow::Error {
    let hint = err.suggestion().map(str::to_string);
    match hint {
        Some(hint) => anyhow!("{err}\nhint: {hint}"),
        None => anyhow!(err),
    }
}

fn init_tracing(debug: bool) -> Result<()> {
    let default = if debug {
        "info,ticket_info=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}
