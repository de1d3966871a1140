//! `loopcam` command line
//!
//! ```bash
//! loopcam list
//! loopcam cast -d /dev/video0 -d /dev/video1 --fps 20
//! loopcam config init
//! ```

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::filter::{Directive, EnvFilter};

#[derive(Parser)]
#[command(name = "loopcam", version, propagate_version = true)]
#[command(about = "Feed one frame stream to several v4l2loopback virtual cameras")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show video nodes and which of them are loopback outputs
    #[command(alias = "ls")]
    List,

    /// Send a test pattern to one or more virtual cameras
    Cast(commands::CastArgs),

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

impl Commands {
    async fn run(self) -> Result<()> {
        match self {
            Self::List => commands::list().await,
            Self::Cast(args) => commands::cast(args).await,
            Self::Config(args) => commands::config(args).await,
        }
    }
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// `RUST_LOG` still applies; `-v` sets the level of every `loopcam*` target
fn init_logging(verbose: u8) -> Result<()> {
    let directive: Directive = format!("loopcam={}", log_level(verbose))
        .parse()
        .context("Invalid log directive")?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    cli.command.run().await
}
