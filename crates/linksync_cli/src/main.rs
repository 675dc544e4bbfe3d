//! linksync CLI
//!
//! Runs the link server and inspects local buffer files.
//!
//! # Commands
//!
//! - `serve` - Load from the remote store, then serve HTTP with periodic sync
//! - `inspect` - Display buffer statistics
//! - `pending` - List records awaiting reconciliation
//! - `verify` - Check buffer integrity

mod commands;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// linksync link server and buffer tools.
#[derive(Parser)]
#[command(name = "linksync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local buffer file
    #[arg(global = true, short, long)]
    buffer: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind to
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Base URL of the remote store
        #[arg(long)]
        remote_url: Option<String>,

        /// User whose links are synced
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Display buffer statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List records awaiting reconciliation
    Pending {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify buffer integrity
    Verify,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            bind,
            remote_url,
            user,
        } => {
            commands::serve::run(commands::serve::Overrides {
                bind,
                buffer: cli.buffer,
                remote_url,
                user,
            })?;
        }
        Commands::Inspect { format } => {
            let path = commands::buffer_path(cli.buffer);
            commands::inspect::run(&path, &format)?;
        }
        Commands::Pending { format } => {
            let path = commands::buffer_path(cli.buffer);
            commands::pending::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = commands::buffer_path(cli.buffer);
            commands::verify::run(&path)?;
        }
        Commands::Version => {
            println!("linksync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("linksync core v{}", linksync_core::VERSION);
        }
    }

    Ok(())
}
