//! confsync CLI
//!
//! Command-line tools for inspecting remote configuration traffic.
//!
//! # Commands
//!
//! - `inspect` - Decode a recorded agent response and check it
//! - `replay` - Feed recorded responses through a client, cycle by cycle
//! - `capabilities` - Print the capability token for a set of flags
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use commands::capabilities::Flag;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// confsync remote configuration tools.
#[derive(Parser)]
#[command(name = "confsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a recorded agent response body and check it
    Inspect {
        /// File holding the JSON body returned by the agent
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Replay recorded agent responses through a client
    Replay {
        /// Files holding JSON bodies, served one per cycle in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Products to subscribe to (all products when omitted)
        #[arg(short, long)]
        product: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the capability token for a set of flags
    Capabilities {
        /// Flags to set
        #[arg(value_enum)]
        flags: Vec<Flag>,

        /// Set every known flag
        #[arg(short, long)]
        all: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { file, format } => {
            commands::inspect::run(&file, &format)?;
        }
        Commands::Replay {
            files,
            product,
            format,
        } => {
            commands::replay::run(&files, &product, &format)?;
        }
        Commands::Capabilities { flags, all } => {
            commands::capabilities::run(&flags, all);
        }
        Commands::Version => {
            println!("confsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("confsync Core v{}", confsync_core::VERSION);
        }
    }

    Ok(())
}
