// SPDX-License-Identifier: GPL-3.0-only

use barcode_scanner::backends::Symbology;
use clap::{Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(name = "barcode-scanner")]
#[command(about = "Terminal barcode scanner with live camera preview")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Scan for barcodes (the default when no subcommand is given)
    Scan {
        /// Capture device path (default: first enumerated camera)
        #[arg(short, long)]
        device: Option<String>,

        /// Symbologies to recognize (default: ean8, ean13, pdf417)
        #[arg(short, long, value_enum)]
        symbology: Vec<Symbology>,

        /// Scan without the terminal preview
        #[arg(long)]
        headless: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=barcode_scanner=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List) => cli::list_devices(),
        Some(Commands::Scan {
            device,
            symbology,
            headless,
        }) => cli::run(device, symbology, headless),
        None => cli::run(None, Vec::new(), false),
    }
}
