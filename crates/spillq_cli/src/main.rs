//! spillq CLI
//!
//! Command-line tools for spillq queues.
//!
//! # Commands
//!
//! - `soak` - Drive a queue with concurrent producers and one consumer
//! - `inspect` - List the spill files in a spill directory

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// spillq command-line tools.
#[derive(Parser)]
#[command(name = "spillq")]
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
    /// Run producers and a consumer against a queue and verify delivery
    Soak {
        /// Directory under which the spill directory is created
        #[arg(short, long)]
        root: PathBuf,

        /// Number of producer threads
        #[arg(long, default_value = "4")]
        producers: usize,

        /// Elements pushed by each producer
        #[arg(long, default_value = "25000")]
        per_producer: usize,

        /// Heap capacity of the queue
        #[arg(long, default_value = "3000")]
        heap: usize,

        /// Page size of the queue
        #[arg(long, default_value = "1000")]
        page: usize,

        /// Largest batch the consumer drains at once
        #[arg(long, default_value = "500")]
        batch: usize,

        /// Payload body length in bytes
        #[arg(long, default_value = "64")]
        payload_size: usize,

        /// Spill file encoding (json, cbor)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Log a queue summary every this many seconds (default 10)
        #[arg(long)]
        monitor_secs: Option<u64>,
    },

    /// List the spill files in a spill directory
    Inspect {
        /// Spill directory (`<root>/<name>`)
        dir: PathBuf,

        /// Spill file encoding (json, cbor)
        #[arg(short, long, default_value = "json")]
        codec: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
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
        Commands::Soak {
            root,
            producers,
            per_producer,
            heap,
            page,
            batch,
            payload_size,
            format,
            monitor_secs,
        } => {
            let options = commands::soak::SoakOptions {
                root,
                producers,
                per_producer,
                heap_capacity: heap,
                page_size: page,
                max_batch: batch,
                payload_size,
                codec: format.parse()?,
                monitor_secs,
            };
            commands::soak::run(&options)?;
        }
        Commands::Inspect { dir, codec, format } => {
            commands::inspect::run(&dir, codec.parse()?, &format)?;
        }
        Commands::Version => {
            println!("spillq CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("spillq Core v{}", spillq_core::VERSION);
        }
    }

    Ok(())
}
