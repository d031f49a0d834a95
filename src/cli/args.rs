//! CLI argument definitions using clap
//!
//! Commands:
//! - aeroscan explain --config <path>
//! - aeroscan read --config <path>
//! - aeroscan stream --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aeroscan - snapshot-consistent parallel range reads
#[derive(Parser, Debug)]
#[command(name = "aeroscan")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Minimum log severity: trace, info, warn or error
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the partition layout of the configured plan
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroscan.json")]
        config: PathBuf,
    },

    /// Run a partitioned batch read and print one JSON line per row
    Read {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroscan.json")]
        config: PathBuf,
    },

    /// Run the read as successive micro-batches, one partition each
    Stream {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroscan.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
