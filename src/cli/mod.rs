//! CLI module for aeroscan
//!
//! Provides command-line interface for:
//! - explain: Print the partition layout of a plan
//! - read: Partitioned batch read to stdout
//! - stream: Micro-batch read to stdout

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{explain, read, run, run_command, stream};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_text, RowSink};
