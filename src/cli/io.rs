//! JSON output handling for CLI
//!
//! - Rows: one JSON object per line on stdout
//! - Logs stay on stderr, so stdout can be piped as-is
//! - UTF-8 only

use std::io::{self, BufWriter, Stdout, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::emitter::Row;

use super::errors::CliResult;

/// Line-oriented row output shared by every partition worker.
///
/// Each row is written under the lock, so lines from different partitions
/// never interleave.
#[derive(Clone)]
pub struct RowSink {
    out: Arc<Mutex<BufWriter<Stdout>>>,
}

impl RowSink {
    pub fn stdout() -> Self {
        Self {
            out: Arc::new(Mutex::new(BufWriter::new(io::stdout()))),
        }
    }

    /// Write one row as a JSON line
    pub fn write_row(&self, row: &Row) -> CliResult<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *out, &row.to_json())?;
        writeln!(out)?;
        Ok(())
    }

    pub fn flush(&self) -> CliResult<()> {
        self.out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()?;
        Ok(())
    }
}

/// Write plain text to stdout
pub fn write_text(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", text)?;
    stdout.flush()?;

    Ok(())
}
