//! Host-facing partition reader contract

use crate::emitter::Row;

use super::errors::ReadResult;

/// Pull-based reader over one input partition.
///
/// The host calls `open`, then alternates `has_next`/`next_row` until
/// `has_next` returns false, then `close`. `has_next` does the remote work;
/// `next_row` only hands out rows already fetched.
pub trait PartitionReader: Send {
    /// Prepares the reader. Calling `has_next` first opens implicitly.
    fn open(&mut self) -> ReadResult<()>;

    /// True if another row is available, fetching more if needed
    fn has_next(&mut self) -> ReadResult<bool>;

    /// Returns the next row, or `None` once the partition is exhausted
    fn next_row(&mut self) -> ReadResult<Option<Row>>;

    /// Releases buffered rows and remote results
    fn close(&mut self);

    /// Drains the reader into a vector and closes it
    fn read_all(&mut self) -> ReadResult<Vec<Row>> {
        self.open()?;
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        self.close();
        Ok(rows)
    }
}
