//! CustomCodeReader: single-partition reader over server-side code
//!
//! The code runs once, on the first `has_next`. Each value it returns is
//! handed to the emitter as text, in order.

use std::sync::Arc;
use std::vec;

use crate::emitter::{ResultRowEmitter, Row};
use crate::observability::{log_event_with_fields, Event, ReadMetrics};
use crate::snapshot::CancelToken;

use super::errors::{ReadError, ReadResult};
use super::reader::PartitionReader;
use super::remote::{CodeCall, CodeService};

/// Reads the values produced by one server-side invocation.
pub struct CustomCodeReader {
    service: Arc<dyn CodeService>,
    call: CodeCall,
    emitter: ResultRowEmitter,
    metrics: Arc<ReadMetrics>,
    cancel: CancelToken,
    results: Option<vec::IntoIter<String>>,
    closed: bool,
}

impl CustomCodeReader {
    pub fn new(
        service: Arc<dyn CodeService>,
        call: CodeCall,
        emitter: ResultRowEmitter,
        metrics: Arc<ReadMetrics>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            service,
            call,
            emitter,
            metrics,
            cancel,
            results: None,
            closed: false,
        }
    }

    pub fn call(&self) -> &CodeCall {
        &self.call
    }

    fn invoke(&mut self) -> ReadResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ReadError::Cancelled);
        }

        let values = self.service.invoke(&self.call)?;

        let count = values.len().to_string();
        let vars = self.call.vars.len().to_string();
        log_event_with_fields(
            Event::CodeInvoked,
            &[("results", count.as_str()), ("vars", vars.as_str())],
        );

        self.results = Some(values.into_iter());
        Ok(())
    }
}

impl PartitionReader for CustomCodeReader {
    fn open(&mut self) -> ReadResult<()> {
        if self.closed {
            return Err(ReadError::invalid_argument("Custom code reader is closed"));
        }
        Ok(())
    }

    fn has_next(&mut self) -> ReadResult<bool> {
        self.open()?;
        if self.results.is_none() {
            self.invoke()?;
        }
        if self.cancel.is_cancelled() {
            return Err(ReadError::Cancelled);
        }
        Ok(self
            .results
            .as_ref()
            .map(|it| !it.as_slice().is_empty())
            .unwrap_or(false))
    }

    fn next_row(&mut self) -> ReadResult<Option<Row>> {
        if !self.has_next()? {
            return Ok(None);
        }
        let raw = match self.results.as_mut().and_then(Iterator::next) {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let row = self.emitter.emit(&raw);
        if row.is_corrupted() {
            self.metrics.increment_corrupted_records();
            log_event_with_fields(Event::CorruptedRecord, &[("raw", raw.as_str())]);
        }
        self.metrics.increment_rows_emitted();
        Ok(Some(row))
    }

    fn close(&mut self) {
        self.results = None;
        self.closed = true;
    }
}
