//! Result row emission
//!
//! Turns raw result values, always handled as text, into engine rows. Both
//! the plan reader and the custom code reader go through the same emitter.

mod emitter;
mod row;
mod schema;

pub use emitter::{EmitMode, ResultRowEmitter};
pub use row::{FieldValue, Row};
pub use schema::{DataType, FieldSpec, OutputSchema, CORRUPT_RECORD_COLUMN, PASSTHROUGH_COLUMN};
