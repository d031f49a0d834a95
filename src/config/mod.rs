//! Read configuration
//!
//! - [`ReadOptions`]: string option map from a host engine
//! - [`ConnectionDescriptor`]: `username:password@host:port[/databaseName]`
//! - [`ReadConfig`]: JSON file used by the command line
//!
//! All validation failures are `AERO_READ_INVALID_ARGUMENT` and happen before
//! any remote call.

mod connection;
mod file;
mod options;

pub use connection::ConnectionDescriptor;
pub use file::ReadConfig;
pub use options::{
    ReadOptions, ReadSource, CLIENT_URI, DEFAULT_BATCH_SIZE, DEFAULT_NUM_PARTITIONS,
    READ_BATCH_SIZE, READ_INVOKE, READ_NUM_PARTITIONS, READ_PLAN, READ_SCHEMA, READ_SCRIPT,
    READ_VARS_PREFIX,
};
