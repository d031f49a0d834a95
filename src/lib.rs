//! aeroscan - snapshot-consistent, range-partitioned parallel reads
//!
//! One logical read over a remote document database is split into many
//! bucket sub-queries over the 64-bit row id domain. Every sub-query runs at
//! the snapshot established by the first one; together they return each
//! matching row exactly once.
//!
//! # Layout
//!
//! - [`planner`]: bucket division and plan binding
//! - [`snapshot`]: set-once snapshot timestamp shared by a read
//! - [`executor`]: partition readers and the remote execution contract
//! - [`emitter`]: raw values to engine rows
//! - [`scan`]: host-facing batch and micro-batch entry points
//! - [`config`]: option maps, connection descriptors, config files
//! - [`memory`]: in-process MVCC database implementing the remote contract
//! - [`observability`]: structured logging and read counters
//! - [`cli`]: the `aeroscan` command line

pub mod cli;
pub mod config;
pub mod emitter;
pub mod executor;
pub mod memory;
pub mod observability;
pub mod planner;
pub mod scan;
pub mod snapshot;
