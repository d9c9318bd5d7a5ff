// SQLite module - statement execution over rusqlite
//
// - params: conversion from `SqlValue` to rusqlite values
// - query: row decoding and result set building
// - executor: the `StatementEngine` seam used by query builders
// - connection: the per-connection lock
// - transaction: depth-counted transactions and savepoints on a locked connection
// - crud: primary-key based record helpers

pub mod connection;
pub mod crud;
pub mod executor;
pub mod params;
pub mod query;
pub mod transaction;

pub use connection::{ConnectionWithLock, LockedConnection};
pub use crud::RecordStore;
pub use executor::StatementEngine;
pub use params::Params;
pub use query::build_result_set;
