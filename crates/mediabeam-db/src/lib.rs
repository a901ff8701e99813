//! SQLite persistence layer for mediabeam.
//!
//! Watch history is keyed by `(client_id, file_path)`; every operation is a
//! single self-contained statement so concurrent sessions never hold locks
//! across calls.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
