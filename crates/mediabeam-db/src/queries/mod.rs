//! Query modules, one per table.

pub mod watch_history;
