//! Mediabeam - HTTP media streaming with on-demand transcoding
//!
//! This library crate exposes the server and streaming modules for
//! integration testing.

pub mod server;
pub mod streaming;
