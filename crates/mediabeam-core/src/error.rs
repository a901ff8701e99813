//! Unified error type for the mediabeam application.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for HTTP handlers to derive a status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in mediabeam.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "file", "subtitle track").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A byte-range request could not be satisfied against the resource.
    #[error("Unsatisfiable range: {0}")]
    UnsatisfiableRange(String),

    /// Media probing failed (tool exit, timeout, or unparsable output).
    #[error("Probe error: {0}")]
    Probe(String),

    /// An external tool (ffmpeg, ffprobe) failed to spawn or run.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::UnsatisfiableRange(_) => 416,
            Error::Probe(_) => 500,
            Error::Tool { .. } => 500,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("file", "movie.mp4");
        assert_eq!(err.to_string(), "file not found: movie.mp4");
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("path must be relative".into());
        assert_eq!(err.to_string(), "Validation error: path must be relative");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn unsatisfiable_range_maps_to_416() {
        let err = Error::UnsatisfiableRange("start beyond end of file".into());
        assert_eq!(err.http_status(), 416);
    }

    #[test]
    fn probe_maps_to_500() {
        let err = Error::Probe("ffprobe timed out".into());
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "failed to spawn");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: failed to spawn");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn database_display() {
        let err = Error::database("connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);
    }
}
