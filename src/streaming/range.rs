//! HTTP `Range` header resolution.
//!
//! Parseable-but-out-of-bounds endpoints are clamped rather than rejected;
//! players routinely probe with large or open-ended ranges. Only malformed
//! headers and empty windows fail, mapping to HTTP 416.

use mediabeam_core::{Error, Result};

/// A validated byte window over a resource of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    /// First byte offset (inclusive).
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
    /// Total resource size in bytes.
    pub total: u64,
}

impl ResolvedRange {
    /// Number of bytes in the window (`Content-Length` of a 206 response).
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// The `Content-Range` header value for a 206 response.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Resolve an optional `Range` header against a resource's total size.
///
/// `Ok(None)` means no header: serve the full resource with
/// `Accept-Ranges: bytes`. Supported forms: `bytes=S-E`, `bytes=S-`,
/// `bytes=-N` (last N bytes). Both endpoints are clamped into
/// `[0, total - 1]`; a malformed header or an empty window after clamping is
/// an [`Error::UnsatisfiableRange`].
pub fn resolve_range(header: Option<&str>, total: u64) -> Result<Option<ResolvedRange>> {
    let Some(value) = header else {
        return Ok(None);
    };

    // A zero-length resource has no valid byte window.
    if total == 0 {
        return Err(Error::UnsatisfiableRange(
            "empty resource cannot satisfy a range".into(),
        ));
    }

    let spec = value
        .strip_prefix("bytes=")
        .ok_or_else(|| Error::UnsatisfiableRange(format!("unsupported range unit: {value}")))?;

    let (start_str, end_str) = spec
        .split_once('-')
        .ok_or_else(|| Error::UnsatisfiableRange(format!("malformed range: {value}")))?;

    let start_str = start_str.trim();
    let end_str = end_str.trim();

    let (start, end) = match (start_str.is_empty(), end_str.is_empty()) {
        // bytes=- is meaningless.
        (true, true) => {
            return Err(Error::UnsatisfiableRange(format!("malformed range: {value}")));
        }
        // bytes=-N: the last N bytes.
        (true, false) => {
            let suffix: u64 = end_str
                .parse()
                .map_err(|_| Error::UnsatisfiableRange(format!("malformed range: {value}")))?;
            if suffix == 0 {
                return Err(Error::UnsatisfiableRange(format!("empty suffix range: {value}")));
            }
            (total.saturating_sub(suffix), total - 1)
        }
        // bytes=S-: from S to the end.
        (false, true) => {
            let start: u64 = start_str
                .parse()
                .map_err(|_| Error::UnsatisfiableRange(format!("malformed range: {value}")))?;
            (start, total - 1)
        }
        // bytes=S-E.
        (false, false) => {
            let start: u64 = start_str
                .parse()
                .map_err(|_| Error::UnsatisfiableRange(format!("malformed range: {value}")))?;
            let end: u64 = end_str
                .parse()
                .map_err(|_| Error::UnsatisfiableRange(format!("malformed range: {value}")))?;
            (start, end.min(total - 1))
        }
    };

    if start >= total || start > end {
        return Err(Error::UnsatisfiableRange(format!(
            "range {value} out of bounds for size {total}"
        )));
    }

    Ok(Some(ResolvedRange { start, end, total }))
}
