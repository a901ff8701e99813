//! Byte streaming: range-aware direct serving and transcoded sessions.

pub mod direct;
pub mod range;
pub mod transcode;

use std::path::{Component, Path, PathBuf};

use mediabeam_core::{media, Error, Result};
use mediabeam_db::{pool, queries::watch_history};

use crate::server::AppContext;

/// Resolve a request path against the library root.
///
/// Only plain relative components are accepted; anything that could escape
/// the root (absolute paths, `..`, `.`) is rejected before touching the
/// filesystem.
pub fn resolve_media_path(root: &Path, request_path: &str) -> Result<PathBuf> {
    let rel = Path::new(request_path);

    if rel.as_os_str().is_empty() {
        return Err(Error::Validation("empty path".into()));
    }

    for component in rel.components() {
        match component {
            Component::Normal(_) => {}
            _ => return Err(Error::Validation("path must be relative".into())),
        }
    }

    Ok(root.join(rel))
}

/// Record one logical playback start for the watch history.
///
/// Persistence failures never affect the in-flight byte stream; they are
/// logged and swallowed here.
pub(crate) fn report_view(
    ctx: &AppContext,
    client_id: &str,
    request_path: &str,
    file_path: &Path,
    file_size: u64,
) {
    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| request_path.to_string());
    let file_type = media::category_for_path(file_path).to_string();

    let result = pool::get_conn(&ctx.db).and_then(|conn| {
        watch_history::record_view(
            &conn,
            client_id,
            request_path,
            &file_name,
            &file_type,
            file_size as i64,
        )
    });

    if let Err(e) = result {
        tracing::warn!(client = client_id, path = request_path, error = %e, "failed to record view");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_relative_path_resolves() {
        let resolved = resolve_media_path(Path::new("/srv/media"), "shows/ep1.mkv").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/media/shows/ep1.mkv"));
    }

    #[test]
    fn parent_traversal_is_rejected() {
        assert!(resolve_media_path(Path::new("/srv/media"), "../etc/passwd").is_err());
        assert!(resolve_media_path(Path::new("/srv/media"), "a/../../b").is_err());
    }

    #[test]
    fn absolute_path_is_rejected() {
        assert!(resolve_media_path(Path::new("/srv/media"), "/etc/passwd").is_err());
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(resolve_media_path(Path::new("/srv/media"), "").is_err());
    }
}
