//! External tool detection.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the external
//! CLI tools mediabeam depends on (ffmpeg, ffprobe) and provides lookup
//! methods for the rest of the workspace.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use mediabeam_core::config::ToolsConfig;
use mediabeam_core::{Error, Result};

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool paths.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, a config-supplied path that exists is used
    /// directly; otherwise [`which::which`] locates the tool in `PATH`.
    /// Tools that are not found are omitted from the registry.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "ffmpeg" => tools_config.ffmpeg_path.as_deref(),
                "ffprobe" => tools_config.ffprobe_path.as_deref(),
                _ => None,
            };

            let resolved = if let Some(p) = custom_path {
                if p.exists() {
                    Some(p.to_path_buf())
                } else {
                    // Custom path does not exist; fall back to PATH.
                    which::which(name).ok()
                }
            } else {
                which::which(name).ok()
            };

            if let Some(path) = resolved {
                tools.insert(name.to_string(), path);
            }
        }

        Self { tools }
    }

    /// Return the resolved path for the given tool, or [`Error::Tool`] if it
    /// was not found during discovery.
    pub fn require(&self, name: &str) -> Result<&PathBuf> {
        self.tools.get(name).ok_or_else(|| Error::Tool {
            tool: name.to_string(),
            message: format!("{name} not found; is it installed and in PATH?"),
        })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| {
                if let Some(path) = self.tools.get(name) {
                    ToolInfo {
                        name: name.to_string(),
                        available: true,
                        version: detect_version(path),
                        path: Some(path.clone()),
                    }
                } else {
                    ToolInfo {
                        name: name.to_string(),
                        available: false,
                        version: None,
                        path: None,
                    }
                }
            })
            .collect()
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &PathBuf) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_with_default_config() {
        let cfg = ToolsConfig::default();
        let registry = ToolRegistry::discover(&cfg);
        // We cannot guarantee any tool is installed in CI,
        // but the call itself must not panic.
        let _ = registry.check_all();
    }

    #[test]
    fn require_missing_tool_returns_error() {
        let cfg = ToolsConfig::default();
        let registry = ToolRegistry::discover(&cfg);
        let result = registry.require("nonexistent_tool_xyz");
        assert!(result.is_err());
    }

    #[test]
    fn check_all_returns_known_tools() {
        let cfg = ToolsConfig::default();
        let registry = ToolRegistry::discover(&cfg);
        let infos = registry.check_all();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert!(names.contains(&"ffmpeg"));
        assert!(names.contains(&"ffprobe"));
    }

    #[test]
    fn missing_custom_path_falls_back_to_path_lookup() {
        let cfg = ToolsConfig {
            ffmpeg_path: Some(PathBuf::from("/nonexistent/ffmpeg")),
            ffprobe_path: None,
        };
        let registry = ToolRegistry::discover(&cfg);
        // Either found via PATH or absent, but never the bogus custom path.
        if let Ok(path) = registry.require("ffmpeg") {
            assert_ne!(path, &PathBuf::from("/nonexistent/ffmpeg"));
        }
    }
}
