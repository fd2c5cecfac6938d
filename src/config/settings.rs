//! Configuration settings for Synocast.

use crate::error::{Result, SynocastError};
use crate::pipeline::sanitize_file_name;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Minimum video duration applied when a source does not specify one.
pub const DEFAULT_MIN_DURATION_SECS: u64 = 60;

/// Timeout for a single stream manifest request.
pub const DEFAULT_MANIFEST_TIMEOUT_SECS: u64 = 30;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Sources to mirror, processed in declaration order.
    pub sources: Vec<SourceDescriptor>,
    /// Root directory for per-source folders (defaults to the working directory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<String>,
    /// Timeout for stream manifest requests, in seconds.
    #[serde(default = "default_manifest_timeout")]
    pub manifest_timeout_secs: u64,
}

fn default_manifest_timeout() -> u64 {
    DEFAULT_MANIFEST_TIMEOUT_SECS
}

fn default_min_duration() -> Option<u64> {
    Some(DEFAULT_MIN_DURATION_SECS)
}

/// Kind of remote feed a source points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceKind {
    /// A channel referenced by its `@handle`.
    ChannelHandle,
    /// A playlist referenced by URL.
    PlaylistUrl,
    /// Anything else; kept so the source can be reported and skipped at run time.
    Unsupported(String),
}

impl From<String> for SourceKind {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "channel_handle" => SourceKind::ChannelHandle,
            "playlist_url" => SourceKind::PlaylistUrl,
            _ => SourceKind::Unsupported(value),
        }
    }
}

impl From<SourceKind> for String {
    fn from(kind: SourceKind) -> Self {
        kind.to_string()
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::ChannelHandle => write!(f, "channel_handle"),
            SourceKind::PlaylistUrl => write!(f, "playlist_url"),
            SourceKind::Unsupported(other) => write!(f, "{}", other),
        }
    }
}

/// A single mirrored channel or playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Channel handle or playlist URL.
    pub url: String,
    /// Display name; also names the output directory.
    pub name: String,
    /// Number of most recent items to consider per run.
    pub max_items: usize,
    /// Preferred audio language code (e.g. `en`).
    pub language: String,
    /// Preferred container (e.g. `webm`); any container when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Maximum retained files; `max_items * 2` when unset, disabled when <= 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_downloads: Option<i64>,
    /// Videos shorter than this are skipped. An explicit `null` disables the check.
    #[serde(default = "default_min_duration")]
    pub min_duration_secs: Option<u64>,
}

impl SourceDescriptor {
    /// Effective retention cap, or `None` when retention is disabled.
    pub fn retention_cap(&self) -> Option<usize> {
        let cap = self
            .max_downloads
            .unwrap_or_else(|| (self.max_items as i64).saturating_mul(2));
        usize::try_from(cap).ok().filter(|cap| *cap > 0)
    }

    /// Container preference, ignoring blank values.
    pub fn container_preference(&self) -> Option<&str> {
        self.container
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Name of this source's directory under the output root.
    pub fn directory_name(&self) -> String {
        sanitize_file_name(&self.name)
    }
}

impl Settings {
    /// Load settings from the given path.
    ///
    /// Files ending in `.toml` are parsed as TOML, everything else as JSON.
    /// A missing or unparsable file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SynocastError::Config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let settings = Self::parse(&content, path)?;
        settings.validate()?;
        Ok(settings)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Ok(toml::from_str(content)?)
        } else {
            Ok(serde_json::from_str(content)?)
        }
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(SynocastError::Config("no sources configured".to_string()));
        }

        let mut directories: HashMap<String, &str> = HashMap::new();

        for (idx, source) in self.sources.iter().enumerate() {
            if source.name.trim().is_empty() {
                return Err(SynocastError::Config(format!(
                    "source #{} has an empty name",
                    idx + 1
                )));
            }
            if source.url.trim().is_empty() {
                return Err(SynocastError::Config(format!(
                    "source '{}' has an empty url",
                    source.name
                )));
            }
            if source.language.trim().is_empty() {
                return Err(SynocastError::Config(format!(
                    "source '{}' has an empty language",
                    source.name
                )));
            }

            let dir = source.directory_name();
            if dir == "." || dir == ".." {
                return Err(SynocastError::Config(format!(
                    "source name '{}' is not a usable directory name",
                    source.name
                )));
            }
            if let Some(other) = directories.insert(dir.clone(), &source.name) {
                return Err(SynocastError::Config(format!(
                    "sources '{}' and '{}' would share the directory '{}'",
                    other, source.name, dir
                )));
            }
        }

        Ok(())
    }

    /// Pick the configuration file: explicit path, `./config.json`, or the user config dir.
    pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
        if let Some(path) = explicit {
            return Self::expand_path(path);
        }

        let local = PathBuf::from("config.json");
        if local.exists() {
            return local;
        }

        dirs::config_dir()
            .map(|dir| dir.join("synocast").join("config.json"))
            .filter(|path| path.exists())
            .unwrap_or(local)
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Root under which each source gets its own directory.
    pub fn output_root(&self) -> PathBuf {
        match &self.output_directory {
            Some(dir) if !dir.trim().is_empty() => Self::expand_path(dir),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Directory a source's files are written to.
    pub fn source_dir(&self, source: &SourceDescriptor) -> PathBuf {
        self.output_root().join(source.directory_name())
    }

    pub fn manifest_timeout(&self) -> Duration {
        Duration::from_secs(self.manifest_timeout_secs)
    }
}
