//! Configuration types for ytdlp-engine
//!
//! Settings persist as a flat JSON object (one file, read at startup,
//! written on explicit save). A missing settings file is not an error;
//! defaults apply.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Engine configuration
///
/// Covers the destination directory, external tool paths, rate limits, and
/// custom flags applied to every invocation. Tool paths are optional: an
/// explicit path always wins, otherwise the binary is searched on `PATH`
/// (controlled by [`search_path`](Config::search_path)).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Download destination directory (default: "./downloads")
    #[serde(default = "default_destination")]
    pub destination: PathBuf,

    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for tools when explicit paths are not set
    /// (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Custom flags prepended to every download invocation
    /// (e.g. `["--cookies", "/path/to/cookies.txt"]`)
    #[serde(default)]
    pub custom_options: Vec<String>,

    /// Maximum download rate passed as `--limit-rate` (e.g. "4.2M")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_rate: Option<String>,

    /// Minimum rate below which yt-dlp re-extracts, passed as
    /// `--throttled-rate` (e.g. "100K")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttled_rate: Option<String>,

    /// Time bound in seconds for the one-shot `-J` listing fetch
    /// (default: 120). Large playlists can take a while to extract, but a
    /// hung fetch must not stall the caller forever.
    #[serde(default = "default_listing_timeout")]
    pub listing_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
            custom_options: Vec::new(),
            limit_rate: None,
            throttled_rate: None,
            listing_timeout_secs: default_listing_timeout(),
        }
    }
}

impl Config {
    /// Load settings from a JSON file.
    ///
    /// A missing file yields the default configuration; a present but
    /// malformed file is an error (surfaced, not silently replaced).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let config = serde_json::from_str(&contents)?;
                tracing::debug!(path = %path.display(), "Loaded settings");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write settings to a JSON file (pretty-printed, overwrites).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        tracing::info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Resolve the yt-dlp executable to invoke.
    ///
    /// An explicitly configured path wins. Otherwise the binary is looked up
    /// on `PATH`; if that fails the bare name is returned so the eventual
    /// spawn error carries the real diagnosis.
    pub fn ytdlp_executable(&self) -> PathBuf {
        if let Some(path) = &self.ytdlp_path {
            return path.clone();
        }
        if self.search_path
            && let Ok(found) = which::which("yt-dlp")
        {
            return found;
        }
        PathBuf::from("yt-dlp")
    }

    /// Resolve the ffmpeg location, if one is known.
    ///
    /// Returns None when ffmpeg is neither configured nor found on `PATH`;
    /// in that case no `--ffmpeg-location` flag is passed and yt-dlp does
    /// its own discovery.
    pub fn ffmpeg_executable(&self) -> Option<PathBuf> {
        if let Some(path) = &self.ffmpeg_path {
            return Some(path.clone());
        }
        if self.search_path {
            return which::which("ffmpeg").ok();
        }
        None
    }
}

fn default_destination() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_true() -> bool {
    true
}

fn default_listing_timeout() -> u64 {
    120
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_settings_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().join("settings.json")).unwrap();
        assert_eq!(config.destination, PathBuf::from("./downloads"));
        assert!(config.ytdlp_path.is_none());
        assert!(config.search_path);
        assert_eq!(config.listing_timeout_secs, 120);
    }

    #[test]
    fn settings_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let config = Config {
            destination: PathBuf::from("/media/videos"),
            ytdlp_path: Some(PathBuf::from("/usr/local/bin/yt-dlp")),
            ffmpeg_path: None,
            search_path: true,
            custom_options: vec!["--cookies".into(), "/tmp/c.txt".into()],
            limit_rate: Some("4.2M".into()),
            throttled_rate: None,
            listing_timeout_secs: 45,
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.destination, config.destination);
        assert_eq!(loaded.ytdlp_path, config.ytdlp_path);
        assert_eq!(loaded.custom_options, config.custom_options);
        assert_eq!(loaded.limit_rate, config.limit_rate);
        assert!(loaded.throttled_rate.is_none());
        assert_eq!(loaded.listing_timeout_secs, 45);
    }

    #[test]
    fn malformed_settings_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn explicit_ytdlp_path_wins_over_discovery() {
        let config = Config {
            ytdlp_path: Some(PathBuf::from("/opt/tools/yt-dlp")),
            ..Default::default()
        };
        assert_eq!(config.ytdlp_executable(), PathBuf::from("/opt/tools/yt-dlp"));
    }

    #[test]
    fn discovery_disabled_falls_back_to_bare_name() {
        let config = Config {
            search_path: false,
            ..Default::default()
        };
        assert_eq!(config.ytdlp_executable(), PathBuf::from("yt-dlp"));
        assert!(config.ffmpeg_executable().is_none());
    }
}
