use std::path::PathBuf;

use reelvault_model::quality::{default_ladder, QualityLevel};
use serde::{Deserialize, Serialize};

/// Root configuration consumed by the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
    #[serde(default)]
    pub thumbnails: ThumbnailConfig,
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Directory watching and queue admission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Whether the filesystem watcher starts at boot.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory scanned at startup and watched for new files.
    #[serde(default = "default_watch_directory")]
    pub directory: PathBuf,
    /// Delete the source file after a successful index run.
    #[serde(default)]
    pub remove_after_indexing: bool,
    /// Re-admit paths whose previous index run failed. Succeeded paths are
    /// never reprocessed.
    #[serde(default)]
    pub retry_failed: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_watch_directory(),
            remove_after_indexing: false,
            retry_failed: false,
        }
    }
}

/// Transcode pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscodeConfig {
    /// Request hardware-accelerated decode from the toolkit.
    #[serde(default)]
    pub hardware_accel: bool,
    /// The adaptive-bitrate ladder, lowest rung first.
    #[serde(default = "default_ladder")]
    pub quality_levels: Vec<QualityLevel>,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            hardware_accel: false,
            quality_levels: default_ladder(),
        }
    }
}

/// Preview thumbnail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThumbnailConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// One preview frame every this many seconds.
    #[serde(default = "default_thumbnail_interval")]
    pub interval_secs: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_thumbnail_interval(),
        }
    }
}

/// Remote metadata provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TmdbConfig {
    /// API key; the `TMDB_API_KEY` environment variable overrides this.
    #[serde(default)]
    pub api_key: String,
}

/// Persistent artifact storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root of the save-directory tree (`image/` and `video/` live below it).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_watch_directory() -> PathBuf {
    PathBuf::from("./ingest")
}

fn default_thumbnail_interval() -> u32 {
    10
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
