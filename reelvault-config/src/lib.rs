//! Configuration loading for the Reelvault media pipeline.
//!
//! Configuration comes from a TOML file with environment overrides for
//! secrets (`TMDB_API_KEY`). Every section has sensible defaults so a
//! missing file yields a runnable configuration.

mod loader;
mod models;

pub use loader::{load, load_or_default, ConfigError};
pub use models::{
    Config, StorageConfig, ThumbnailConfig, TmdbConfig, TranscodeConfig, WatchConfig,
};
