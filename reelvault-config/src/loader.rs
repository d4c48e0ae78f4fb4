use std::path::Path;

use thiserror::Error;

use crate::models::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Load configuration from a TOML file, then apply environment overrides.
pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    apply_env(&mut config);
    Ok(config)
}

/// Like [`load`], but a missing file falls back to defaults. Parse errors in
/// an existing file are still surfaced.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        let mut config = Config::default();
        apply_env(&mut config);
        return Ok(config);
    }
    load(path)
}

fn apply_env(config: &mut Config) {
    if let Ok(key) = std::env::var("TMDB_API_KEY") {
        if !key.is_empty() {
            config.tmdb.api_key = key;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_for_missing_file() {
        let config = load_or_default("/definitely/not/here.toml").unwrap();
        assert!(config.watch.enabled);
        assert!(!config.watch.remove_after_indexing);
        assert_eq!(config.transcode.quality_levels.len(), 3);
        assert_eq!(config.thumbnails.interval_secs, 10);
    }

    #[test]
    fn parses_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [watch]
            enabled = false
            directory = "/srv/ingest"
            remove_after_indexing = true
            retry_failed = true

            [transcode]
            hardware_accel = true
            quality_levels = [
                {{ height = 360, bitrate = 800, audio_bitrate = 96, crf = 32 }},
            ]

            [thumbnails]
            enabled = false
            interval_secs = 5

            [tmdb]
            api_key = "from-file"

            [storage]
            data_dir = "/srv/reelvault"
            "#
        )
        .unwrap();

        let config = load(file.path()).unwrap();
        assert!(!config.watch.enabled);
        assert!(config.watch.remove_after_indexing);
        assert!(config.watch.retry_failed);
        assert_eq!(config.transcode.quality_levels.len(), 1);
        assert_eq!(config.transcode.quality_levels[0].height, 360);
        assert_eq!(config.thumbnails.interval_secs, 5);
        assert_eq!(config.storage.data_dir.to_str(), Some("/srv/reelvault"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[watch]\nbogus = 1\n").unwrap();
        assert!(matches!(load(file.path()), Err(ConfigError::Parse { .. })));
    }
}
