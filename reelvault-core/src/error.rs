use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("transcode failed: {0}")]
    Transcode(String),

    #[error("thumbnail generation failed: {0}")]
    Thumbnail(String),

    #[error("metadata lookup failed: {0}")]
    Lookup(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("catalog error: {0}")]
    Store(String),

    #[error("invalid media file: {0}")]
    InvalidMedia(String),

    #[error("watch error: {0}")]
    Watch(String),

    #[error("indexing {path:?} failed: {source}")]
    Index {
        path: PathBuf,
        #[source]
        source: Box<MediaError>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Wrap a component failure into the per-file umbrella error.
    pub fn index(path: impl Into<PathBuf>, source: MediaError) -> Self {
        Self::Index {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Render the full error chain for audit records.
    pub fn detail(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\n\nCaused by:\n");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_includes_chain() {
        let err = MediaError::index(
            "/media/input.mkv",
            MediaError::Transcode("encoder exited with status 1".into()),
        );
        let detail = err.detail();
        assert!(detail.contains("indexing"));
        assert!(detail.contains("Caused by"));
        assert!(detail.contains("encoder exited"));
    }
}
