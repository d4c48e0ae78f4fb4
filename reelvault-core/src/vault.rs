//! On-disk layout for persisted artifacts.
//!
//! The save-directory tree has `image/` and `video/` subdirectories whose
//! files are keyed by entity identity, so serving a part or image is a pure
//! path computation.

use std::path::{Path, PathBuf};

use reelvault_model::{Image, StreamPart};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct MediaVault {
    root: PathBuf,
}

impl MediaVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory tree if it does not exist yet.
    pub async fn ensure_layout(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.image_dir()).await?;
        tokio::fs::create_dir_all(self.video_dir()).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root.join("image")
    }

    pub fn video_dir(&self) -> PathBuf {
        self.root.join("video")
    }

    /// Permanent location of a playlist or segment artifact.
    pub fn stream_part_path(&self, part: &StreamPart) -> PathBuf {
        self.video_dir().join(part.file_name())
    }

    /// Permanent location of an image payload.
    pub fn image_path(&self, image: &Image) -> PathBuf {
        self.image_dir().join(image.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn layout_is_created_once() {
        let tmp = tempfile::tempdir().unwrap();
        let vault = MediaVault::new(tmp.path());
        vault.ensure_layout().await.unwrap();
        vault.ensure_layout().await.unwrap();
        assert!(vault.image_dir().is_dir());
        assert!(vault.video_dir().is_dir());
    }

    #[test]
    fn artifact_paths_are_identity_keyed() {
        let vault = MediaVault::new("/data");
        let part = StreamPart::new_segment();
        assert_eq!(
            vault.stream_part_path(&part),
            PathBuf::from(format!("/data/video/{}.ts", part.id))
        );

        let image = Image::jpeg();
        assert_eq!(
            vault.image_path(&image),
            PathBuf::from(format!("/data/image/{}.jpg", image.id))
        );
    }
}
