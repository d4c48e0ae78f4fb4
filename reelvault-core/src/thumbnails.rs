//! Preview frame generation.
//!
//! Emits one small frame per fixed interval, then persists each frame as an
//! `Image` with a `Thumbnail` covering its time range. The encoder also
//! writes a frame at time zero before the first full interval elapses; that
//! boundary artifact is discarded.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use futures::future::try_join_all;
use reelvault_model::{Image, Thumbnail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, Result};
use crate::store::Catalog;
use crate::transcode::parse_progress_secs;
use crate::vault::MediaVault;

/// Fraction-complete callback fired from the extractor's event stream.
pub type FrameProgress = Arc<dyn Fn(f32) + Send + Sync>;

const FRAME_WIDTH: u32 = 150;

#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    ffmpeg_path: String,
    interval_secs: u32,
}

impl ThumbnailGenerator {
    pub fn new(ffmpeg_path: impl Into<String>, interval_secs: u32) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            interval_secs: interval_secs.max(1),
        }
    }

    /// Generate and persist thumbnails for `source`, in time order.
    pub async fn generate(
        &self,
        source: &Path,
        duration_secs: Option<f64>,
        vault: &MediaVault,
        catalog: &dyn Catalog,
        progress: FrameProgress,
    ) -> Result<Vec<Thumbnail>> {
        let work_dir = tempfile::tempdir()?;
        self.extract_frames(source, work_dir.path(), duration_secs, progress)
            .await?;

        import_frames(work_dir.path(), self.interval_secs, vault, catalog).await
    }

    async fn extract_frames(
        &self,
        source: &Path,
        out_dir: &Path,
        duration_secs: Option<f64>,
        progress: FrameProgress,
    ) -> Result<()> {
        let filter = format!("fps=1/{},scale={FRAME_WIDTH}:-2", self.interval_secs);
        let mut child = Command::new(&self.ffmpeg_path)
            .arg("-hide_banner")
            .arg("-y")
            .arg("-i")
            .arg(source)
            .arg("-vf")
            .arg(&filter)
            .arg(out_dir.join("%04d.jpg"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| MediaError::Thumbnail(format!("failed to spawn ffmpeg: {err}")))?;

        let stderr = child.stderr.take().ok_or_else(|| {
            MediaError::Thumbnail("ffmpeg stderr was not captured".to_string())
        })?;

        let monitor = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail: Vec<String> = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if let (Some(done), Some(total)) = (parse_progress_secs(&line), duration_secs) {
                    if total > 0.0 {
                        progress((done / total).clamp(0.0, 1.0) as f32);
                    }
                }
                tail.push(line);
                if tail.len() > 20 {
                    tail.remove(0);
                }
            }
            tail.join("\n")
        });

        let status = child.wait().await?;
        let tail = monitor.await.unwrap_or_default();

        if !status.success() {
            return Err(MediaError::Thumbnail(format!(
                "ffmpeg exited with {status}: {tail}"
            )));
        }
        Ok(())
    }
}

/// Persist every extracted frame except the time-zero boundary artifact,
/// concurrently, returning thumbnails in time order.
async fn import_frames(
    work_dir: &Path,
    interval_secs: u32,
    vault: &MediaVault,
    catalog: &dyn Catalog,
) -> Result<Vec<Thumbnail>> {
    let mut frames = frame_files(work_dir)?;
    if frames.is_empty() {
        return Ok(Vec::new());
    }
    frames.remove(0);
    debug!(count = frames.len(), "importing thumbnail frames");

    let imports = frames.iter().enumerate().map(|(i, frame)| {
        let frame = work_dir.join(frame);
        async move {
            let image = Image::jpeg();
            tokio::fs::copy(&frame, vault.image_path(&image)).await?;
            catalog.save_image(&image).await?;
            let index = i as u32;
            Ok::<_, MediaError>(Thumbnail::new(
                index * interval_secs,
                (index + 1) * interval_secs - 1,
                image.id,
            ))
        }
    });

    try_join_all(imports).await
}

/// Frame file names in the working directory, in emission order.
fn frame_files(dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".jpg"))
        .collect();
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCatalog;

    #[test]
    fn frames_sort_in_emission_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0003.jpg", "0001.jpg", "0002.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let frames = frame_files(dir.path()).unwrap();
        assert_eq!(frames, vec!["0001.jpg", "0002.jpg", "0003.jpg"]);
    }

    #[tokio::test]
    async fn import_skips_boundary_frame_and_ranges_line_up() {
        let work = tempfile::tempdir().unwrap();
        for name in ["0001.jpg", "0002.jpg", "0003.jpg", "0004.jpg"] {
            std::fs::write(work.path().join(name), b"frame").unwrap();
        }
        let data = tempfile::tempdir().unwrap();
        let vault = MediaVault::new(data.path());
        vault.ensure_layout().await.unwrap();
        let catalog = MemoryCatalog::new();

        let thumbs = import_frames(work.path(), 10, &vault, &catalog).await.unwrap();

        assert_eq!(thumbs.len(), 3);
        assert_eq!((thumbs[0].from_secs, thumbs[0].to_secs), (0, 9));
        assert_eq!((thumbs[2].from_secs, thumbs[2].to_secs), (20, 29));
        assert_eq!(catalog.images().len(), 3);
        for thumb in &thumbs {
            let image = catalog
                .images()
                .into_iter()
                .find(|img| img.id == thumb.image)
                .unwrap();
            assert!(vault.image_path(&image).exists());
        }
    }

    #[tokio::test]
    async fn missing_encoder_surfaces_thumbnail_error() {
        let data = tempfile::tempdir().unwrap();
        let vault = MediaVault::new(data.path());
        vault.ensure_layout().await.unwrap();
        let catalog = MemoryCatalog::new();

        let generator = ThumbnailGenerator::new("/definitely/not/ffmpeg", 10);
        let err = generator
            .generate(
                Path::new("/in/a.mkv"),
                Some(600.0),
                &vault,
                &catalog,
                Arc::new(|_: f32| {}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Thumbnail(_)));
        assert!(catalog.images().is_empty());
    }

    #[tokio::test]
    async fn empty_working_directory_yields_no_thumbnails() {
        let work = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let vault = MediaVault::new(data.path());
        vault.ensure_layout().await.unwrap();
        let catalog = MemoryCatalog::new();

        let thumbs = import_frames(work.path(), 10, &vault, &catalog).await.unwrap();
        assert!(thumbs.is_empty());
    }
}
