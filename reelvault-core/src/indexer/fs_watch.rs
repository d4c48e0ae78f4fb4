//! Filesystem watching bridged onto the ingestion queue.
//!
//! Startup enumerates the directory recursively so files that arrived while
//! the process was down are picked up, then a recursive watcher reports new
//! arrivals. Every sighting goes through the queue's debounce window, so a
//! file still being written settles before it is indexed.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::Indexer;
use crate::error::{MediaError, Result};

const EVENT_BUFFER: usize = 256;

/// In-progress download markers; these settle into their final name later.
const IGNORED_SUFFIXES: &[&str] = &[".part", ".!qb", ".!ut", ".tmp"];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "m4v", "avi", "mov", "webm", "wmv", "flv", "mpg", "mpeg", "ts",
];

/// Keeps the underlying watcher alive; dropping it stops event delivery.
pub struct WatchGuard {
    _watcher: RecommendedWatcher,
}

/// Watch `dir` recursively, feeding media file sightings to the indexer.
pub async fn watch_directory(dir: &Path, indexer: Indexer) -> Result<WatchGuard> {
    scan_existing(dir, &indexer).await?;

    let (tx, mut rx) = mpsc::channel::<Event>(EVENT_BUFFER);
    let mut watcher =
        notify::recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(event) => {
                // Callback runs on the watcher's own thread.
                let _ = tx.blocking_send(event);
            }
            Err(err) => warn!(error = %err, "watch event error"),
        })
        .map_err(|err| MediaError::Watch(format!("failed to create watcher: {err}")))?;

    watcher
        .watch(dir, RecursiveMode::Recursive)
        .map_err(|err| MediaError::Watch(format!("failed to watch {}: {err}", dir.display())))?;
    info!(dir = %dir.display(), "watching for incoming media");

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                continue;
            }
            for path in event.paths {
                if is_media_file(&path) {
                    debug!(path = %path.display(), "media file event");
                    indexer.file_seen(path).await;
                }
            }
        }
    });

    Ok(WatchGuard { _watcher: watcher })
}

/// Feed every media file already under `dir` to the indexer.
pub async fn scan_existing(dir: &Path, indexer: &Indexer) -> Result<()> {
    let mut stack: Vec<PathBuf> = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                stack.push(path);
            } else if is_media_file(&path) {
                indexer.file_seen(path).await;
            }
        }
    }
    Ok(())
}

/// A finished video file: known container extension, not a download marker.
pub fn is_media_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = name.to_lowercase();
    if IGNORED_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as MediaResult;
    use crate::indexer::{FileProcessor, IndexerOptions, ProgressHandle};
    use crate::store::MemoryCatalog;
    use async_trait::async_trait;
    use reelvault_model::WatchableId;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn media_file_detection() {
        assert!(is_media_file(Path::new("/in/movie.mkv")));
        assert!(is_media_file(Path::new("/in/show.S01E01.MP4")));
        assert!(!is_media_file(Path::new("/in/movie.mkv.part")));
        assert!(!is_media_file(Path::new("/in/movie.mkv.!qB")));
        assert!(!is_media_file(Path::new("/in/notes.txt")));
        assert!(!is_media_file(Path::new("/in/cover.jpg")));
    }

    struct RecordingProcessor {
        seen: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl FileProcessor for RecordingProcessor {
        async fn process(&self, path: &Path, _progress: ProgressHandle) -> MediaResult<WatchableId> {
            self.seen.lock().unwrap().push(path.to_path_buf());
            Ok(WatchableId::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn startup_scan_finds_nested_media() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("shows/season1");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("movie.mkv"), b"x").unwrap();
        std::fs::write(nested.join("episode.mp4"), b"x").unwrap();
        std::fs::write(nested.join("episode.mp4.part"), b"x").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"x").unwrap();

        let processor = Arc::new(RecordingProcessor {
            seen: Mutex::new(Vec::new()),
        });
        let indexer = Indexer::spawn(
            processor.clone(),
            Arc::new(MemoryCatalog::new()),
            IndexerOptions {
                debounce: Duration::from_millis(1),
                ..Default::default()
            },
        );

        scan_existing(dir.path(), &indexer).await.unwrap();

        for _ in 0..200 {
            if processor.seen.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let mut seen = processor.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().any(|p| p.ends_with("movie.mkv")));
        assert!(seen.iter().any(|p| p.ends_with("episode.mp4")));
    }
}
