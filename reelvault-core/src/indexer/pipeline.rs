//! End-to-end processing of one media file.
//!
//! probe -> transcode -> thumbnails -> metadata -> persist, with each stage
//! reported on the job's progress channel.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reelvault_model::WatchableId;
use tracing::info;

use super::{FileProcessor, IndexProgress, IndexStage, ProgressHandle};
use crate::error::Result;
use crate::filename::parse_release_name;
use crate::probe::Prober;
use crate::resolver::MetadataResolver;
use crate::store::Catalog;
use crate::thumbnails::{FrameProgress, ThumbnailGenerator};
use crate::transcode::{ProgressSink, TranscodePipeline, TranscodeUpdate};
use crate::vault::MediaVault;

pub struct MediaPipeline {
    prober: Prober,
    transcoder: TranscodePipeline,
    thumbnails: Option<ThumbnailGenerator>,
    resolver: MetadataResolver,
    vault: MediaVault,
    catalog: Arc<dyn Catalog>,
}

impl MediaPipeline {
    pub fn new(
        prober: Prober,
        transcoder: TranscodePipeline,
        thumbnails: Option<ThumbnailGenerator>,
        resolver: MetadataResolver,
        vault: MediaVault,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            prober,
            transcoder,
            thumbnails,
            resolver,
            vault,
            catalog,
        }
    }
}

fn report(progress: &ProgressHandle, stage: IndexStage, percent: f32) {
    let _ = progress.send(IndexProgress { stage, percent });
}

/// Folds encoder phase reports into the job's progress channel.
fn transcode_sink(progress: &ProgressHandle) -> ProgressSink {
    let progress = Arc::clone(progress);
    Arc::new(move |update| {
        let message = match update {
            TranscodeUpdate::Encoding(percent) => IndexProgress {
                stage: IndexStage::GeneratingStream,
                percent,
            },
            TranscodeUpdate::Importing => IndexProgress {
                stage: IndexStage::ImportingPlaylist,
                percent: 0.0,
            },
        };
        let _ = progress.send(message);
    })
}

fn thumbnail_sink(progress: &ProgressHandle) -> FrameProgress {
    let progress = Arc::clone(progress);
    Arc::new(move |percent| {
        let _ = progress.send(IndexProgress {
            stage: IndexStage::GeneratingThumbnails,
            percent,
        });
    })
}

#[async_trait]
impl FileProcessor for MediaPipeline {
    async fn process(&self, path: &Path, progress: ProgressHandle) -> Result<WatchableId> {
        report(&progress, IndexStage::GatheringInformation, 0.0);
        let probe = self.prober.probe(path).await?;
        let parsed = parse_release_name(path);

        report(&progress, IndexStage::GeneratingStream, 0.0);
        let mut stream = self
            .transcoder
            .transcode(
                path,
                &probe,
                &self.vault,
                self.catalog.as_ref(),
                transcode_sink(&progress),
            )
            .await?;

        if let Some(generator) = &self.thumbnails {
            report(&progress, IndexStage::GeneratingThumbnails, 0.0);
            stream.thumbnails = generator
                .generate(
                    path,
                    probe.duration_secs(),
                    &self.vault,
                    self.catalog.as_ref(),
                    thumbnail_sink(&progress),
                )
                .await?;
            self.catalog.save_stream(&stream).await?;
        }

        report(&progress, IndexStage::LookingUp, 0.0);
        let watchable = self
            .resolver
            .resolve(
                &parsed,
                &stream,
                probe.quality_label(),
                self.catalog.as_ref(),
            )
            .await?;

        info!(
            path = %path.display(),
            title = %watchable.title,
            "file fully indexed"
        );
        Ok(watchable.id)
    }
}
