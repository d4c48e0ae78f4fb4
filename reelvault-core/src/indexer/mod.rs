//! Debounced ingestion queue.
//!
//! A single actor owns the pending-path debounce timers and the job queue,
//! so the watcher, timer callbacks, and job completions never race over
//! shared state. Jobs run strictly one at a time; a job failure is recorded
//! on the file's `IndexLog` and never stalls the queue.

pub mod fs_watch;
pub mod pipeline;

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reelvault_model::{IndexLog, WatchableId};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{MediaError, Result};
use crate::store::Catalog;

const COMMAND_BUFFER: usize = 64;

/// Where a running job currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStage {
    Queued,
    /// Probing the source and parsing its release name.
    GatheringInformation,
    GeneratingStream,
    ImportingPlaylist,
    GeneratingThumbnails,
    /// Remote metadata lookup and catalog reconciliation.
    LookingUp,
    Done,
    Failed,
}

impl IndexStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStage::Queued => "queued",
            IndexStage::GatheringInformation => "gathering-information",
            IndexStage::GeneratingStream => "generating-stream",
            IndexStage::ImportingPlaylist => "importing-playlist",
            IndexStage::GeneratingThumbnails => "generating-thumbnails",
            IndexStage::LookingUp => "looking-up",
            IndexStage::Done => "done",
            IndexStage::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndexProgress {
    pub stage: IndexStage,
    pub percent: f32,
}

impl IndexProgress {
    fn queued() -> Self {
        Self {
            stage: IndexStage::Queued,
            percent: 0.0,
        }
    }
}

/// Lossy per-job progress channel; consumers only ever need the latest value.
pub type ProgressHandle = Arc<watch::Sender<IndexProgress>>;

/// End-to-end processing of one file, yielding the watchable it produced.
#[async_trait]
pub trait FileProcessor: Send + Sync {
    async fn process(&self, path: &Path, progress: ProgressHandle) -> Result<WatchableId>;
}

#[derive(Debug, Clone)]
pub struct IndexerOptions {
    /// Quiet period a path must hold before it is enqueued.
    pub debounce: Duration,
    /// Re-run files whose previous attempt failed. Off by default: any
    /// existing log, success or failure, makes re-indexing a no-op.
    pub retry_failed: bool,
    pub remove_after_indexing: bool,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(10),
            retry_failed: false,
            remove_after_indexing: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexerSnapshot {
    pub pending: Vec<PathBuf>,
    pub running: Option<(PathBuf, IndexProgress)>,
}

enum Command {
    FileSeen(PathBuf),
    Enqueue(PathBuf),
    JobFinished(PathBuf),
    Snapshot(oneshot::Sender<IndexerSnapshot>),
}

/// Handle to the queue actor. Cheap to clone; dropping every handle stops
/// the actor once the current job finishes.
#[derive(Clone)]
pub struct Indexer {
    tx: mpsc::Sender<Command>,
}

impl Indexer {
    pub fn spawn(
        processor: Arc<dyn FileProcessor>,
        catalog: Arc<dyn Catalog>,
        options: IndexerOptions,
    ) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let actor = IndexerActor {
            rx,
            tx: tx.clone(),
            processor,
            catalog,
            options,
            debounce: HashMap::new(),
            queue: VecDeque::new(),
            running: None,
        };
        tokio::spawn(actor.run());
        Self { tx }
    }

    /// Report a filesystem event for a path; the enqueue fires after the
    /// debounce window passes without further events.
    pub async fn file_seen(&self, path: impl Into<PathBuf>) {
        let _ = self.tx.send(Command::FileSeen(path.into())).await;
    }

    /// Enqueue a path immediately, bypassing the debounce window.
    pub async fn enqueue(&self, path: impl Into<PathBuf>) {
        let _ = self.tx.send(Command::Enqueue(path.into())).await;
    }

    pub async fn snapshot(&self) -> Result<IndexerSnapshot> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply))
            .await
            .map_err(|_| MediaError::Internal("indexer stopped".into()))?;
        response
            .await
            .map_err(|_| MediaError::Internal("indexer stopped".into()))
    }
}

struct IndexerActor {
    rx: mpsc::Receiver<Command>,
    tx: mpsc::Sender<Command>,
    processor: Arc<dyn FileProcessor>,
    catalog: Arc<dyn Catalog>,
    options: IndexerOptions,
    debounce: HashMap<PathBuf, JoinHandle<()>>,
    queue: VecDeque<PathBuf>,
    running: Option<(PathBuf, watch::Receiver<IndexProgress>)>,
}

impl IndexerActor {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::FileSeen(path) => self.restart_debounce(path),
                Command::Enqueue(path) => {
                    if let Some(timer) = self.debounce.remove(&path) {
                        timer.abort();
                    }
                    self.enqueue(path);
                }
                Command::JobFinished(path) => {
                    if matches!(&self.running, Some((running, _)) if *running == path) {
                        self.running = None;
                    }
                    self.start_next();
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
            }
        }
    }

    fn restart_debounce(&mut self, path: PathBuf) {
        if let Some(previous) = self.debounce.remove(&path) {
            previous.abort();
        }
        let delay = self.options.debounce;
        let tx = self.tx.clone();
        let timer_path = path.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Command::Enqueue(timer_path)).await;
        });
        self.debounce.insert(path, timer);
    }

    fn enqueue(&mut self, path: PathBuf) {
        let already_running =
            matches!(&self.running, Some((running, _)) if *running == path);
        if already_running || self.queue.contains(&path) {
            debug!(path = %path.display(), "path already pending, dropping");
            return;
        }
        info!(path = %path.display(), "queued for indexing");
        self.queue.push_back(path);
        self.start_next();
    }

    fn start_next(&mut self) {
        if self.running.is_some() {
            return;
        }
        let Some(path) = self.queue.pop_front() else {
            return;
        };

        let (progress_tx, progress_rx) = watch::channel(IndexProgress::queued());
        self.running = Some((path.clone(), progress_rx));

        let processor = Arc::clone(&self.processor);
        let catalog = Arc::clone(&self.catalog);
        let options = self.options.clone();
        let commands = self.tx.clone();
        tokio::spawn(async move {
            run_job(
                processor,
                catalog,
                options,
                path.clone(),
                Arc::new(progress_tx),
            )
            .await;
            let _ = commands.send(Command::JobFinished(path)).await;
        });
    }

    fn snapshot(&self) -> IndexerSnapshot {
        IndexerSnapshot {
            pending: self.queue.iter().cloned().collect(),
            running: self
                .running
                .as_ref()
                .map(|(path, progress)| (path.clone(), *progress.borrow())),
        }
    }
}

/// Terminal catch point: a job error is logged and recorded, never
/// propagated.
async fn run_job(
    processor: Arc<dyn FileProcessor>,
    catalog: Arc<dyn Catalog>,
    options: IndexerOptions,
    path: PathBuf,
    progress: ProgressHandle,
) {
    if let Err(err) = execute_job(
        processor.as_ref(),
        catalog.as_ref(),
        &options,
        &path,
        progress,
    )
    .await
    {
        error!(path = %path.display(), error = %err, "indexing failed");
    }
}

async fn execute_job(
    processor: &dyn FileProcessor,
    catalog: &dyn Catalog,
    options: &IndexerOptions,
    path: &Path,
    progress: ProgressHandle,
) -> Result<()> {
    let mut log = match catalog.find_index_log(path).await? {
        Some(existing) if existing.failed && options.retry_failed => {
            info!(path = %path.display(), "retrying previously failed file");
            let mut log = existing;
            log.restart();
            catalog.save_index_log(&log).await?;
            log
        }
        Some(_) => {
            debug!(path = %path.display(), "already indexed, skipping");
            return Ok(());
        }
        None => {
            let log = IndexLog::started(path);
            catalog.save_index_log(&log).await?;
            log
        }
    };

    match processor.process(path, Arc::clone(&progress)).await {
        Ok(watchable) => {
            log.complete(watchable);
            catalog.save_index_log(&log).await?;
            let _ = progress.send(IndexProgress {
                stage: IndexStage::Done,
                percent: 1.0,
            });
            info!(path = %path.display(), "indexing complete");

            if options.remove_after_indexing {
                if let Err(err) = tokio::fs::remove_file(path).await {
                    warn!(path = %path.display(), error = %err, "failed to remove source file");
                }
            }
            Ok(())
        }
        Err(err) => {
            let wrapped = MediaError::index(path, err);
            log.fail(wrapped.detail());
            catalog.save_index_log(&log).await?;
            let _ = progress.send(IndexProgress {
                stage: IndexStage::Failed,
                percent: 0.0,
            });
            Err(wrapped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCatalog;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubProcessor {
        active: AtomicUsize,
        max_active: AtomicUsize,
        processed: Mutex<Vec<PathBuf>>,
        delay: Duration,
        fail_matching: Option<String>,
    }

    impl StubProcessor {
        fn make(delay: Duration, fail_matching: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                processed: Mutex::new(Vec::new()),
                delay,
                fail_matching: fail_matching.map(str::to_string),
            })
        }

        fn new(delay: Duration) -> Arc<Self> {
            Self::make(delay, None)
        }

        fn failing_on(delay: Duration, needle: &str) -> Arc<Self> {
            Self::make(delay, Some(needle))
        }

        fn processed(&self) -> Vec<PathBuf> {
            self.processed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FileProcessor for StubProcessor {
        async fn process(&self, path: &Path, _progress: ProgressHandle) -> Result<WatchableId> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.processed.lock().unwrap().push(path.to_path_buf());

            if let Some(needle) = &self.fail_matching {
                if path.to_string_lossy().contains(needle.as_str()) {
                    return Err(MediaError::Transcode("stub failure".into()));
                }
            }
            Ok(WatchableId::new())
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_one_job_runs_at_a_time() {
        let processor = StubProcessor::new(Duration::from_secs(2));
        let catalog = Arc::new(MemoryCatalog::new());
        let indexer = Indexer::spawn(
            processor.clone(),
            catalog,
            IndexerOptions {
                debounce: Duration::from_millis(1),
                ..Default::default()
            },
        );

        for name in ["/media/a.mkv", "/media/b.mkv", "/media/c.mkv"] {
            indexer.enqueue(name).await;
        }
        wait_for(|| processor.processed().len() == 3).await;
        assert_eq!(processor.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_events_collapse_to_one_enqueue() {
        let processor = StubProcessor::new(Duration::from_millis(1));
        let catalog = Arc::new(MemoryCatalog::new());
        let indexer = Indexer::spawn(
            processor.clone(),
            catalog,
            IndexerOptions::default(),
        );

        indexer.file_seen("/media/incoming.mkv").await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        indexer.file_seen("/media/incoming.mkv").await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        indexer.file_seen("/media/incoming.mkv").await;

        // 9s after the last event the window is still open.
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(processor.processed().is_empty());

        wait_for(|| processor.processed().len() == 1).await;
        assert_eq!(processor.processed(), vec![PathBuf::from("/media/incoming.mkv")]);
    }

    #[tokio::test(start_paused = true)]
    async fn existing_log_makes_reindex_a_noop() {
        let processor = StubProcessor::new(Duration::from_millis(1));
        let catalog = Arc::new(MemoryCatalog::new());
        let mut log = IndexLog::started("/media/seen.mkv");
        log.fail("previous failure");
        catalog.save_index_log(&log).await.unwrap();

        let indexer = Indexer::spawn(
            processor.clone(),
            catalog.clone(),
            IndexerOptions {
                debounce: Duration::from_millis(1),
                ..Default::default()
            },
        );
        indexer.enqueue("/media/seen.mkv").await;

        // Give the queue time to pick the job up and drop it.
        tokio::time::sleep(Duration::from_secs(1)).await;
        let snapshot = indexer.snapshot().await.unwrap();
        assert!(snapshot.running.is_none());
        assert!(processor.processed().is_empty());
        assert_eq!(catalog.index_logs().len(), 1);
        assert_eq!(catalog.index_logs()[0].id, log.id);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_log_retries_when_enabled() {
        let processor = StubProcessor::new(Duration::from_millis(1));
        let catalog = Arc::new(MemoryCatalog::new());
        let mut log = IndexLog::started("/media/failed.mkv");
        log.fail("previous failure");
        catalog.save_index_log(&log).await.unwrap();

        let indexer = Indexer::spawn(
            processor.clone(),
            catalog.clone(),
            IndexerOptions {
                debounce: Duration::from_millis(1),
                retry_failed: true,
                ..Default::default()
            },
        );
        indexer.enqueue("/media/failed.mkv").await;

        wait_for(|| processor.processed().len() == 1).await;
        wait_for(|| !catalog.index_logs()[0].failed).await;
        let log = &catalog.index_logs()[0];
        assert!(!log.indexing);
        assert!(log.watchable.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_recorded_and_queue_continues() {
        let processor = StubProcessor::failing_on(Duration::from_millis(1), "broken");
        let catalog = Arc::new(MemoryCatalog::new());
        let indexer = Indexer::spawn(
            processor.clone(),
            catalog.clone(),
            IndexerOptions {
                debounce: Duration::from_millis(1),
                ..Default::default()
            },
        );

        indexer.enqueue("/media/broken.mkv").await;
        indexer.enqueue("/media/fine.mkv").await;
        wait_for(|| processor.processed().len() == 2).await;
        wait_for(|| catalog.index_logs().iter().all(|l| !l.indexing)).await;

        let logs = catalog.index_logs();
        let broken = logs
            .iter()
            .find(|l| l.filepath.ends_with("broken.mkv"))
            .unwrap();
        assert!(broken.failed);
        assert!(broken.error.as_deref().unwrap().contains("stub failure"));

        let fine = logs
            .iter()
            .find(|l| l.filepath.ends_with("fine.mkv"))
            .unwrap();
        assert!(!fine.failed);
        assert!(fine.watchable.is_some());
    }

    #[test]
    fn stage_names() {
        assert_eq!(IndexStage::GatheringInformation.as_str(), "gathering-information");
        assert_eq!(IndexStage::GeneratingStream.as_str(), "generating-stream");
        assert_eq!(IndexStage::LookingUp.as_str(), "looking-up");
    }
}
