use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use futures_util::future::join_all;
use manga_core::{
    DownloadResult, DownloadTask, ErrorKind, Outcome, Page, PageId, ProgressTracker, RetryPolicy,
    ShutdownState, Source, UnitKey, WorkUnit,
};
use manga_logging::{manga_debug, manga_info, manga_warn};

use crate::fetch::ProgressSink;
use crate::shutdown::ShutdownHandle;
use crate::storage::{StorageWriter, WriteOutcome};
use crate::{Adapter, ProgressEvent, ScrapeError};

/// Every discovered source together with the adapter that serves it.
///
/// Read-only once downloads start; tasks address pages by [`PageId`].
#[derive(Default)]
pub struct Forest {
    sources: Vec<Source>,
    adapters: Vec<Adapter>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source and returns its position.
    pub fn push(&mut self, source: Source, adapter: Adapter) -> usize {
        self.sources.push(source);
        self.adapters.push(adapter);
        self.sources.len() - 1
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn locate(&self, id: PageId) -> (&Source, &WorkUnit, &Page) {
        let source = &self.sources[id.source];
        let unit = &source.units[id.unit];
        (source, unit, &unit.pages[id.page])
    }
}

/// Downloads every page of a forest with a bounded worker pool.
pub struct Orchestrator {
    storage: StorageWriter,
    retry: RetryPolicy,
    max_concurrency: usize,
    shutdown: ShutdownHandle,
    sink: Arc<dyn ProgressSink>,
}

struct Shared {
    forest: Arc<Forest>,
    storage: StorageWriter,
    retry: RetryPolicy,
    shutdown: ShutdownHandle,
    sink: Arc<dyn ProgressSink>,
    queue: Mutex<VecDeque<DownloadTask>>,
    in_flight: AtomicUsize,
    tracker: Mutex<ProgressTracker>,
    results: Mutex<Vec<DownloadResult>>,
}

impl Orchestrator {
    pub fn new(
        storage: StorageWriter,
        retry: RetryPolicy,
        max_concurrency: usize,
        shutdown: ShutdownHandle,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            storage,
            retry,
            max_concurrency: max_concurrency.max(1),
            shutdown,
            sink,
        }
    }

    /// Runs until every page has a result or a stop request has drained the pool.
    /// Results are sorted by page position.
    pub async fn run(&self, forest: Arc<Forest>) -> Vec<DownloadResult> {
        let (on_disk, pending) = prescan(&forest, &self.storage).await;

        let mut tracker = ProgressTracker::new();
        for (si, source) in forest.sources().iter().enumerate() {
            for (ui, unit) in source.units.iter().enumerate() {
                tracker.expect(UnitKey { source: si, unit: ui }, unit.pages.len());
            }
        }
        let queue: VecDeque<DownloadTask> = pending
            .into_iter()
            .enumerate()
            .map(|(id, page)| DownloadTask::new(id as u64 + 1, page))
            .collect();
        manga_info!(
            "{} page(s) to download, {} already on disk",
            queue.len(),
            on_disk.len()
        );

        let workers = self.max_concurrency.min(queue.len());
        let shared = Arc::new(Shared {
            forest,
            storage: self.storage.clone(),
            retry: self.retry.clone(),
            shutdown: self.shutdown.clone(),
            sink: self.sink.clone(),
            queue: Mutex::new(queue),
            in_flight: AtomicUsize::new(0),
            tracker: Mutex::new(tracker),
            results: Mutex::new(Vec::new()),
        });
        for page in on_disk {
            shared.settle(DownloadResult::skipped(page));
        }

        let monitor = {
            let shared = shared.clone();
            tokio::spawn(async move {
                shared.shutdown.stop_requested().await;
                let in_flight = shared.in_flight.load(Ordering::SeqCst);
                shared.shutdown.begin_drain(in_flight);
            })
        };

        let handles: Vec<_> = (0..workers)
            .map(|worker| tokio::spawn(run_worker(shared.clone(), worker)))
            .collect();
        for joined in join_all(handles).await {
            if let Err(err) = joined {
                manga_warn!("Download worker ended abnormally: {}", err);
            }
        }
        monitor.abort();
        let _ = monitor.await;

        let leftover: Vec<DownloadTask> = lock(&shared.queue).drain(..).collect();
        if !leftover.is_empty() {
            manga_info!("{} queued page(s) were not started", leftover.len());
        }
        let mut results = std::mem::take(&mut *lock(&shared.results));
        results.extend(
            leftover
                .into_iter()
                .map(|task| DownloadResult::failed(task.page, ErrorKind::Interrupted, task.attempts)),
        );
        results.sort_by_key(|result| result.page);

        if !matches!(
            self.shutdown.state(),
            ShutdownState::Running | ShutdownState::Stopped
        ) {
            self.shutdown.finish_drain();
        }
        results
    }
}

/// Splits the forest's pages into those already on disk and those still to fetch.
async fn prescan(forest: &Arc<Forest>, storage: &StorageWriter) -> (Vec<PageId>, Vec<PageId>) {
    let ids: Vec<PageId> = forest
        .sources()
        .iter()
        .enumerate()
        .flat_map(|(si, source)| {
            source.pages().map(move |(ui, pi, _, _)| PageId {
                source: si,
                unit: ui,
                page: pi,
            })
        })
        .collect();
    let scan = {
        let forest = forest.clone();
        let storage = storage.clone();
        let ids = ids.clone();
        tokio::task::spawn_blocking(move || {
            let split: (Vec<PageId>, Vec<PageId>) = ids.into_iter().partition(|id| {
                let (source, unit, page) = forest.locate(*id);
                storage.existing(source, unit, page).is_some()
            });
            split
        })
    };
    match scan.await {
        Ok(split) => split,
        Err(err) => {
            manga_warn!("Could not scan existing downloads: {}", err);
            (Vec::new(), ids)
        }
    }
}

async fn run_worker(shared: Arc<Shared>, worker: usize) {
    while let Some(mut task) = shared.next_task() {
        manga_debug!("worker {} took task {}", worker, task.id);
        let result = shared.execute(&mut task).await;
        shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        shared.settle(result);
    }
    manga_debug!("worker {} exiting", worker);
}

impl Shared {
    /// Pops the next task unless a stop was requested.
    fn next_task(&self) -> Option<DownloadTask> {
        let mut queue = lock(&self.queue);
        if !self.shutdown.accepts_new_tasks() {
            return None;
        }
        let task = queue.pop_front()?;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(task)
    }

    async fn execute(&self, task: &mut DownloadTask) -> DownloadResult {
        let id = task.page;
        loop {
            let attempt = task.start();
            let err = match self.attempt(id).await {
                Ok(WriteOutcome::Written { path, bytes }) => {
                    task.complete();
                    manga_debug!("Saved {:?} ({} bytes, attempt {})", path, bytes, attempt);
                    return DownloadResult::downloaded(id, bytes);
                }
                Ok(WriteOutcome::AlreadySkipped { path }) => {
                    task.complete();
                    manga_debug!("{:?} appeared during the run; skipped", path);
                    return DownloadResult::skipped(id);
                }
                Err(err) => err,
            };

            let Some(delay) = self.retry.next_delay(task, err.kind) else {
                task.fail(err.kind);
                manga_warn!(
                    "Page {} failed ({}, {} attempt(s)): {}",
                    err.url,
                    err.kind,
                    task.attempts,
                    err.message
                );
                return DownloadResult::failed(id, err.kind, task.attempts);
            };

            task.requeue(err.kind);
            manga_debug!(
                "Attempt {} for {} failed ({}); retrying in {:?}",
                attempt,
                err.url,
                err.kind,
                delay
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.stop_requested() => {
                    task.fail(err.kind);
                    manga_warn!(
                        "Page {} abandoned during retry backoff ({}, {} attempt(s))",
                        err.url,
                        err.kind,
                        task.attempts
                    );
                    return DownloadResult::failed(id, err.kind, task.attempts);
                }
            }
        }
    }

    async fn attempt(&self, id: PageId) -> Result<WriteOutcome, ScrapeError> {
        let adapter = &self.forest.adapters[id.source];
        let (_, _, page) = self.forest.locate(id);
        let image_url = adapter.resolve_image_url(page).await?;
        let image = adapter.fetch_image(&image_url).await?;

        let resolved = Page {
            image_url: Some(image_url.clone()),
            ..page.clone()
        };
        let content_type = image.metadata.content_type;
        match self.store(id, resolved.clone(), image.bytes.clone(), content_type.clone()).await {
            Ok(outcome) => Ok(outcome),
            Err(first) => {
                manga_warn!("Write failed for {} ({}); retrying once", image_url, first);
                self.store(id, resolved, image.bytes, content_type)
                    .await
                    .map_err(|err| ScrapeError::new(ErrorKind::Filesystem, &image_url, err))
            }
        }
    }

    async fn store(
        &self,
        id: PageId,
        page: Page,
        bytes: Bytes,
        content_type: Option<String>,
    ) -> Result<WriteOutcome, String> {
        let forest = self.forest.clone();
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || {
            let (source, unit, _) = forest.locate(id);
            storage
                .write(source, unit, &page, &bytes, content_type.as_deref())
                .map_err(|err| err.to_string())
        })
        .await
        .map_err(|err| format!("write task failed: {err}"))?
    }

    fn settle(&self, result: DownloadResult) {
        let event = match result.outcome {
            Outcome::Downloaded { bytes } => ProgressEvent::PageCompleted {
                page: result.page,
                bytes,
            },
            Outcome::AlreadySkipped => ProgressEvent::PageSkipped { page: result.page },
            Outcome::Failed { kind, attempts } => ProgressEvent::PageFailed {
                page: result.page,
                kind,
                attempts,
            },
        };
        self.sink.emit(event);
        lock(&self.results).push(result);

        let finished = lock(&self.tracker).settle(result.page);
        if let Some(key) = finished {
            let source = &self.forest.sources[key.source];
            manga_info!(
                "Finished {:?} / {:?}",
                source.title,
                source.units[key.unit].name
            );
            self.sink.emit(ProgressEvent::UnitCompleted {
                source: key.source,
                unit: key.unit,
            });
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
