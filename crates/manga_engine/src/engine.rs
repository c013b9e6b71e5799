use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use manga_core::{
    claim_unique_name, parse_url_list, DownloadResult, Outcome, RunStatus, ShutdownState, Summary,
};
use manga_logging::{manga_info, manga_warn};
use thiserror::Error;

use crate::adapter::{Adapter, Discovery};
use crate::cache::SourceCache;
use crate::config::{ConfigError, RunConfig};
use crate::fetch::{Fetcher, LogProgressSink, ProgressSink, ReqwestFetcher};
use crate::orchestrator::{Forest, Orchestrator};
use crate::pacing::HostPacer;
use crate::shutdown::ShutdownHandle;
use crate::sites::SiteRegistry;
use crate::storage::{ensure_output_dir, StorageError, StorageWriter};
use crate::{FetchError, ProgressEvent, ScrapeError};

/// Problems that stop a run before any scraping starts.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("cannot read input list {path}: {source}")]
    Input { path: PathBuf, source: io::Error },
    #[error(transparent)]
    OutputDir(StorageError),
    #[error("cannot build http client: {0}")]
    Client(FetchError),
}

/// Reads the input list, discovers every source and downloads its pages.
pub async fn run(config: RunConfig) -> Result<Summary, RunError> {
    Engine::new(config)?.run().await
}

/// One configured download run. The fetcher, site table, progress sink and
/// shutdown handle can be swapped before [`Engine::run`].
pub struct Engine {
    config: RunConfig,
    registry: SiteRegistry,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ProgressSink>,
    shutdown: ShutdownHandle,
}

impl Engine {
    pub fn new(config: RunConfig) -> Result<Self, RunError> {
        config.validate()?;
        let fetcher = ReqwestFetcher::new(config.fetch_settings()).map_err(RunError::Client)?;
        Ok(Self {
            config,
            registry: SiteRegistry::default(),
            fetcher: Arc::new(fetcher),
            sink: Arc::new(LogProgressSink),
            shutdown: ShutdownHandle::new(),
        })
    }

    pub fn with_registry(mut self, registry: SiteRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<Summary, RunError> {
        let path = &self.config.input_path;
        let raw = fs::read_to_string(path).map_err(|source| RunError::Input {
            path: path.clone(),
            source,
        })?;
        let list = parse_url_list(&raw);
        for rejected in &list.rejected {
            manga_warn!(
                "Skipping input line {}: not an http(s) url: {:?}",
                rejected.line,
                rejected.text
            );
        }
        ensure_output_dir(&self.config.output_dir).map_err(RunError::OutputDir)?;
        manga_info!(
            "{} source url(s) from {:?}, writing to {:?}",
            list.urls.len(),
            path,
            self.config.output_dir
        );
        Ok(self.run_urls(&list.urls).await)
    }

    /// Runs the given source URLs. Per-source and per-page failures end up in the summary.
    pub async fn run_urls(&self, urls: &[String]) -> Summary {
        let mut summary = Summary::default();
        let storage = StorageWriter::new(&self.config.output_dir);
        let cache = SourceCache::new(storage.clone());
        let pacer = Arc::new(HostPacer::new(self.config.per_host_delay()));

        let mut targets = Vec::new();
        for url in urls {
            match self.registry.identify(url) {
                Ok(kind) => {
                    let adapter = Adapter::new(kind, self.fetcher.clone(), pacer.clone());
                    targets.push((url.clone(), adapter));
                }
                Err(err) => {
                    manga_warn!("Skipping {}", err);
                    summary.sources_unsupported += 1;
                }
            }
        }

        let discoveries: Vec<(String, Adapter, Option<Result<Discovery, ScrapeError>>)> =
            stream::iter(targets)
                .map(|(url, adapter)| {
                    let cache = &cache;
                    let shutdown = &self.shutdown;
                    async move {
                        if !shutdown.accepts_new_tasks() {
                            return (url, adapter, None);
                        }
                        let result = adapter.discover_with(&url, Some(cache)).await;
                        (url, adapter, Some(result))
                    }
                })
                .buffered(self.config.max_concurrency)
                .collect()
                .await;

        let mut forest = Forest::new();
        let mut titles = HashSet::new();
        for (url, adapter, result) in discoveries {
            let mut discovery = match result {
                None => {
                    manga_info!("Not discovering {}: stop requested", url);
                    summary.sources_not_started += 1;
                    continue;
                }
                Some(Err(err)) => {
                    manga_warn!("Source {} failed: {}", url, err);
                    summary.sources_failed += 1;
                    continue;
                }
                Some(Ok(discovery)) => discovery,
            };
            summary.sources_processed += 1;
            summary.units_failed += discovery.unit_failures.len();
            let title = claim_unique_name(&mut titles, &discovery.source.title);
            if title != discovery.source.title {
                manga_warn!(
                    "Title {:?} of {} clashes with an earlier source; saving as {:?}",
                    discovery.source.title,
                    url,
                    title
                );
                discovery.source.title = title;
            }
            match cache.save(&discovery.source) {
                Ok(true) => manga_info!("Saved discovery cache for {:?}", discovery.source.title),
                Ok(false) => {}
                Err(err) => manga_warn!("Discovery cache for {} not saved: {}", url, err),
            }
            let source = discovery.source;
            self.sink.emit(ProgressEvent::SourceDiscovered {
                source: forest.len(),
                title: source.title.clone(),
                units: source.units.len(),
                pages: source.page_count(),
            });
            forest.push(source, adapter);
        }

        let forest = Arc::new(forest);
        let orchestrator = Orchestrator::new(
            storage,
            self.config.retry_policy(),
            self.config.max_concurrency,
            self.shutdown.clone(),
            self.sink.clone(),
        );
        let results = orchestrator.run(forest.clone()).await;
        for result in &results {
            summary.record(result);
        }
        log_source_outcomes(&forest, &results);

        summary.status = if self.shutdown.state() == ShutdownState::Running {
            RunStatus::Completed
        } else {
            RunStatus::Stopped
        };
        manga_info!("Run finished\n{}", summary);
        summary
    }
}

fn log_source_outcomes(forest: &Forest, results: &[DownloadResult]) {
    for (index, source) in forest.sources().iter().enumerate() {
        let (mut downloaded, mut skipped, mut failed) = (0usize, 0usize, 0usize);
        for result in results.iter().filter(|r| r.page.source == index) {
            match result.outcome {
                Outcome::Downloaded { .. } => downloaded += 1,
                Outcome::AlreadySkipped => skipped += 1,
                Outcome::Failed { .. } => failed += 1,
            }
        }
        manga_info!(
            "{} ({:?}): {} downloaded, {} skipped, {} failed or not started",
            source.url,
            source.title,
            downloaded,
            skipped,
            failed
        );
    }
}
