//! Manga engine: fetching, site scraping, download orchestration and storage.
mod adapter;
mod cache;
mod config;
mod engine;
mod fetch;
mod filename;
mod html;
mod orchestrator;
mod pacing;
mod shutdown;
mod sites;
mod storage;
mod types;

pub use adapter::{Adapter, Discovery};
pub use cache::{CacheError, SourceCache};
pub use config::{ConfigError, RunConfig};
pub use engine::{run, Engine, RunError};
pub use fetch::{
    ChannelProgressSink, FetchSettings, Fetcher, LogProgressSink, ProgressSink, ReqwestFetcher,
    DEFAULT_USER_AGENT,
};
pub use filename::{image_extension, page_stem};
pub use html::{decode_document, HtmlPage, MarkupError};
pub use orchestrator::{Forest, Orchestrator};
pub use pacing::HostPacer;
pub use shutdown::{listen_for_interrupts, ShutdownHandle};
pub use sites::{Layout, PageLink, SiteKind, SiteRegistry, SiteScraper, UnitLink, UnsupportedSite};
pub use storage::{ensure_output_dir, AtomicFileWriter, StorageError, StorageWriter, WriteOutcome};
pub use types::{FetchError, FetchMetadata, FetchOutput, ProgressEvent, ScrapeError};
