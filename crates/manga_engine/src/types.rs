use bytes::Bytes;
use manga_core::{ErrorKind, PageId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Bytes,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: ErrorKind,
    /// HTTP status when the server answered.
    pub status: Option<u16>,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Failure of a scraping or download step, tied to the URL it happened on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {url}: {message}")]
pub struct ScrapeError {
    pub kind: ErrorKind,
    pub url: String,
    pub message: String,
}

impl ScrapeError {
    pub fn new(kind: ErrorKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, url, message)
    }

    pub fn from_fetch(url: impl Into<String>, err: FetchError) -> Self {
        Self::new(err.kind, url, err.message)
    }
}

/// Incremental progress, emitted as a side effect for an external display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    SourceDiscovered {
        source: usize,
        title: String,
        units: usize,
        pages: usize,
    },
    PageCompleted {
        page: PageId,
        bytes: u64,
    },
    PageSkipped {
        page: PageId,
    },
    PageFailed {
        page: PageId,
        kind: ErrorKind,
        attempts: u32,
    },
    UnitCompleted {
        source: usize,
        unit: usize,
    },
}
