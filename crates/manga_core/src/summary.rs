use std::fmt;

use crate::{ErrorKind, PageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Downloaded { bytes: u64 },
    /// The image was already on disk.
    AlreadySkipped,
    Failed { kind: ErrorKind, attempts: u32 },
}

/// Terminal outcome of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadResult {
    pub page: PageId,
    pub outcome: Outcome,
}

impl DownloadResult {
    pub fn downloaded(page: PageId, bytes: u64) -> Self {
        Self {
            page,
            outcome: Outcome::Downloaded { bytes },
        }
    }

    pub fn skipped(page: PageId) -> Self {
        Self {
            page,
            outcome: Outcome::AlreadySkipped,
        }
    }

    pub fn failed(page: PageId, kind: ErrorKind, attempts: u32) -> Self {
        Self {
            page,
            outcome: Outcome::Failed { kind, attempts },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Completed,
    /// Ended early after an interrupt; in-flight work was drained.
    Stopped,
}

/// End-of-run aggregate. Page and unit failures land here instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Summary {
    pub sources_processed: usize,
    pub sources_unsupported: usize,
    pub sources_failed: usize,
    /// Sources never discovered because a stop arrived first.
    pub sources_not_started: usize,
    pub units_failed: usize,
    pub pages_downloaded: usize,
    pub pages_skipped: usize,
    pub pages_failed: usize,
    /// Queued pages left untouched because of a stop request.
    pub pages_not_scheduled: usize,
    pub bytes_written: u64,
    pub status: RunStatus,
}

impl Summary {
    pub fn record(&mut self, result: &DownloadResult) {
        match result.outcome {
            Outcome::Downloaded { bytes } => {
                self.pages_downloaded += 1;
                self.bytes_written += bytes;
            }
            Outcome::AlreadySkipped => self.pages_skipped += 1,
            Outcome::Failed {
                kind: ErrorKind::Interrupted,
                ..
            } => self.pages_not_scheduled += 1,
            Outcome::Failed { .. } => self.pages_failed += 1,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "sources processed: {} (unsupported {}, failed {})",
            self.sources_processed, self.sources_unsupported, self.sources_failed
        )?;
        writeln!(
            f,
            "pages downloaded: {} ({} bytes)",
            self.pages_downloaded, self.bytes_written
        )?;
        writeln!(f, "pages skipped: {}", self.pages_skipped)?;
        write!(f, "pages failed: {}", self.pages_failed)?;
        if self.units_failed > 0 {
            write!(f, "\nunits failed: {}", self.units_failed)?;
        }
        if self.status == RunStatus::Stopped {
            write!(
                f,
                "\nstopped by interrupt, {} sources not started, {} pages not scheduled",
                self.sources_not_started, self.pages_not_scheduled
            )?;
        }
        Ok(())
    }
}
