use std::fs;
use std::path::PathBuf;

use manga_core::Source;
use manga_logging::{manga_debug, manga_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{AtomicFileWriter, StorageError};
use crate::StorageWriter;

const CACHE_FILENAME: &str = "cache.json";
const CACHE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cache write failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    source: Source,
}

/// Discovered source trees kept next to the images, so a rerun can skip
/// re-listing chapters whose pages are already known.
#[derive(Debug, Clone)]
pub struct SourceCache {
    storage: StorageWriter,
}

impl SourceCache {
    pub fn new(storage: StorageWriter) -> Self {
        Self { storage }
    }

    pub fn path_for(&self, title: &str) -> PathBuf {
        self.storage.source_dir(title).join(CACHE_FILENAME)
    }

    /// Loads the tree saved for `title`, if it belongs to `source_url`.
    /// Unreadable or foreign caches are ignored.
    pub fn load(&self, title: &str, source_url: &str) -> Option<Source> {
        let path = self.path_for(title);
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                manga_warn!("Failed to read cache {:?}: {}", path, err);
                return None;
            }
        };
        let cached: CacheFile = match serde_json::from_str(&content) {
            Ok(cached) => cached,
            Err(err) => {
                manga_warn!("Ignoring unreadable cache {:?}: {}", path, err);
                return None;
            }
        };
        if cached.version != CACHE_VERSION || cached.source.url != source_url {
            manga_debug!(
                "Ignoring cache {:?} (version {}, url {})",
                path,
                cached.version,
                cached.source.url
            );
            return None;
        }
        Some(cached.source)
    }

    /// Saves the tree. Returns `false` when the stored content was already identical.
    pub fn save(&self, source: &Source) -> Result<bool, CacheError> {
        let file = CacheFile {
            version: CACHE_VERSION,
            source: source.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        let path = self.path_for(&source.title);
        if fs::read_to_string(&path).is_ok_and(|existing| existing == content) {
            return Ok(false);
        }
        let writer = AtomicFileWriter::new(self.storage.source_dir(&source.title));
        writer.write(CACHE_FILENAME, content.as_bytes())?;
        Ok(true)
    }
}
