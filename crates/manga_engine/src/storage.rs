use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use manga_core::{sanitize_component, ErrorKind, Page, Source, WorkUnit};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::filename::{image_extension, page_stem};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("page has no image url to derive a file name from")]
    Unresolved,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Filesystem
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { path: PathBuf, bytes: u64 },
    AlreadySkipped { path: PathBuf },
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), StorageError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| StorageError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(StorageError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| StorageError::OutputDir(e.to_string()))?;
    }
    // Writability check: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| StorageError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| StorageError::Io(e.error))?;
        Ok(target)
    }
}

/// Lays images out as `<root>/<title>/<unit>/<NNN>.<ext>`.
#[derive(Debug, Clone)]
pub struct StorageWriter {
    root: PathBuf,
}

impl StorageWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_dir(&self, title: &str) -> PathBuf {
        self.root.join(sanitize_component(title))
    }

    pub fn unit_dir(&self, source: &Source, unit: &WorkUnit) -> PathBuf {
        self.source_dir(&source.title)
            .join(sanitize_component(&unit.name))
    }

    pub fn page_path(&self, source: &Source, unit: &WorkUnit, page: &Page, ext: &str) -> PathBuf {
        let stem = page_stem(page.index, unit.pages.len());
        self.unit_dir(source, unit).join(format!("{stem}.{ext}"))
    }

    /// A nonzero-size file for this page under any extension.
    ///
    /// Looks by stem because lazily resolved pages have no known extension yet.
    pub fn existing(&self, source: &Source, unit: &WorkUnit, page: &Page) -> Option<PathBuf> {
        let dir = self.unit_dir(source, unit);
        let stem = page_stem(page.index, unit.pages.len());
        fs::read_dir(&dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|path| {
                path.file_stem().and_then(|s| s.to_str()) == Some(stem.as_str())
                    && fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
            })
    }

    pub fn write(
        &self,
        source: &Source,
        unit: &WorkUnit,
        page: &Page,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<WriteOutcome, StorageError> {
        if let Some(path) = self.existing(source, unit, page) {
            return Ok(WriteOutcome::AlreadySkipped { path });
        }
        let image_url = page.image_url.as_deref().ok_or(StorageError::Unresolved)?;
        let ext = image_extension(image_url, content_type);
        let target = self.page_path(source, unit, page, &ext);
        let filename = target
            .file_name()
            .and_then(|n| n.to_str())
            .map(ToOwned::to_owned)
            .ok_or_else(|| StorageError::OutputDir("invalid page file name".into()))?;
        let writer = AtomicFileWriter::new(self.unit_dir(source, unit));
        let path = writer.write(&filename, bytes)?;
        Ok(WriteOutcome::Written {
            path,
            bytes: bytes.len() as u64,
        })
    }
}
