#![deny(missing_docs)]
//! Shared logging utilities for the manga harvester workspace.
//!
//! This crate provides the `manga_*` logging macros used across the codebase,
//! the per-invocation session logger (terminal plus append-only log file) and
//! a minimal test initializer for the global logger.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! manga_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! manga_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! manga_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! manga_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! manga_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Errors raised while installing the session logger.
#[derive(Debug, thiserror::Error)]
pub enum LogInitError {
    /// The log file or its parent directory could not be opened.
    #[error("cannot open log file {path:?}: {source}")]
    LogFile {
        /// Path of the log file that failed to open.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// A global logger was already installed in this process.
    #[error("a global logger is already installed")]
    AlreadyInitialized,
}

/// Options for one logging session (one program invocation).
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Append-only log file. `None` logs to the terminal only.
    pub log_file: Option<PathBuf>,
    /// Level for terminal output.
    pub terminal_level: LevelFilter,
    /// Level for the log file.
    pub file_level: LevelFilter,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            log_file: Some(PathBuf::from("./logs/manga.log")),
            terminal_level: LevelFilter::Info,
            file_level: LevelFilter::Debug,
        }
    }
}

/// Installs the global logger for this invocation and writes a session banner.
///
/// The log file is opened in append mode so consecutive runs accumulate in
/// one file, each delimited by its banner.
pub fn init_session(options: &SessionOptions) -> Result<(), LogInitError> {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        options.terminal_level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = options.log_file.as_deref() {
        let file = open_append(path)?;
        loggers.push(WriteLogger::new(options.file_level, config, file));
    }

    CombinedLogger::init(loggers).map_err(|_| LogInitError::AlreadyInitialized)?;

    manga_info!(
        "===== session started {} (pid {}) =====",
        chrono::Utc::now().to_rfc3339(),
        std::process::id()
    );
    Ok(())
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .add_filter_ignore_str("html5ever")
        .add_filter_ignore_str("selectors")
        .build()
}

fn open_append(path: &Path) -> Result<File, LogInitError> {
    let to_err = |source| LogInitError::LogFile {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_err)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_err)
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        build_config(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
