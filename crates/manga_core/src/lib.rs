//! Manga core: pure data model, task lifecycle and state machines.
mod error;
mod input;
mod model;
mod naming;
mod progress;
mod shutdown;
mod summary;
mod task;

pub use error::ErrorKind;
pub use input::{parse_url_list, RejectedLine, UrlList};
pub use model::{placeholder_title, Page, PageId, Source, UnitKind, WorkUnit};
pub use naming::{claim_unique_name, sanitize_component};
pub use progress::{ProgressTracker, UnitKey};
pub use shutdown::{update, ShutdownEffect, ShutdownMsg, ShutdownState};
pub use summary::{DownloadResult, Outcome, RunStatus, Summary};
pub use task::{DownloadTask, RetryPolicy, TaskId, TaskStatus};
