use std::time::Duration;

use crate::{ErrorKind, PageId};

pub type TaskId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InFlight,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }
}

/// Scheduled fetch of one page's image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub id: TaskId,
    pub page: PageId,
    pub attempts: u32,
    pub status: TaskStatus,
    pub last_error: Option<ErrorKind>,
}

impl DownloadTask {
    pub fn new(id: TaskId, page: PageId) -> Self {
        Self {
            id,
            page,
            attempts: 0,
            status: TaskStatus::Pending,
            last_error: None,
        }
    }

    /// Begins an attempt. Returns the attempt number (1-based).
    pub fn start(&mut self) -> u32 {
        debug_assert_eq!(self.status, TaskStatus::Pending);
        self.attempts += 1;
        self.status = TaskStatus::InFlight;
        self.attempts
    }

    /// Puts a failed attempt back in line for another try.
    pub fn requeue(&mut self, kind: ErrorKind) {
        self.last_error = Some(kind);
        self.status = TaskStatus::Pending;
    }

    pub fn complete(&mut self) {
        self.status = TaskStatus::Done;
    }

    pub fn fail(&mut self, kind: ErrorKind) {
        self.last_error = Some(kind);
        self.status = TaskStatus::Failed;
    }
}

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, or `None` when the task must be recorded as failed.
    pub fn next_delay(&self, task: &DownloadTask, kind: ErrorKind) -> Option<Duration> {
        if !kind.is_retryable() || task.attempts >= self.max_attempts {
            return None;
        }
        Some(self.backoff(task.attempts))
    }

    /// `base * 2^(attempt - 1)`, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> DownloadTask {
        DownloadTask::new(
            1,
            PageId {
                source: 0,
                unit: 0,
                page: 0,
            },
        )
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn permanent_failures_are_never_retried() {
        let policy = RetryPolicy::default();
        let mut t = task();
        t.start();
        for kind in [ErrorKind::NotFound, ErrorKind::Parse, ErrorKind::Blocked] {
            assert_eq!(policy.next_delay(&t, kind), None);
        }
    }

    #[test]
    fn lifecycle_tracks_attempts() {
        let mut t = task();
        assert_eq!(t.start(), 1);
        t.requeue(ErrorKind::TransientNetwork);
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.start(), 2);
        t.complete();
        assert!(t.status.is_terminal());
        assert_eq!(t.last_error, Some(ErrorKind::TransientNetwork));
    }
}
