use std::fmt;

/// Classification of every failure the pipeline can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No adapter is registered for the URL's host.
    UnsupportedSite,
    /// Expected markup was not found.
    Parse,
    /// The content is gone (404/410).
    NotFound,
    /// The site answered with a bot challenge or denied access.
    Blocked,
    /// Timeouts, connection resets and 5xx responses.
    TransientNetwork,
    /// The image could not be written to disk.
    Filesystem,
    /// Work was abandoned because a stop was requested.
    Interrupted,
}

impl ErrorKind {
    /// Only transient network failures are worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransientNetwork)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnsupportedSite => write!(f, "unsupported site"),
            ErrorKind::Parse => write!(f, "parse error"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::Blocked => write!(f, "blocked"),
            ErrorKind::TransientNetwork => write!(f, "transient network error"),
            ErrorKind::Filesystem => write!(f, "filesystem error"),
            ErrorKind::Interrupted => write!(f, "interrupted"),
        }
    }
}
