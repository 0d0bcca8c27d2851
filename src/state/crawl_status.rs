/// Crawl status definitions for tracking a record's lifecycle
///
/// A record moves `queued -> running -> done` on success and ends in `error`
/// on any terminal failure. `done` and `error` accept no further transitions.
use std::fmt;

/// Represents the current status of a crawl record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStatus {
    /// Record created and waiting for a worker
    Queued,

    /// A worker is fetching and analyzing the target
    Running,

    /// Analysis finished and its facts were persisted
    Done,

    /// Fetch, decode, deadline or cancellation failure
    Error,
}

impl CrawlStatus {
    /// Returns true if this is a terminal status (no further transition)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Returns true if the record may still change
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if `self -> next` is an allowed transition
    ///
    /// `queued -> error` covers crawls cancelled before a worker ran them.
    pub fn can_transition_to(&self, next: CrawlStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Queued, Self::Error)
                | (Self::Running, Self::Done)
                | (Self::Running, Self::Error)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all() -> [Self; 4] {
        [Self::Queued, Self::Running, Self::Done, Self::Error]
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_db_string())
    }
}
