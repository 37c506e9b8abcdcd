use chrono::{DateTime, Utc};
use std::fmt;

/// Outcome of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Feed fetched and parsed.
    Ok,
    /// Server reported no new data (HTTP 304).
    OkNoData,
    /// Fetch or decode failed.
    Error,
}

impl UpdateStatus {
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::OkNoData)
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "OK",
            Self::OkNoData => "OK_NO_DATA",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Summary of one manager update cycle, handed to the status callback.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: UpdateStatus,
    /// When the last update attempt finished, successful or not.
    pub last_update: Option<DateTime<Utc>>,
    pub last_update_successful: Option<DateTime<Utc>>,
    /// Most recent publication date among the current entries.
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Number of entries currently tracked.
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}
