//! The wat record and its status lifecycle.
//!
//! A wat is one submitted image URL together with its composited result. The
//! URL is the record's identity and the join key across every pipeline stage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventParseError;

/// Lifecycle status of a wat record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatStatus {
    /// Submitted and waiting for the download stage.
    Queued,
    /// Original image archived in blob storage.
    Downloaded,
    /// Watified image published; terminal.
    Completed,
    /// A stage failed for this record; terminal.
    Error,
}

impl WatStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Queued, Self::Downloaded, Self::Completed, Self::Error];

    /// Return the stored string form of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Downloaded => "downloaded",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Whether no further status update is accepted.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Downloaded => 1,
            Self::Completed => 2,
            Self::Error => 3,
        }
    }

    /// Whether an update from `self` to `next` is allowed.
    ///
    /// Re-applying the current status is always allowed so that redelivered
    /// notifications stay harmless. Otherwise the status only moves forward
    /// along queued → downloaded → completed, and `error` can be entered from
    /// any non-terminal status. Going back to `queued` is reserved for a
    /// fresh insert.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Error => true,
            Self::Queued => false,
            _ => next.rank() > self.rank(),
        }
    }

    /// Statuses from which an update to `next` is allowed.
    #[must_use]
    pub fn allowed_predecessors(next: Self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(next))
            .collect()
    }
}

impl fmt::Display for WatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatStatus {
    type Err = EventParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "downloaded" => Ok(Self::Downloaded),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            other => Err(EventParseError::InvalidStatus(other.to_owned())),
        }
    }
}

/// A persisted wat record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatRecord {
    /// Submitted image URL; the record's unique key.
    pub url: String,
    /// Current lifecycle status.
    pub status: WatStatus,
    /// Creation date (UTC), the partition of the recent-wats index.
    pub created_at_date: NaiveDate,
    /// Creation time as epoch seconds, the sort key of the recent-wats index.
    pub created_at_time: i64,
    /// Public URL of the composited image, set once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watified_url: Option<String>,
}

impl WatRecord {
    /// Build a freshly queued record created at `now`.
    #[must_use]
    pub fn queued(url: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            status: WatStatus::Queued,
            created_at_date: now.date_naive(),
            created_at_time: now.timestamp(),
            watified_url: None,
        }
    }

    /// Creation date rendered as an ISO `YYYY-MM-DD` string.
    #[must_use]
    pub fn created_at_date_iso(&self) -> String {
        self.created_at_date.format("%Y-%m-%d").to_string()
    }
}
