//! Per-file event histories
//!
//! A tracked file is identified by the transitive closure of its historical
//! hashes, not by its path. The current path, size, time and checksum are
//! all derived from the most recent event that carries a checksum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::Checksum;

/// Kind of observation recorded in a history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Changed,
    Deleted,
}

/// An immutable observation about a single tracked file.
///
/// `checksum` is `None` exactly when `kind` is [`EventKind::Deleted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    pub path: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub size: u64,
    #[serde(rename = "event")]
    pub kind: EventKind,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(size: &u64) -> bool {
    *size == 0
}

impl FileEvent {
    /// A "changed" observation
    #[must_use]
    pub fn changed(
        path: impl Into<String>,
        size: u64,
        time: DateTime<Utc>,
        checksum: Checksum,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            kind: EventKind::Changed,
            time,
            checksum: Some(checksum),
        }
    }

    /// A "deleted" observation
    #[must_use]
    pub fn deleted(path: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            size: 0,
            kind: EventKind::Deleted,
            time,
            checksum: None,
        }
    }
}

/// A tracked file: an append-only, time-ordered event history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<FileEvent>,
}

impl FileInfo {
    /// A fresh single-event history
    #[must_use]
    pub fn new(event: FileEvent) -> Self {
        Self {
            history: vec![event],
        }
    }

    /// The last event that carries a checksum. `None` only for an empty
    /// history, which the constructors never produce.
    #[must_use]
    pub fn current(&self) -> Option<&FileEvent> {
        self.history.iter().rev().find(|e| e.checksum.is_some())
    }

    /// Current checksum, if the file has ever been observed with content
    #[must_use]
    pub fn checksum(&self) -> Option<&Checksum> {
        self.current().and_then(|e| e.checksum.as_ref())
    }

    /// Last known repository-relative path; empty for an empty history
    #[must_use]
    pub fn current_path(&self) -> &str {
        self.current().map_or("", |e| e.path.as_str())
    }

    /// Last known size
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current().map_or(0, |e| e.size)
    }

    /// Last known modification time
    #[must_use]
    pub fn current_time(&self) -> Option<DateTime<Utc>> {
        self.current().map(|e| e.time)
    }

    /// True if the history is empty or ends in a deletion
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.history.last().is_none_or(|e| e.checksum.is_none())
    }

    /// True if any event in the history carries the given checksum
    #[must_use]
    pub fn inherits_from(&self, checksum: &Checksum) -> bool {
        self.history
            .iter()
            .any(|e| e.checksum.as_ref() == Some(checksum))
    }

    /// Every distinct position's checksum, in history order
    pub fn historical_checksums(&self) -> impl Iterator<Item = &Checksum> {
        self.history.iter().filter_map(|e| e.checksum.as_ref())
    }

    /// Record a deletion, unless the file is already deleted.
    ///
    /// The deletion event keeps the file's last known path.
    pub fn mark_deleted(&mut self, time: DateTime<Utc>) {
        if !self.is_deleted() {
            let path = self.current_path().to_string();
            self.history.push(FileEvent::deleted(path, time));
        }
    }

    /// Record a change.
    ///
    /// A repeated identical observation (same path and same checksum as the
    /// previous event) is coalesced away. A rename carries the same checksum
    /// under a new path and is always recorded.
    pub fn append_change(
        &mut self,
        path: impl Into<String>,
        size: u64,
        time: DateTime<Utc>,
        checksum: Checksum,
    ) {
        let path = path.into();
        if let Some(last) = self.history.last() {
            if last.path == path && last.checksum.as_ref() == Some(&checksum) {
                return;
            }
        }
        self.history.push(FileEvent::changed(path, size, time, checksum));
    }
}
