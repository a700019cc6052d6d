//src/history.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::daily_log::{self, DailyLog, Notes, SetData};

/// Maximum number of saved days kept.
pub const HISTORY_LIMIT: usize = 14;

/// Snapshot of one saved day.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub memo: Notes,
    #[serde(default)]
    pub data: SetData,
}

impl HistoryEntry {
    /// Copies the log's current content into a snapshot for `date`.
    pub fn from_log(date: NaiveDate, log: &DailyLog) -> Self {
        Self {
            date,
            memo: log.notes.clone(),
            data: log.sets.clone(),
        }
    }

    pub fn to_log(&self) -> DailyLog {
        DailyLog::new(self.data.clone(), self.memo.clone())
    }

    pub fn exercise_count(&self) -> usize {
        daily_log::count_exercises(&self.data)
    }

    pub fn completed_sets(&self) -> usize {
        daily_log::count_completed(&self.data)
    }
}

/// Saved days, newest first, one per date, capped at `HISTORY_LIMIT`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from entries listed newest first. A date seen twice keeps
    /// its first (newest) entry and the list is cut to `HISTORY_LIMIT`.
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let mut kept: Vec<HistoryEntry> = Vec::with_capacity(entries.len().min(HISTORY_LIMIT));
        for entry in entries {
            if kept.iter().any(|e| e.date == entry.date) {
                debug!(date = %entry.date, "dropping duplicate history entry");
                continue;
            }
            kept.push(entry);
        }
        kept.truncate(HISTORY_LIMIT);
        Self { entries: kept }
    }

    /// Commits a snapshot as the most recent entry, replacing any entry for the
    /// same date and evicting beyond `HISTORY_LIMIT`.
    pub fn save(&mut self, entry: HistoryEntry) {
        let before = self.entries.len();
        self.entries.retain(|e| e.date != entry.date);
        let replaced = before != self.entries.len();

        debug!(date = %entry.date, replaced, "saving history entry");
        self.entries.insert(0, entry);

        if self.entries.len() > HISTORY_LIMIT {
            for evicted in self.entries.drain(HISTORY_LIMIT..) {
                info!(date = %evicted.date, "evicting oldest history entry");
            }
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, date: NaiveDate) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.date == date)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-keys set data of a renamed exercise in every snapshot. Where a snapshot
    /// already holds data under `new`, the migrated data replaces it.
    /// Returns the number of snapshots touched.
    pub fn rename_exercise(&mut self, category: &str, old: &str, new: &str) -> usize {
        self.entries
            .iter_mut()
            .map(|entry| daily_log::rename_key(&mut entry.data, category, old, new))
            .filter(|&moved| moved)
            .count()
    }
}
