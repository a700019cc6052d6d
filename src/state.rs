//src/state.rs
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::catalog::{ExerciseCatalog, ExerciseDef, LOWER, UPPER};
use crate::daily_log::{DailyLog, Notes, SetData};
use crate::history::{HistoryEntry, HistoryStore};

const LEGACY_UPPER_FIELD: &str = "upperBodyExercises";
const LEGACY_LOWER_FIELD: &str = "lowerBodyExercises";

/// Everything that gets persisted, in its stored shape.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub records: BTreeMap<NaiveDate, SetData>,
    pub memos: BTreeMap<NaiveDate, Notes>,
    pub history: Vec<HistoryEntry>,
    pub exercises_by_category: BTreeMap<String, Vec<ExerciseDef>>,
}

/// The in-memory form the service works with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedState {
    pub catalog: ExerciseCatalog,
    pub records: BTreeMap<NaiveDate, DailyLog>,
    pub history: HistoryStore,
}

impl PersistedState {
    pub fn capture(
        catalog: &ExerciseCatalog,
        records: &BTreeMap<NaiveDate, DailyLog>,
        history: &HistoryStore,
    ) -> Self {
        let mut state = Self {
            history: history.entries().to_vec(),
            exercises_by_category: catalog
                .iter()
                .map(|(category, defs)| (category.to_string(), defs.to_vec()))
                .collect(),
            ..Default::default()
        };
        for (date, log) in records {
            if !log.sets.is_empty() {
                state.records.insert(*date, log.sets.clone());
            }
            if !log.notes.is_empty() {
                state.memos.insert(*date, log.notes.clone());
            }
        }
        state
    }

    /// Splits stored records and memos back into per-day logs and restores the
    /// history invariants.
    pub fn into_loaded(self) -> LoadedState {
        let mut records: BTreeMap<NaiveDate, DailyLog> = BTreeMap::new();
        for (date, sets) in self.records {
            records.entry(date).or_default().sets = sets;
        }
        for (date, notes) in self.memos {
            records.entry(date).or_default().notes = notes;
        }
        LoadedState {
            catalog: ExerciseCatalog::from_lists(self.exercises_by_category),
            records,
            history: HistoryStore::from_entries(self.history),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes a stored blob one field at a time. Anything missing or malformed
    /// falls back to its default; this never fails.
    pub fn from_json_lenient(blob: &str) -> Self {
        let fields = match serde_json::from_str::<Value>(blob) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => {
                warn!("stored state is not an object, starting from defaults");
                return Self::with_default_catalog();
            }
            Err(e) => {
                warn!("stored state is not valid JSON ({e}), starting from defaults");
                return Self::with_default_catalog();
            }
        };

        let exercises_by_category = field(&fields, "exercisesByCategory")
            .or_else(|| legacy_catalog(&fields))
            .unwrap_or_else(default_lists);

        Self {
            records: field(&fields, "records").unwrap_or_default(),
            memos: field(&fields, "memos").unwrap_or_default(),
            history: field(&fields, "history").unwrap_or_default(),
            exercises_by_category,
        }
    }

    pub fn with_default_catalog() -> Self {
        Self {
            exercises_by_category: default_lists(),
            ..Default::default()
        }
    }
}

fn field<T: DeserializeOwned>(fields: &Map<String, Value>, name: &str) -> Option<T> {
    let value = fields.get(name)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(field = name, "ignoring malformed stored field: {e}");
            None
        }
    }
}

fn legacy_catalog(fields: &Map<String, Value>) -> Option<BTreeMap<String, Vec<ExerciseDef>>> {
    let upper: Option<Vec<ExerciseDef>> = field(fields, LEGACY_UPPER_FIELD);
    let lower: Option<Vec<ExerciseDef>> = field(fields, LEGACY_LOWER_FIELD);
    if upper.is_none() && lower.is_none() {
        return None;
    }
    let defaults = default_lists();
    let mut lists = BTreeMap::new();
    lists.insert(
        UPPER.to_string(),
        upper.unwrap_or_else(|| defaults.get(UPPER).cloned().unwrap_or_default()),
    );
    lists.insert(
        LOWER.to_string(),
        lower.unwrap_or_else(|| defaults.get(LOWER).cloned().unwrap_or_default()),
    );
    Some(lists)
}

fn default_lists() -> BTreeMap<String, Vec<ExerciseDef>> {
    ExerciseCatalog::default()
        .iter()
        .map(|(category, defs)| (category.to_string(), defs.to_vec()))
        .collect()
}
