//src/daily_log.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Checkbox slots for an exercise without a configured set count.
pub const SET_SLOTS: usize = 5;

/// `category -> exercise -> sets`, the shape shared by live records and history snapshots.
pub type SetData = BTreeMap<String, BTreeMap<String, SetCompletion>>;

/// `category -> note`
pub type Notes = BTreeMap<String, String>;

/// Which numbered sets of one exercise were completed on one day.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct SetCompletion(Vec<bool>);

impl Default for SetCompletion {
    fn default() -> Self {
        Self(vec![false; SET_SLOTS])
    }
}

impl From<Vec<bool>> for SetCompletion {
    fn from(sets: Vec<bool>) -> Self {
        Self(sets)
    }
}

impl SetCompletion {
    /// `slots` unticked sets.
    pub fn with_len(slots: usize) -> Self {
        Self(vec![false; slots])
    }

    /// Extends with unticked sets up to `slots`; longer vectors are left alone.
    pub fn pad_to(&mut self, slots: usize) {
        if self.0.len() < slots {
            self.0.resize(slots, false);
        }
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn completed(&self) -> usize {
        self.0.iter().filter(|&&done| done).count()
    }

    /// Flips one set and returns its new value.
    /// # Panics
    /// If `set_index` is not below `len()`.
    pub fn toggle(&mut self, set_index: usize) -> bool {
        assert!(
            set_index < self.0.len(),
            "set index {set_index} out of range for {} sets",
            self.0.len()
        );
        self.0[set_index] = !self.0[set_index];
        self.0[set_index]
    }
}

/// One day's checkboxes and notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyLog {
    pub sets: SetData,
    pub notes: Notes,
}

impl DailyLog {
    pub fn new(sets: SetData, notes: Notes) -> Self {
        Self { sets, notes }
    }

    /// Flips `set_index` for the exercise, materialising an all-false vector of
    /// `SET_SLOTS` first if this exercise has no data yet. Returns the new value.
    /// # Panics
    /// If `set_index` is outside the exercise's set vector.
    pub fn toggle_set(&mut self, category: &str, exercise: &str, set_index: usize) -> bool {
        self.toggle_set_sized(category, exercise, set_index, SET_SLOTS)
    }

    /// Like `toggle_set`, but the vector is created with (or padded up to)
    /// `slots` sets before flipping.
    /// # Panics
    /// If `set_index` is not below the resulting vector length.
    pub fn toggle_set_sized(
        &mut self,
        category: &str,
        exercise: &str,
        set_index: usize,
        slots: usize,
    ) -> bool {
        let sets = self
            .sets
            .entry(category.to_string())
            .or_default()
            .entry(exercise.to_string())
            .or_insert_with(|| SetCompletion::with_len(slots));
        sets.pad_to(slots);
        sets.toggle(set_index)
    }

    /// Replaces the category note. Empty text removes it.
    pub fn set_note(&mut self, category: &str, text: &str) {
        if text.is_empty() {
            self.notes.remove(category);
        } else {
            self.notes.insert(category.to_string(), text.to_string());
        }
    }

    pub fn note(&self, category: &str) -> &str {
        self.notes.get(category).map_or("", String::as_str)
    }

    /// Read-only lookup; absent exercises read as all-false without being stored.
    pub fn completion(&self, category: &str, exercise: &str) -> SetCompletion {
        self.sets
            .get(category)
            .and_then(|exercises| exercises.get(exercise))
            .cloned()
            .unwrap_or_default()
    }

    /// Read-only lookup padded to `slots` sets for display.
    pub fn completion_sized(&self, category: &str, exercise: &str, slots: usize) -> SetCompletion {
        let mut sets = self
            .sets
            .get(category)
            .and_then(|exercises| exercises.get(exercise))
            .cloned()
            .unwrap_or_else(|| SetCompletion::with_len(slots));
        sets.pad_to(slots);
        sets
    }

    /// Moves set data stored under `old` to `new` within a category.
    /// Returns `true` if anything moved.
    pub fn rename_exercise(&mut self, category: &str, old: &str, new: &str) -> bool {
        rename_key(&mut self.sets, category, old, new)
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.notes.is_empty()
    }

    /// Exercises with any recorded data, regardless of how many sets are ticked.
    pub fn exercise_count(&self) -> usize {
        count_exercises(&self.sets)
    }

    pub fn completed_sets(&self) -> usize {
        count_completed(&self.sets)
    }
}

pub(crate) fn rename_key(data: &mut SetData, category: &str, old: &str, new: &str) -> bool {
    let Some(exercises) = data.get_mut(category) else {
        return false;
    };
    match exercises.remove(old) {
        Some(sets) => {
            exercises.insert(new.to_string(), sets);
            true
        }
        None => false,
    }
}

pub(crate) fn count_exercises(data: &SetData) -> usize {
    data.values().map(BTreeMap::len).sum()
}

pub(crate) fn count_completed(data: &SetData) -> usize {
    data.values()
        .flat_map(BTreeMap::values)
        .map(SetCompletion::completed)
        .sum()
}
