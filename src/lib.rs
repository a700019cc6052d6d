// src/lib.rs
use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// --- Declare modules ---
pub mod catalog;
mod config;
pub mod daily_log;
pub mod db;
pub mod history;
pub mod state;
pub mod stats;

// --- Expose public types ---
pub use catalog::{CatalogError, ExerciseCatalog, ExerciseDef, MAX_SETS};
pub use config::{parse_color, Config, Error as ConfigError, StandardColor, Theme};
pub use daily_log::{DailyLog, SetCompletion, SET_SLOTS};
pub use db::{DbError, SqliteGateway, StateGateway};
pub use history::{HistoryEntry, HistoryStore, HISTORY_LIMIT};
pub use state::{LoadedState, PersistedState};
pub use stats::{DaySummary, ExerciseRate, ExerciseTotal, SUMMARY_DAYS};

/// Live state of the app. Every mutating method persists before returning.
pub struct AppService {
    pub config: Config,
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    pub catalog: ExerciseCatalog,
    /// Days edited since (or without) being saved to history.
    pub records: BTreeMap<NaiveDate, DailyLog>,
    pub history: HistoryStore,
    gateway: Box<dyn StateGateway>,
}

impl AppService {
    /// Initializes the application service.
    /// # Errors
    /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let db_path = db::get_db_path().context("Failed to determine database path")?;
        let gateway = SqliteGateway::open(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        Self::with_gateway(config, config_path, db_path, Box::new(gateway))
    }

    /// Builds the service over any gateway and loads whatever it holds.
    /// # Errors
    /// Returns `anyhow::Error` if the gateway cannot be read.
    pub fn with_gateway(
        config: Config,
        config_path: PathBuf,
        db_path: PathBuf,
        gateway: Box<dyn StateGateway>,
    ) -> Result<Self> {
        let loaded = load_state(gateway.as_ref())?;
        info!(
            exercises = loaded.catalog.iter().map(|(_, names)| names.len()).sum::<usize>(),
            live_days = loaded.records.len(),
            saved_days = loaded.history.len(),
            "state loaded"
        );
        Ok(Self {
            config,
            config_path,
            db_path,
            catalog: loaded.catalog,
            records: loaded.records,
            history: loaded.history,
            gateway,
        })
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    /// Today's date on the local calendar.
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Sets the table header color.
    /// # Errors
    /// - `ConfigError::InvalidColor` if the name is not a standard color.
    /// - `ConfigError` variants if saving fails.
    pub fn set_header_color(&mut self, color: &str) -> Result<StandardColor, ConfigError> {
        let parsed = parse_color(color)?;
        self.config.theme.header_color = format!("{parsed:?}");
        self.save_config()?;
        Ok(parsed)
    }

    /// Writes the full state through the gateway.
    /// # Errors
    /// Returns `anyhow::Error` if serialization or the gateway fails.
    pub fn persist(&self) -> Result<()> {
        let blob = PersistedState::capture(&self.catalog, &self.records, &self.history)
            .to_json()
            .context("Failed to serialize state")?;
        self.gateway.save(&blob).context("Failed to persist state")
    }

    // --- Daily log ---

    /// The day as it should be displayed: the live record if there is one,
    /// otherwise the saved snapshot, otherwise an empty log.
    pub fn day_view(&self, date: NaiveDate) -> DailyLog {
        self.records.get(&date).cloned().unwrap_or_else(|| {
            self.history
                .get(date)
                .map(HistoryEntry::to_log)
                .unwrap_or_default()
        })
    }

    /// Set completion for one exercise on one day, padded to the exercise's
    /// configured set count. Never changes state.
    pub fn completion(&self, date: NaiveDate, category: &str, exercise: &str) -> SetCompletion {
        let slots = self.configured_sets(category, exercise);
        let mut sets = match self.records.get(&date) {
            Some(log) => log.sets.get(category).and_then(|e| e.get(exercise)).cloned(),
            None => self
                .history
                .get(date)
                .and_then(|entry| entry.data.get(category)?.get(exercise).cloned()),
        }
        .unwrap_or_else(|| SetCompletion::with_len(slots));
        sets.pad_to(slots);
        sets
    }

    /// Number of checkboxes `toggle_set` accepts for this exercise on this day:
    /// the configured set count, or more if a longer vector was already stored.
    pub fn set_slots(&self, date: NaiveDate, category: &str, exercise: &str) -> usize {
        self.completion(date, category, exercise).len()
    }

    fn configured_sets(&self, category: &str, exercise: &str) -> usize {
        self.catalog.get(category, exercise).map_or(SET_SLOTS, |def| def.sets)
    }

    pub fn is_saved(&self, date: NaiveDate) -> bool {
        self.history.get(date).is_some()
    }

    /// `true` when the live record for `date` differs from what is saved.
    pub fn has_unsaved_changes(&self, date: NaiveDate) -> bool {
        match (self.records.get(&date), self.history.get(date)) {
            (Some(log), Some(entry)) => log.sets != entry.data || log.notes != entry.memo,
            (Some(log), None) => !log.is_empty(),
            (None, _) => false,
        }
    }

    /// Flips one set checkbox and returns its new value.
    /// # Errors
    /// - `CatalogError::UnknownExercise` if the exercise isn't in the catalog.
    /// - `anyhow::Error` if persisting fails.
    /// # Panics
    /// If `set_index` is not below `set_slots(date, category, exercise)`.
    pub fn toggle_set(
        &mut self,
        date: NaiveDate,
        category: &str,
        exercise: &str,
        set_index: usize,
    ) -> Result<bool> {
        let Some(slots) = self.catalog.get(category, exercise).map(|def| def.sets) else {
            bail!(CatalogError::UnknownExercise {
                category: category.to_string(),
                name: exercise.to_string(),
            });
        };
        // Stored vectors shorter than the configured count are padded first
        let done = self
            .live_log_mut(date)
            .toggle_set_sized(category, exercise, set_index, slots);
        debug!(%date, category, exercise, set_index, done, "toggled set");
        self.persist()?;
        Ok(done)
    }

    /// Replaces the note for a category on one day.
    /// # Errors
    /// Returns `anyhow::Error` if persisting fails.
    pub fn set_note(&mut self, date: NaiveDate, category: &str, text: &str) -> Result<()> {
        self.live_log_mut(date).set_note(category, text);
        debug!(%date, category, len = text.len(), "note updated");
        self.persist()
    }

    /// Commits the day as it currently reads into history.
    /// # Errors
    /// Returns `anyhow::Error` if persisting fails.
    pub fn save_day(&mut self, date: NaiveDate) -> Result<HistoryEntry> {
        let entry = HistoryEntry::from_log(date, &self.day_view(date));
        self.history.save(entry.clone());
        info!(%date, saved_days = self.history.len(), "day saved to history");
        self.persist()?;
        Ok(entry)
    }

    pub fn history_entries(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    /// Live record for `date`, seeded from its saved snapshot the first time
    /// a saved day is edited.
    fn live_log_mut(&mut self, date: NaiveDate) -> &mut DailyLog {
        let history = &self.history;
        self.records.entry(date).or_insert_with(|| {
            history
                .get(date)
                .map(HistoryEntry::to_log)
                .unwrap_or_default()
        })
    }

    // --- Exercise catalog ---

    /// # Errors
    /// - `CatalogError` if the name is blank or already present.
    /// - `anyhow::Error` if persisting fails.
    pub fn add_exercise(&mut self, category: &str, name: &str) -> Result<()> {
        self.add_exercise_with_target(category, name, SET_SLOTS, 0)
    }

    /// # Errors
    /// - `CatalogError` if the name is blank or already present, or `sets` is out of range.
    /// - `anyhow::Error` if persisting fails.
    pub fn add_exercise_with_target(
        &mut self,
        category: &str,
        name: &str,
        sets: usize,
        reps: u32,
    ) -> Result<()> {
        self.catalog.add_with_target(category, name, sets, reps)?;
        info!(category, name = name.trim(), sets, reps, "exercise added");
        self.persist()
    }

    /// Renames an exercise and moves its recorded sets, live and saved, to the
    /// new name. Returns the old name.
    /// # Errors
    /// - `CatalogError` on a bad name or position.
    /// - `anyhow::Error` if persisting fails.
    pub fn rename_exercise(&mut self, category: &str, index: usize, new_name: &str) -> Result<String> {
        let old = self.catalog.rename(category, index, new_name)?;
        let new = new_name.trim();
        if old != new {
            let live = self
                .records
                .values_mut()
                .map(|log| log.rename_exercise(category, &old, new))
                .filter(|&moved| moved)
                .count();
            let saved = self.history.rename_exercise(category, &old, new);
            info!(category, %old, new, live, saved, "exercise renamed");
        }
        self.persist()?;
        Ok(old)
    }

    /// Removes an exercise from the catalog. Recorded sets stay where they are.
    /// # Errors
    /// - `CatalogError` on a bad position.
    /// - `anyhow::Error` if persisting fails.
    pub fn delete_exercise(&mut self, category: &str, index: usize) -> Result<String> {
        let removed = self.catalog.remove(category, index)?;
        info!(category, name = %removed.name, "exercise removed");
        self.persist()?;
        Ok(removed.name)
    }

    /// Sets how many checkboxes an exercise gets and its rep target.
    /// Days already recorded keep their vectors; they are padded when next edited.
    /// # Errors
    /// - `CatalogError` on a bad set count or position.
    /// - `anyhow::Error` if persisting fails.
    pub fn set_exercise_target(
        &mut self,
        category: &str,
        index: usize,
        sets: usize,
        reps: u32,
    ) -> Result<ExerciseDef> {
        let def = self.catalog.set_target(category, index, sets, reps)?.clone();
        info!(category, name = %def.name, sets, reps, "exercise target updated");
        self.persist()?;
        Ok(def)
    }

    /// # Errors
    /// - `CatalogError` on a bad position.
    /// - `anyhow::Error` if persisting fails.
    pub fn move_exercise(&mut self, category: &str, from: usize, to: usize) -> Result<()> {
        self.catalog.reorder(category, from, to)?;
        debug!(category, from, to, "exercise moved");
        self.persist()
    }

    // --- Aggregations ---

    pub fn completion_rate(&self, category: &str, exercise: &str) -> u8 {
        stats::completion_rate(&self.history, category, exercise)
    }

    pub fn completion_rates(&self) -> Vec<ExerciseRate> {
        stats::completion_rates(&self.history, &self.catalog)
    }

    /// Rolling 14-day summary ending at `today`, counting today's unsaved edits.
    pub fn weekly_summary(&self, today: NaiveDate) -> Vec<DaySummary> {
        stats::weekly_summary(&self.history, today, self.records.get(&today))
    }

    pub fn exercise_totals(&self) -> Vec<ExerciseTotal> {
        stats::exercise_totals(&self.history)
    }
}

fn load_state(gateway: &dyn StateGateway) -> Result<LoadedState> {
    let state = match gateway.load().context("Failed to read stored state")? {
        Some(blob) => PersistedState::from_json_lenient(&blob),
        None => {
            info!("no stored state, starting with default exercises");
            PersistedState::with_default_catalog()
        }
    };
    Ok(state.into_loaded())
}
