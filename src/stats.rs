//src/stats.rs
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

use crate::catalog::ExerciseCatalog;
use crate::daily_log::DailyLog;
use crate::history::HistoryStore;

/// Number of rows in the rolling summary.
pub const SUMMARY_DAYS: usize = 14;

/// One row of the rolling summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub exercise_count: usize,
    pub completed_sets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseRate {
    pub category: String,
    pub exercise: String,
    pub rate: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseTotal {
    pub category: String,
    pub exercise: String,
    pub completed_sets: usize,
    pub recorded_sets: usize,
    pub days: usize,
}

/// Percentage (0-100) of recorded sets marked complete for one exercise across
/// retained history. An exercise with no recorded sets reads as 0.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn completion_rate(history: &HistoryStore, category: &str, exercise: &str) -> u8 {
    let (completed, total) = history
        .entries()
        .iter()
        .filter_map(|entry| entry.data.get(category)?.get(exercise))
        .fold((0usize, 0usize), |(completed, total), sets| {
            (completed + sets.completed(), total + sets.len())
        });

    if total == 0 {
        return 0;
    }
    (100.0 * completed as f64 / total as f64).round() as u8
}

/// Completion rate of every catalog exercise, in catalog order.
pub fn completion_rates(history: &HistoryStore, catalog: &ExerciseCatalog) -> Vec<ExerciseRate> {
    catalog
        .iter()
        .flat_map(|(category, defs)| {
            defs.iter().map(move |def| ExerciseRate {
                category: category.to_string(),
                exercise: def.name.clone(),
                rate: completion_rate(history, category, &def.name),
            })
        })
        .collect()
}

/// `SUMMARY_DAYS` rows, `today` first and then one per preceding day.
/// Days without a saved entry produce zero rows. When `today_log` is given it
/// stands in for today's row instead of any saved snapshot.
pub fn weekly_summary(
    history: &HistoryStore,
    today: NaiveDate,
    today_log: Option<&DailyLog>,
) -> Vec<DaySummary> {
    (0..SUMMARY_DAYS)
        .map(|offset| {
            let date = today - Duration::days(offset as i64);
            let (exercise_count, completed_sets) = match today_log.filter(|_| date == today) {
                Some(log) => (log.exercise_count(), log.completed_sets()),
                None => history
                    .get(date)
                    .map_or((0, 0), |e| (e.exercise_count(), e.completed_sets())),
            };
            DaySummary {
                date,
                exercise_count,
                completed_sets,
            }
        })
        .collect()
}

/// Completed set tally per exercise over retained history, ordered by category
/// then exercise name. Includes exercises no longer in the catalog.
pub fn exercise_totals(history: &HistoryStore) -> Vec<ExerciseTotal> {
    let mut totals: BTreeMap<(&str, &str), ExerciseTotal> = BTreeMap::new();
    for entry in history.entries() {
        for (category, exercises) in &entry.data {
            for (exercise, sets) in exercises {
                let total = totals
                    .entry((category.as_str(), exercise.as_str()))
                    .or_insert_with(|| ExerciseTotal {
                        category: category.clone(),
                        exercise: exercise.clone(),
                        completed_sets: 0,
                        recorded_sets: 0,
                        days: 0,
                    });
                total.completed_sets += sets.completed();
                total.recorded_sets += sets.len();
                total.days += 1;
            }
        }
    }
    totals.into_values().collect()
}
