//src/catalog.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::daily_log::SET_SLOTS;

pub const UPPER: &str = "upper";
pub const LOWER: &str = "lower";

/// Upper bound for a configured set count.
pub const MAX_SETS: usize = 20;

// (name, reps); every default exercise starts with SET_SLOTS sets
const DEFAULT_UPPER: &[(&str, u32)] = &[
    ("懸垂", 5),
    ("ダンベルロー", 15),
    ("プルオーバー", 10),
    ("プッシュアップ", 15),
];
const DEFAULT_LOWER: &[(&str, u32)] = &[("バックランジ", 20), ("ワイドスクワット", 15)];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Exercise name cannot be empty.")]
    EmptyName,
    #[error("Exercise '{name}' already exists in category '{category}'.")]
    DuplicateName { category: String, name: String },
    #[error("Exercise '{name}' is not in category '{category}'.")]
    UnknownExercise { category: String, name: String },
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    #[error("Index {index} is out of range for category '{category}' ({len} exercises).")]
    IndexOutOfRange {
        category: String,
        index: usize,
        len: usize,
    },
    #[error("Set count must be between 1 and {MAX_SETS}, got {0}.")]
    InvalidSetCount(usize),
}

/// One catalog exercise with its target: `sets` checkboxes of `reps` reps each.
/// `reps == 0` means no rep target.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "StoredExercise")]
pub struct ExerciseDef {
    pub name: String,
    pub sets: usize,
    pub reps: u32,
}

impl ExerciseDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sets: SET_SLOTS,
            reps: 0,
        }
    }

    /// "5 reps x 3 sets", or just "3 sets" without a rep target.
    pub fn target(&self) -> String {
        if self.reps == 0 {
            format!("{} sets", self.sets)
        } else {
            format!("{} reps x {} sets", self.reps, self.sets)
        }
    }
}

// Older state stores bare names; newer state stores objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredExercise {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        sets: usize,
        #[serde(default)]
        reps: u32,
    },
}

impl From<StoredExercise> for ExerciseDef {
    fn from(stored: StoredExercise) -> Self {
        match stored {
            StoredExercise::Name(name) => Self::new(&name),
            StoredExercise::Full { name, sets, reps } => Self {
                name,
                sets: if (1..=MAX_SETS).contains(&sets) {
                    sets
                } else {
                    SET_SLOTS
                },
                reps,
            },
        }
    }
}

/// Ordered exercises per category.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct ExerciseCatalog {
    categories: BTreeMap<String, Vec<ExerciseDef>>,
}

impl Default for ExerciseCatalog {
    fn default() -> Self {
        let defaults = |list: &[(&str, u32)]| -> Vec<ExerciseDef> {
            list.iter()
                .map(|&(name, reps)| ExerciseDef {
                    reps,
                    ..ExerciseDef::new(name)
                })
                .collect()
        };
        let mut categories = BTreeMap::new();
        categories.insert(UPPER.to_string(), defaults(DEFAULT_UPPER));
        categories.insert(LOWER.to_string(), defaults(DEFAULT_LOWER));
        Self { categories }
    }
}

impl ExerciseCatalog {
    /// A catalog with no categories at all.
    pub fn empty() -> Self {
        Self {
            categories: BTreeMap::new(),
        }
    }

    /// Builds a catalog from raw lists, trimming names and dropping blanks and
    /// duplicates (first occurrence wins).
    pub fn from_lists(lists: BTreeMap<String, Vec<ExerciseDef>>) -> Self {
        let categories = lists
            .into_iter()
            .map(|(category, defs)| {
                let mut cleaned: Vec<ExerciseDef> = Vec::with_capacity(defs.len());
                for def in defs {
                    let trimmed = def.name.trim();
                    if !trimmed.is_empty() && !cleaned.iter().any(|d| d.name == trimmed) {
                        cleaned.push(ExerciseDef {
                            name: trimmed.to_string(),
                            ..def
                        });
                    }
                }
                (category, cleaned)
            })
            .collect();
        Self { categories }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn exercises(&self, category: &str) -> &[ExerciseDef] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn names(&self, category: &str) -> Vec<&str> {
        self.exercises(category)
            .iter()
            .map(|d| d.name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ExerciseDef])> {
        self.categories
            .iter()
            .map(|(category, defs)| (category.as_str(), defs.as_slice()))
    }

    pub fn get(&self, category: &str, name: &str) -> Option<&ExerciseDef> {
        self.exercises(category).iter().find(|d| d.name == name)
    }

    pub fn contains(&self, category: &str, name: &str) -> bool {
        self.get(category, name).is_some()
    }

    /// Appends a trimmed exercise name with the default target, creating the
    /// category if needed.
    /// # Errors
    /// - `CatalogError::EmptyName` if the name is blank after trimming.
    /// - `CatalogError::DuplicateName` if the category already has that name.
    pub fn add(&mut self, category: &str, name: &str) -> Result<(), CatalogError> {
        self.add_with_target(category, name, SET_SLOTS, 0)
    }

    /// Like `add`, with an explicit set count and rep target.
    /// # Errors
    /// As `add`, plus `CatalogError::InvalidSetCount` unless `1 <= sets <= MAX_SETS`.
    pub fn add_with_target(
        &mut self,
        category: &str,
        name: &str,
        sets: usize,
        reps: u32,
    ) -> Result<(), CatalogError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if !(1..=MAX_SETS).contains(&sets) {
            return Err(CatalogError::InvalidSetCount(sets));
        }
        if self.contains(category, trimmed) {
            return Err(CatalogError::DuplicateName {
                category: category.to_string(),
                name: trimmed.to_string(),
            });
        }
        self.categories
            .entry(category.to_string())
            .or_default()
            .push(ExerciseDef {
                sets,
                reps,
                ..ExerciseDef::new(trimmed)
            });
        Ok(())
    }

    /// Replaces the name at `index` and returns the previous name.
    /// Renaming to the current name is accepted and changes nothing.
    /// # Errors
    /// - `CatalogError::EmptyName`, `CatalogError::DuplicateName` on invalid names.
    /// - `CatalogError::UnknownCategory`, `CatalogError::IndexOutOfRange` on bad positions.
    pub fn rename(
        &mut self,
        category: &str,
        index: usize,
        new_name: &str,
    ) -> Result<String, CatalogError> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        let defs = self.defs_mut(category)?;
        check_index(category, index, defs.len())?;

        if defs[index].name == trimmed {
            return Ok(defs[index].name.clone());
        }
        if defs.iter().any(|d| d.name == trimmed) {
            return Err(CatalogError::DuplicateName {
                category: category.to_string(),
                name: trimmed.to_string(),
            });
        }
        Ok(std::mem::replace(&mut defs[index].name, trimmed.to_string()))
    }

    /// Sets the set count and rep target of the exercise at `index`.
    /// # Errors
    /// - `CatalogError::InvalidSetCount` unless `1 <= sets <= MAX_SETS`.
    /// - `CatalogError::UnknownCategory`, `CatalogError::IndexOutOfRange` on bad positions.
    pub fn set_target(
        &mut self,
        category: &str,
        index: usize,
        sets: usize,
        reps: u32,
    ) -> Result<&ExerciseDef, CatalogError> {
        if !(1..=MAX_SETS).contains(&sets) {
            return Err(CatalogError::InvalidSetCount(sets));
        }
        let defs = self.defs_mut(category)?;
        check_index(category, index, defs.len())?;
        let def = &mut defs[index];
        def.sets = sets;
        def.reps = reps;
        Ok(def)
    }

    /// Removes and returns the exercise at `index`.
    /// # Errors
    /// `CatalogError::UnknownCategory` or `CatalogError::IndexOutOfRange`.
    pub fn remove(&mut self, category: &str, index: usize) -> Result<ExerciseDef, CatalogError> {
        let defs = self.defs_mut(category)?;
        check_index(category, index, defs.len())?;
        Ok(defs.remove(index))
    }

    /// Moves one exercise from `from` to `to`, keeping everyone else in order.
    /// # Errors
    /// `CatalogError::UnknownCategory` or `CatalogError::IndexOutOfRange`.
    pub fn reorder(&mut self, category: &str, from: usize, to: usize) -> Result<(), CatalogError> {
        let defs = self.defs_mut(category)?;
        check_index(category, from, defs.len())?;
        check_index(category, to, defs.len())?;
        let moved = defs.remove(from);
        defs.insert(to, moved);
        Ok(())
    }

    fn defs_mut(&mut self, category: &str) -> Result<&mut Vec<ExerciseDef>, CatalogError> {
        self.categories
            .get_mut(category)
            .ok_or_else(|| CatalogError::UnknownCategory(category.to_string()))
    }
}

fn check_index(category: &str, index: usize, len: usize) -> Result<(), CatalogError> {
    if index < len {
        Ok(())
    } else {
        Err(CatalogError::IndexOutOfRange {
            category: category.to_string(),
            index,
            len,
        })
    }
}
