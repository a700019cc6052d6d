use anyhow::Result;
use chrono::{Duration, NaiveDate};
use set_tracker_lib::{
    stats, AppService, CatalogError, Config, DailyLog, ExerciseCatalog, ExerciseDef,
    HistoryEntry, HistoryStore, PersistedState, SetCompletion, SqliteGateway, StateGateway,
    HISTORY_LIMIT, MAX_SETS, SET_SLOTS, SUMMARY_DAYS,
};
use std::collections::BTreeMap;

// Helper function to create a test service over an in-memory database
fn create_test_service() -> Result<AppService> {
    let gateway = SqliteGateway::open_in_memory()?;
    AppService::with_gateway(
        Config::default(),
        "test_config.toml".into(),
        ":memory:".into(),
        Box::new(gateway),
    )
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn entry(day: &str, category: &str, exercise: &str, sets: &[bool]) -> HistoryEntry {
    let mut log = DailyLog::default();
    log.sets
        .entry(category.to_string())
        .or_default()
        .insert(exercise.to_string(), SetCompletion::from(sets.to_vec()));
    HistoryEntry::from_log(date(day), &log)
}

// --- History store ---

#[test]
fn test_save_same_date_keeps_last_content() {
    let mut history = HistoryStore::new();
    history.save(entry("2024-01-01", "upper", "懸垂", &[true, true, false, false, false]));
    history.save(entry("2024-01-01", "upper", "懸垂", &[true, true, true, false, false]));

    assert_eq!(history.entries().len(), 1);
    assert_eq!(
        history.entries()[0].data["upper"]["懸垂"].as_slice(),
        &[true, true, true, false, false]
    );
}

#[test]
fn test_history_cap_keeps_most_recent_saves_newest_first() {
    let mut history = HistoryStore::new();
    let start = date("2024-03-01");
    for offset in 0..20 {
        let day = start + Duration::days(offset);
        history.save(HistoryEntry::from_log(day, &DailyLog::default()));
        assert!(history.len() <= HISTORY_LIMIT);
    }

    assert_eq!(history.len(), HISTORY_LIMIT);
    let dates: Vec<NaiveDate> = history.entries().iter().map(|e| e.date).collect();
    let expected: Vec<NaiveDate> = (6..20).rev().map(|o| start + Duration::days(o)).collect();
    assert_eq!(dates, expected);
}

#[test]
fn test_resaving_old_date_moves_it_to_front() {
    let mut history = HistoryStore::new();
    history.save(entry("2024-01-01", "upper", "懸垂", &[true; 5]));
    history.save(entry("2024-01-02", "upper", "懸垂", &[false; 5]));
    history.save(entry("2024-01-01", "upper", "懸垂", &[false; 5]));

    let dates: Vec<NaiveDate> = history.entries().iter().map(|e| e.date).collect();
    assert_eq!(dates, vec![date("2024-01-01"), date("2024-01-02")]);
}

#[test]
fn test_from_entries_restores_invariants() {
    let mut entries = vec![
        entry("2024-02-01", "upper", "懸垂", &[true; 5]),
        entry("2024-02-01", "upper", "懸垂", &[false; 5]),
    ];
    for offset in 0..20 {
        entries.push(HistoryEntry::from_log(
            date("2024-01-01") + Duration::days(offset),
            &DailyLog::default(),
        ));
    }

    let history = HistoryStore::from_entries(entries);
    assert_eq!(history.len(), HISTORY_LIMIT);
    assert_eq!(history.entries()[0].completed_sets(), 5);
    assert_eq!(
        history
            .entries()
            .iter()
            .filter(|e| e.date == date("2024-02-01"))
            .count(),
        1
    );
}

// --- Daily log ---

#[test]
fn test_toggle_twice_restores_original() {
    let mut log = DailyLog::default();
    log.toggle_set("upper", "懸垂", 0);
    let before = log.completion("upper", "懸垂");

    assert!(log.toggle_set("upper", "懸垂", 2));
    assert!(!log.toggle_set("upper", "懸垂", 2));

    assert_eq!(log.completion("upper", "懸垂"), before);
    assert_eq!(before.as_slice(), &[true, false, false, false, false]);
}

#[test]
fn test_completion_read_does_not_materialize() {
    let log = DailyLog::default();
    let sets = log.completion("lower", "バックランジ");
    assert_eq!(sets.len(), SET_SLOTS);
    assert_eq!(sets.completed(), 0);
    assert!(log.is_empty());
}

#[test]
#[should_panic(expected = "out of range")]
fn test_toggle_out_of_range_panics() {
    let mut log = DailyLog::default();
    log.toggle_set("upper", "懸垂", SET_SLOTS);
}

#[test]
fn test_toggle_pads_short_vector() {
    let mut log = DailyLog::default();
    log.sets
        .entry("upper".to_string())
        .or_default()
        .insert("懸垂".to_string(), SetCompletion::from(vec![true]));

    assert!(log.toggle_set("upper", "懸垂", 2));
    assert_eq!(
        log.completion("upper", "懸垂").as_slice(),
        &[true, false, true, false, false]
    );
}

#[test]
fn test_sized_toggle_creates_configured_slots() {
    let mut log = DailyLog::default();
    assert!(log.toggle_set_sized("core", "Plank", 2, 3));
    assert_eq!(log.completion("core", "Plank").as_slice(), &[false, false, true]);
    assert_eq!(log.completion_sized("core", "Plank", 4).len(), 4);
    // Longer vectors are never truncated
    assert_eq!(log.completion_sized("core", "Plank", 2).len(), 3);
}

#[test]
fn test_empty_note_clears() {
    let mut log = DailyLog::default();
    log.set_note("upper", "grip felt weak");
    assert_eq!(log.note("upper"), "grip felt weak");
    log.set_note("upper", "");
    assert_eq!(log.note("upper"), "");
    assert!(log.notes.is_empty());
}

// --- Catalog ---

#[test]
fn test_add_exercise_rejects_blank_and_duplicates() {
    let mut catalog = ExerciseCatalog::empty();
    catalog.add("upper", "  Dips ").unwrap();
    assert_eq!(catalog.names("upper"), vec!["Dips"]);
    assert_eq!(catalog.exercises("upper")[0].sets, SET_SLOTS);

    assert_eq!(catalog.add("upper", "   "), Err(CatalogError::EmptyName));
    assert!(matches!(
        catalog.add("upper", "Dips"),
        Err(CatalogError::DuplicateName { .. })
    ));
    // Same name in another category is fine
    catalog.add("lower", "Dips").unwrap();
    assert_eq!(catalog.exercises("upper").len(), 1);
}

#[test]
fn test_rename_collision_rejected() {
    let mut catalog = ExerciseCatalog::default();
    let names = catalog.exercises("upper").to_vec();

    let result = catalog.rename("upper", 0, &names[1].name);
    assert!(matches!(result, Err(CatalogError::DuplicateName { .. })));
    assert_eq!(catalog.exercises("upper"), names.as_slice());

    // Renaming to itself is a no-op
    assert_eq!(catalog.rename("upper", 0, &names[0].name).unwrap(), names[0].name);
}

#[test]
fn test_reorder_is_a_stable_move() {
    let mut catalog = ExerciseCatalog::empty();
    for name in ["a", "b", "c", "d", "e"] {
        catalog.add("upper", name).unwrap();
    }

    catalog.reorder("upper", 0, 3).unwrap();
    assert_eq!(catalog.names("upper"), vec!["b", "c", "d", "a", "e"]);

    catalog.reorder("upper", 4, 1).unwrap();
    assert_eq!(catalog.names("upper"), vec!["b", "e", "c", "d", "a"]);

    let mut sorted = catalog.names("upper");
    sorted.sort();
    assert_eq!(sorted, vec!["a", "b", "c", "d", "e"]);

    assert!(matches!(
        catalog.reorder("upper", 0, 5),
        Err(CatalogError::IndexOutOfRange { index: 5, len: 5, .. })
    ));
    assert!(matches!(
        catalog.reorder("core", 0, 0),
        Err(CatalogError::UnknownCategory(_))
    ));
}

#[test]
fn test_set_target_validates_count() {
    let mut catalog = ExerciseCatalog::default();
    let def = catalog.set_target("upper", 0, 3, 8).unwrap();
    assert_eq!((def.sets, def.reps), (3, 8));
    assert_eq!(def.target(), "8 reps x 3 sets");

    assert_eq!(
        catalog.set_target("upper", 0, 0, 8),
        Err(CatalogError::InvalidSetCount(0))
    );
    assert_eq!(
        catalog.set_target("upper", 0, MAX_SETS + 1, 8),
        Err(CatalogError::InvalidSetCount(MAX_SETS + 1))
    );
    assert_eq!(catalog.exercises("upper")[0].sets, 3);
    assert_eq!(
        catalog.add_with_target("core", "Plank", 0, 0),
        Err(CatalogError::InvalidSetCount(0))
    );
    assert!(!catalog.contains("core", "Plank"));
}

#[test]
fn test_stored_exercises_accept_names_and_objects() {
    let blob = r#"{
        "exercisesByCategory": {
            "upper": ["Dips", {"name": "Row", "sets": 3, "reps": 12}],
            "lower": [{"name": "Squat"}, {"name": "Lunge", "sets": 99}]
        }
    }"#;
    let loaded = PersistedState::from_json_lenient(blob).into_loaded();
    let upper = loaded.catalog.exercises("upper");
    assert_eq!(upper[0], ExerciseDef::new("Dips"));
    assert_eq!((upper[1].sets, upper[1].reps), (3, 12));
    let lower = loaded.catalog.exercises("lower");
    assert_eq!(lower[0], ExerciseDef::new("Squat"));
    // Unusable set counts fall back to the default
    assert_eq!(lower[1].sets, SET_SLOTS);
    assert_eq!(lower[1].target(), format!("{SET_SLOTS} sets"));
}

// --- Aggregations ---

#[test]
fn test_completion_rate_scenario() {
    let mut history = HistoryStore::new();
    history.save(entry("2024-01-01", "upper", "懸垂", &[true, true, false, false, false]));
    history.save(entry("2024-01-01", "upper", "懸垂", &[true, true, true, false, false]));

    assert_eq!(stats::completion_rate(&history, "upper", "懸垂"), 60);
    assert_eq!(stats::completion_rate(&history, "upper", "プルオーバー"), 0);
    assert_eq!(stats::completion_rate(&HistoryStore::new(), "upper", "懸垂"), 0);
}

#[test]
fn test_completion_rate_spans_days_and_rounds() {
    let mut history = HistoryStore::new();
    history.save(entry("2024-01-01", "upper", "懸垂", &[true, false, false]));
    history.save(entry("2024-01-02", "upper", "懸垂", &[true, true, true, true, true]));
    history.save(entry("2024-01-03", "lower", "懸垂", &[true; 5]));

    // 6 of 8 in "upper" only
    let rate = stats::completion_rate(&history, "upper", "懸垂");
    assert_eq!(rate, 75);
    assert!(rate <= 100);
}

#[test]
fn test_weekly_summary_always_fourteen_rows() {
    let today = date("2024-05-20");
    let empty = stats::weekly_summary(&HistoryStore::new(), today, None);
    assert_eq!(empty.len(), SUMMARY_DAYS);
    assert!(empty.iter().all(|d| d.exercise_count == 0 && d.completed_sets == 0));

    let mut history = HistoryStore::new();
    let mut log = DailyLog::default();
    log.toggle_set("upper", "懸垂", 0);
    log.toggle_set("upper", "懸垂", 1);
    log.toggle_set("lower", "バックランジ", 0);
    log.toggle_set("lower", "バックランジ", 0); // all false again, still recorded
    history.save(HistoryEntry::from_log(date("2024-05-18"), &log));
    history.save(entry("2024-04-01", "upper", "懸垂", &[true; 5])); // outside the window

    let summary = stats::weekly_summary(&history, today, None);
    assert_eq!(summary.len(), SUMMARY_DAYS);
    for (offset, day) in summary.iter().enumerate() {
        assert_eq!(day.date, today - Duration::days(offset as i64));
    }
    assert_eq!(summary[2].date, date("2024-05-18"));
    assert_eq!(summary[2].exercise_count, 2);
    assert_eq!(summary[2].completed_sets, 2);
    assert_eq!(summary.iter().map(|d| d.completed_sets).sum::<usize>(), 2);
}

#[test]
fn test_weekly_summary_prefers_live_log_for_today() {
    let today = date("2024-05-20");
    let mut history = HistoryStore::new();
    history.save(entry("2024-05-20", "upper", "懸垂", &[true; 5]));

    let mut live = DailyLog::default();
    live.toggle_set("upper", "懸垂", 0);

    let summary = stats::weekly_summary(&history, today, Some(&live));
    assert_eq!(summary[0].completed_sets, 1);
    assert_eq!(stats::weekly_summary(&history, today, None)[0].completed_sets, 5);
}

#[test]
fn test_exercise_totals() {
    let mut history = HistoryStore::new();
    history.save(entry("2024-01-01", "upper", "懸垂", &[true, true, false, false, false]));
    let mut log = DailyLog::default();
    log.toggle_set("upper", "懸垂", 0);
    for set in 0..SET_SLOTS {
        log.toggle_set("lower", "バックランジ", set);
    }
    history.save(HistoryEntry::from_log(date("2024-01-02"), &log));
    assert_eq!(history.len(), 2);

    let totals = stats::exercise_totals(&history);
    assert_eq!(totals.len(), 2);
    assert_eq!(totals[0].category, "lower");
    assert_eq!(totals[0].completed_sets, 5);
    assert_eq!(totals[1].exercise, "懸垂");
    assert_eq!(totals[1].completed_sets, 3);
    assert_eq!(totals[1].recorded_sets, 10);
    assert_eq!(totals[1].days, 2);
}

// --- Service ---

#[test]
fn test_service_starts_with_default_catalog() -> Result<()> {
    let service = create_test_service()?;
    assert!(service.catalog.contains("upper", "懸垂"));
    assert!(service.catalog.contains("lower", "ワイドスクワット"));
    assert!(service.history.is_empty());
    assert!(service.records.is_empty());
    Ok(())
}

#[test]
fn test_service_toggle_save_and_rate() -> Result<()> {
    let mut service = create_test_service()?;
    let day = date("2024-01-01");

    for set in 0..3 {
        service.toggle_set(day, "upper", "懸垂", set)?;
    }
    service.set_note(day, "upper", "last rep slow")?;
    assert!(service.has_unsaved_changes(day));
    assert_eq!(service.completion_rate("upper", "懸垂"), 0); // not saved yet

    let saved = service.save_day(day)?;
    assert_eq!(saved.completed_sets(), 3);
    assert_eq!(saved.memo["upper"], "last rep slow");
    assert!(!service.has_unsaved_changes(day));
    assert_eq!(service.completion_rate("upper", "懸垂"), 60);

    let rates = service.completion_rates();
    let pullups = rates.iter().find(|r| r.exercise == "懸垂").unwrap();
    assert_eq!(pullups.rate, 60);
    Ok(())
}

#[test]
fn test_service_rejects_unknown_exercise() -> Result<()> {
    let mut service = create_test_service()?;
    let result = service.toggle_set(date("2024-01-01"), "upper", "Muscle-up", 0);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("is not in category"));
    assert!(service.records.is_empty());
    Ok(())
}

#[test]
fn test_editing_saved_day_starts_from_snapshot() -> Result<()> {
    let mut service = create_test_service()?;
    let day = date("2024-01-01");
    service.toggle_set(day, "upper", "懸垂", 0)?;
    service.save_day(day)?;
    service.records.clear();

    // Read-only reconstruction from history
    assert_eq!(service.completion(day, "upper", "懸垂").completed(), 1);
    assert!(service.records.is_empty());

    service.toggle_set(day, "upper", "懸垂", 1)?;
    assert_eq!(
        service.completion(day, "upper", "懸垂").as_slice(),
        &[true, true, false, false, false]
    );
    Ok(())
}

#[test]
fn test_rename_migrates_recorded_sets() -> Result<()> {
    let mut service = create_test_service()?;
    let day = date("2024-01-01");
    let index = service
        .catalog
        .names("upper")
        .iter()
        .position(|&n| n == "懸垂")
        .unwrap();

    service.toggle_set(day, "upper", "懸垂", 0)?;
    service.save_day(day)?;
    service.toggle_set(date("2024-01-02"), "upper", "懸垂", 0)?;

    let old = service.rename_exercise("upper", index, " フル懸垂 ")?;
    assert_eq!(old, "懸垂");
    assert_eq!(service.catalog.exercises("upper")[index].name, "フル懸垂");
    assert_eq!(service.completion_rate("upper", "フル懸垂"), 20);
    assert_eq!(service.completion_rate("upper", "懸垂"), 0);
    assert_eq!(
        service.completion(date("2024-01-02"), "upper", "フル懸垂").completed(),
        1
    );
    Ok(())
}

#[test]
fn test_delete_keeps_history() -> Result<()> {
    let mut service = create_test_service()?;
    let day = date("2024-01-01");
    service.toggle_set(day, "upper", "懸垂", 0)?;
    service.save_day(day)?;

    let removed = service.delete_exercise("upper", 0)?;
    assert_eq!(removed, "懸垂");
    assert!(!service.catalog.contains("upper", "懸垂"));
    assert_eq!(service.completion_rate("upper", "懸垂"), 20);
    Ok(())
}

#[test]
fn test_catalog_errors_surface_through_service() -> Result<()> {
    let mut service = create_test_service()?;
    let result = service.add_exercise("upper", "  ");
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Exercise name cannot be empty"));

    let result = service.delete_exercise("upper", 99);
    assert!(result.unwrap_err().to_string().contains("out of range"));
    Ok(())
}

#[test]
fn test_set_target_resizes_new_days_only() -> Result<()> {
    let mut service = create_test_service()?;
    let (day1, day2) = (date("2024-01-01"), date("2024-01-02"));
    service.toggle_set(day1, "upper", "懸垂", 4)?;

    let def = service.set_exercise_target("upper", 0, 3, 6)?;
    assert_eq!(def.name, "懸垂");
    assert_eq!(service.set_slots(day2, "upper", "懸垂"), 3);
    service.toggle_set(day2, "upper", "懸垂", 2)?;
    assert_eq!(
        service.completion(day2, "upper", "懸垂").as_slice(),
        &[false, false, true]
    );
    // The earlier day keeps its five recorded sets
    assert_eq!(service.set_slots(day1, "upper", "懸垂"), 5);
    assert_eq!(service.completion(day1, "upper", "懸垂").completed(), 1);

    service.set_exercise_target("upper", 0, 8, 6)?;
    assert_eq!(service.set_slots(day1, "upper", "懸垂"), 8);
    service.toggle_set(day1, "upper", "懸垂", 7)?;
    assert_eq!(service.completion(day1, "upper", "懸垂").completed(), 2);

    let result = service.set_exercise_target("upper", 0, 0, 6);
    assert!(result.unwrap_err().to_string().contains("Set count must be"));
    Ok(())
}

#[test]
fn test_add_exercise_with_target() -> Result<()> {
    let mut service = create_test_service()?;
    service.add_exercise_with_target("core", "Plank", 3, 0)?;
    let def = service.catalog.get("core", "Plank").unwrap();
    assert_eq!(def.target(), "3 sets");
    assert_eq!(service.set_slots(date("2024-01-01"), "core", "Plank"), 3);
    Ok(())
}

// --- Persistence ---

#[test]
fn test_state_survives_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("state.sqlite");
    let day = date("2024-01-01");

    {
        let mut service = AppService::with_gateway(
            Config::default(),
            dir.path().join("config.toml"),
            db_path.clone(),
            Box::new(SqliteGateway::open(&db_path)?),
        )?;
        service.add_exercise("core", "Plank")?;
        service.move_exercise("upper", 0, 2)?;
        service.toggle_set(day, "core", "Plank", 4)?;
        service.set_note(day, "core", "60s holds")?;
        service.save_day(day)?;
        service.toggle_set(date("2024-01-02"), "core", "Plank", 0)?;
    }

    let service = AppService::with_gateway(
        Config::default(),
        dir.path().join("config.toml"),
        db_path.clone(),
        Box::new(SqliteGateway::open(&db_path)?),
    )?;
    assert_eq!(service.catalog.names("core"), vec!["Plank"]);
    assert_eq!(service.catalog.exercises("upper")[2].name, "懸垂");
    assert_eq!(service.history.len(), 1);
    assert_eq!(service.history.entries()[0].memo["core"], "60s holds");
    assert_eq!(service.completion_rate("core", "Plank"), 20);
    assert_eq!(
        service.completion(date("2024-01-02"), "core", "Plank").completed(),
        1
    );
    Ok(())
}

#[test]
fn test_short_stored_vector_can_be_toggled_past_its_end() -> Result<()> {
    let gateway = SqliteGateway::open_in_memory()?;
    gateway.save(
        r#"{
            "records": {"2024-01-01": {"upper": {"懸垂": [true]}}},
            "history": [
                {"date": "2024-01-02", "memo": {}, "data": {"upper": {"懸垂": [false, true]}}}
            ]
        }"#,
    )?;
    let mut service = AppService::with_gateway(
        Config::default(),
        "test_config.toml".into(),
        ":memory:".into(),
        Box::new(gateway),
    )?;

    let live = date("2024-01-01");
    assert_eq!(service.set_slots(live, "upper", "懸垂"), SET_SLOTS);
    assert!(service.toggle_set(live, "upper", "懸垂", 2)?);
    assert_eq!(
        service.completion(live, "upper", "懸垂").as_slice(),
        &[true, false, true, false, false]
    );

    // Same for a day that only exists as a saved snapshot
    let saved = date("2024-01-02");
    assert!(service.toggle_set(saved, "upper", "懸垂", 4)?);
    assert_eq!(
        service.completion(saved, "upper", "懸垂").as_slice(),
        &[false, true, false, false, true]
    );
    Ok(())
}

#[test]
fn test_gateway_overwrites_blob() -> Result<()> {
    let gateway = SqliteGateway::open_in_memory()?;
    assert_eq!(gateway.load()?, None);
    gateway.save("{\"a\":1}")?;
    gateway.save("{\"b\":2}")?;
    assert_eq!(gateway.load()?.as_deref(), Some("{\"b\":2}"));
    Ok(())
}

#[test]
fn test_lenient_decoding_falls_back_per_field() {
    let blob = r#"{
        "records": "not a map",
        "history": [
            {"date": "2024-01-01", "memo": {"upper": "ok"}, "data": {"upper": {"懸垂": [true, false, false, false, false]}}}
        ],
        "exercisesByCategory": 42
    }"#;
    let state = PersistedState::from_json_lenient(blob);
    assert!(state.records.is_empty());
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.exercises_by_category, PersistedState::with_default_catalog().exercises_by_category);

    let garbage = PersistedState::from_json_lenient("definitely not json");
    assert_eq!(garbage, PersistedState::with_default_catalog());
}

#[test]
fn test_legacy_exercise_lists_are_read() {
    let blob = r#"{
        "upperBodyExercises": ["Pull-up", "Pull-up", " "],
        "lowerBodyExercises": ["Squat"]
    }"#;
    let loaded = PersistedState::from_json_lenient(blob).into_loaded();
    assert_eq!(loaded.catalog.names("upper"), vec!["Pull-up"]);
    assert_eq!(loaded.catalog.names("lower"), vec!["Squat"]);
    assert_eq!(loaded.catalog.exercises("lower")[0], ExerciseDef::new("Squat"));
    assert!(loaded.history.is_empty());
}

#[test]
fn test_persisted_shape() -> Result<()> {
    let mut records = BTreeMap::new();
    let mut log = DailyLog::default();
    log.toggle_set("upper", "懸垂", 0);
    records.insert(date("2024-01-01"), log.clone());
    let mut history = HistoryStore::new();
    history.save(HistoryEntry::from_log(date("2024-01-01"), &log));

    let json = PersistedState::capture(&ExerciseCatalog::default(), &records, &history).to_json()?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(
        value["records"]["2024-01-01"]["upper"]["懸垂"],
        serde_json::json!([true, false, false, false, false])
    );
    assert_eq!(value["history"][0]["date"], "2024-01-01");
    assert!(value["exercisesByCategory"]["upper"].is_array());
    assert_eq!(
        value["exercisesByCategory"]["upper"][0],
        serde_json::json!({"name": "懸垂", "sets": 5, "reps": 5})
    );
    Ok(())
}
