//src/main.rs
mod cli;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdout};
use tracing_subscriber::{fmt, EnvFilter};

use set_tracker_lib::{
    AppService, DailyLog, DaySummary, ExerciseRate, ExerciseTotal, HistoryEntry,
};

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[allow(clippy::too_many_lines)]
fn main() -> Result<()> {
    let cli_args = cli::parse_args();
    init_tracing(cli_args.verbose);
    let export_csv = cli_args.export_csv;

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();

        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    // Loads config and the stored state
    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;
    let header_color = service.config.header_color();

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        // --- Daily log ---
        cli::Commands::Show { date } => {
            let date = date.unwrap_or_else(AppService::today);
            let log = service.day_view(date);
            let status = if service.has_unsaved_changes(date) {
                "unsaved changes"
            } else if service.is_saved(date) {
                "saved"
            } else {
                "not saved"
            };
            println!("Training log for {date} ({status})");
            print_day_table(&service, date, &log, header_color);
            for category in service.catalog.categories() {
                let note = log.note(category);
                if !note.is_empty() {
                    println!("{category} notes: {note}");
                }
            }
        }
        cli::Commands::Toggle {
            category,
            exercise,
            set,
            date,
        } => {
            let date = date.unwrap_or_else(AppService::today);
            if !service.catalog.contains(&category, &exercise) {
                bail!("Exercise '{exercise}' is not in category '{category}'.");
            }
            let slots = service.set_slots(date, &category, &exercise);
            if set == 0 || set > slots {
                bail!("Set number must be between 1 and {slots} for '{exercise}'.");
            }
            let done = service.toggle_set(date, &category, &exercise, set - 1)?;
            println!(
                "{} set {set} of '{exercise}' on {date}.",
                if done { "Checked" } else { "Unchecked" }
            );
        }
        cli::Commands::Note {
            category,
            text,
            date,
        } => {
            let date = date.unwrap_or_else(AppService::today);
            service.set_note(date, &category, &text)?;
            if text.is_empty() {
                println!("Cleared {category} note for {date}.");
            } else {
                println!("Updated {category} note for {date}.");
            }
        }
        cli::Commands::Save { date } => {
            let date = date.unwrap_or_else(AppService::today);
            let entry = service.save_day(date)?;
            println!(
                "Saved {date}: {} exercise(s), {} completed set(s). {} day(s) in history.",
                entry.exercise_count(),
                entry.completed_sets(),
                service.history.len()
            );
        }
        cli::Commands::History { limit } => {
            let entries = service.history_entries();
            let shown = &entries[..limit.unwrap_or(entries.len()).min(entries.len())];
            if entries.is_empty() {
                println!("No saved days yet. Use 'save' to record one.");
            } else if shown.is_empty() {
                println!("{} saved day(s); none shown with --limit 0.", entries.len());
            } else if export_csv {
                print_history_csv(shown)?;
            } else {
                print_history_table(shown, header_color, service.config.show_notes_in_history);
            }
        }
        // --- Aggregations ---
        cli::Commands::Rate { category, exercise } => {
            let rate = service.completion_rate(&category, &exercise);
            println!("{category} / {exercise}: {rate}%");
        }
        cli::Commands::Rates => {
            let rates = service.completion_rates();
            if export_csv {
                print_rates_csv(&rates)?;
            } else {
                print_rates_table(&rates, header_color);
            }
        }
        cli::Commands::Summary => {
            let summary = service.weekly_summary(AppService::today());
            if export_csv {
                print_summary_csv(&summary)?;
            } else {
                print_summary_table(&summary, header_color);
            }
        }
        cli::Commands::Totals => {
            let totals = service.exercise_totals();
            if totals.is_empty() {
                println!("No saved days yet.");
            } else if export_csv {
                print_totals_csv(&totals)?;
            } else {
                print_totals_table(&totals, header_color);
            }
        }
        // --- Exercise catalog ---
        cli::Commands::ListExercises { category } => {
            print_exercise_table(&service, category.as_deref(), header_color);
        }
        cli::Commands::AddExercise {
            category,
            name,
            sets,
            reps,
        } => {
            service
                .add_exercise_with_target(&category, &name, sets, reps)
                .with_context(|| format!("Error adding exercise to '{category}'"))?;
            println!("Added '{name}' to {category}.");
        }
        cli::Commands::RenameExercise {
            category,
            index,
            new_name,
        } => {
            let old = service
                .rename_exercise(&category, to_zero_based(index)?, &new_name)
                .with_context(|| format!("Error renaming exercise #{index} in '{category}'"))?;
            println!(
                "Renamed '{old}' to '{}'. Recorded sets now use the new name.",
                new_name.trim()
            );
        }
        cli::Commands::DeleteExercise { category, index } => {
            let removed = service
                .delete_exercise(&category, to_zero_based(index)?)
                .with_context(|| format!("Error deleting exercise #{index} in '{category}'"))?;
            println!("Removed '{removed}' from {category}. Its recorded sets are kept.");
        }
        cli::Commands::MoveExercise { category, from, to } => {
            service
                .move_exercise(&category, to_zero_based(from)?, to_zero_based(to)?)
                .with_context(|| format!("Error moving exercise in '{category}'"))?;
            println!("Moved exercise #{from} to position {to} in {category}.");
        }
        cli::Commands::SetTarget {
            category,
            index,
            sets,
            reps,
        } => {
            let def = service
                .set_exercise_target(&category, to_zero_based(index)?, sets, reps)
                .with_context(|| format!("Error updating exercise #{index} in '{category}'"))?;
            println!("'{}' in {category}: {}.", def.name, def.target());
        }
        // --- Paths and config ---
        cli::Commands::DbPath => {
            println!("Database file is located at: {:?}", service.get_db_path());
        }
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
        }
        cli::Commands::SetHeaderColor { color } => {
            let parsed = service.set_header_color(&color)?;
            println!("Header color set to {parsed:?}.");
        }
    }

    Ok(())
}

fn to_zero_based(position: usize) -> Result<usize> {
    match position.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("Positions start at 1."),
    }
}

fn checkbox_row(sets: &[bool]) -> String {
    sets.iter()
        .map(|&done| if done { "[x]" } else { "[ ]" })
        .collect::<Vec<_>>()
        .join(" ")
}

fn new_table(header: Vec<String>, header_color: Color) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.into_iter().map(|h| Cell::new(h).fg(header_color)));
    table
}

/// Catalog exercises for the day, followed by any recorded exercise no longer in the catalog.
fn print_day_table(service: &AppService, date: NaiveDate, log: &DailyLog, header_color: Color) {
    let mut table = new_table(
        vec![
            "Category".into(),
            "Exercise".into(),
            "Target".into(),
            "Sets".into(),
            "Done".into(),
        ],
        header_color,
    );
    for (category, defs) in service.catalog.iter() {
        for def in defs {
            let sets = service.completion(date, category, &def.name);
            table.add_row(vec![
                Cell::new(category),
                Cell::new(&def.name),
                Cell::new(def.target()),
                Cell::new(checkbox_row(sets.as_slice())),
                Cell::new(format!("{}/{}", sets.completed(), sets.len())),
            ]);
        }
    }
    for (category, exercises) in &log.sets {
        for (name, sets) in exercises {
            if !service.catalog.contains(category, name) {
                table.add_row(vec![
                    Cell::new(category),
                    Cell::new(format!("{name} (removed)")),
                    Cell::new(""),
                    Cell::new(checkbox_row(sets.as_slice())),
                    Cell::new(format!("{}/{}", sets.completed(), sets.len())),
                ]);
            }
        }
    }
    println!("{table}");
}

fn print_exercise_table(service: &AppService, only: Option<&str>, header_color: Color) {
    let mut table = new_table(
        vec![
            "Category".into(),
            "#".into(),
            "Exercise".into(),
            "Target".into(),
            "Rate".into(),
        ],
        header_color,
    );
    for (category, defs) in service.catalog.iter() {
        if only.is_some_and(|c| c != category) {
            continue;
        }
        for (i, def) in defs.iter().enumerate() {
            table.add_row(vec![
                Cell::new(category),
                Cell::new(i + 1),
                Cell::new(&def.name),
                Cell::new(def.target()),
                Cell::new(format!("{}%", service.completion_rate(category, &def.name))),
            ]);
        }
    }
    println!("{table}");
}

fn print_history_table(entries: &[HistoryEntry], header_color: Color, show_notes: bool) {
    let mut header = vec!["Date".to_string(), "Exercises".into(), "Completed Sets".into()];
    if show_notes {
        header.push("Notes".into());
    }
    let mut table = new_table(header, header_color);
    for entry in entries {
        let mut row = vec![
            Cell::new(entry.date),
            Cell::new(entry.exercise_count()),
            Cell::new(entry.completed_sets()),
        ];
        if show_notes {
            let notes = entry
                .memo
                .iter()
                .map(|(category, note)| format!("{category}: {note}"))
                .collect::<Vec<_>>()
                .join("\n");
            row.push(Cell::new(notes));
        }
        table.add_row(row);
    }
    println!("{table}");
}

fn print_history_csv(entries: &[HistoryEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Date", "Category", "Exercise", "Sets", "Completed"])?;
    for entry in entries {
        for (category, exercises) in &entry.data {
            for (name, sets) in exercises {
                writer.write_record([
                    entry.date.to_string(),
                    category.clone(),
                    name.clone(),
                    checkbox_row(sets.as_slice()),
                    sets.completed().to_string(),
                ])?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

fn print_rates_table(rates: &[ExerciseRate], header_color: Color) {
    let mut table = new_table(
        vec!["Category".into(), "Exercise".into(), "Completion".into()],
        header_color,
    );
    for r in rates {
        table.add_row(vec![
            Cell::new(&r.category),
            Cell::new(&r.exercise),
            Cell::new(format!("{}%", r.rate)),
        ]);
    }
    println!("{table}");
}

fn print_rates_csv(rates: &[ExerciseRate]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Category", "Exercise", "Completion_Percent"])?;
    for r in rates {
        writer.write_record([
            r.category.as_str(),
            r.exercise.as_str(),
            r.rate.to_string().as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_summary_table(summary: &[DaySummary], header_color: Color) {
    let mut table = new_table(
        vec!["Date".into(), "Exercises".into(), "Completed Sets".into()],
        header_color,
    );
    for day in summary {
        table.add_row(vec![
            Cell::new(day.date.format("%Y-%m-%d (%a)")),
            Cell::new(day.exercise_count),
            Cell::new(day.completed_sets),
        ]);
    }
    println!("{table}");
}

fn print_summary_csv(summary: &[DaySummary]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Date", "Exercises", "Completed_Sets"])?;
    for day in summary {
        writer.write_record([
            day.date.to_string(),
            day.exercise_count.to_string(),
            day.completed_sets.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_totals_table(totals: &[ExerciseTotal], header_color: Color) {
    let mut table = new_table(
        vec![
            "Category".into(),
            "Exercise".into(),
            "Days".into(),
            "Completed Sets".into(),
        ],
        header_color,
    );
    for t in totals {
        table.add_row(vec![
            Cell::new(&t.category),
            Cell::new(&t.exercise),
            Cell::new(t.days),
            Cell::new(format!("{}/{}", t.completed_sets, t.recorded_sets)),
        ]);
    }
    println!("{table}");
}

fn print_totals_csv(totals: &[ExerciseTotal]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Category", "Exercise", "Days", "Completed_Sets", "Recorded_Sets"])?;
    for t in totals {
        writer.write_record([
            t.category.clone(),
            t.exercise.clone(),
            t.days.to_string(),
            t.completed_sets.to_string(),
            t.recorded_sets.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
