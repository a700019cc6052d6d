// src/cli.rs
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use set_tracker_lib::SET_SLOTS;

#[derive(Parser, Debug)]
#[command(author, version, about = "Check off workout sets and review recent sessions", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print tables as CSV instead
    #[arg(long, global = true)]
    pub export_csv: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the sets and notes recorded for a day
    Show {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Tick or untick one set of an exercise
    Toggle {
        /// Category, e.g. "upper"
        #[arg(value_parser = trimmed)]
        category: String,
        /// Exercise name as listed by list-exercises
        #[arg(value_parser = trimmed)]
        exercise: String,
        /// Set number, starting at 1
        set: usize,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Replace the note for a category (an empty string clears it)
    Note {
        #[arg(value_parser = trimmed)]
        category: String,
        text: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Save the day into history
    Save {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// List saved days, newest first
    History {
        /// Show only the last N entries
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Completion rate of one exercise over saved history
    Rate {
        #[arg(value_parser = trimmed)]
        category: String,
        #[arg(value_parser = trimmed)]
        exercise: String,
    },
    /// Completion rate of every exercise
    Rates,
    /// Exercises and completed sets for each of the last 14 days
    Summary,
    /// Completed sets per exercise over saved history
    Totals,
    /// List exercises
    ListExercises {
        /// Only this category
        #[arg(short, long, value_parser = trimmed)]
        category: Option<String>,
    },
    /// Add an exercise to a category
    AddExercise {
        #[arg(value_parser = trimmed)]
        category: String,
        #[arg(value_parser = trimmed)]
        name: String,
        /// Number of sets to check off each day (1-20)
        #[arg(short, long, default_value_t = SET_SLOTS)]
        sets: usize,
        /// Target reps per set, 0 for none
        #[arg(short, long, default_value_t = 0)]
        reps: u32,
    },
    /// Rename an exercise; its recorded sets follow the new name
    RenameExercise {
        #[arg(value_parser = trimmed)]
        category: String,
        /// Position as shown by list-exercises, starting at 1
        index: usize,
        new_name: String,
    },
    /// Remove an exercise (recorded sets are kept)
    DeleteExercise {
        #[arg(value_parser = trimmed)]
        category: String,
        /// Position as shown by list-exercises, starting at 1
        index: usize,
    },
    /// Move an exercise to another position
    MoveExercise {
        #[arg(value_parser = trimmed)]
        category: String,
        from: usize,
        to: usize,
    },
    /// Change how many sets an exercise has and its rep target
    SetTarget {
        #[arg(value_parser = trimmed)]
        category: String,
        /// Position as shown by list-exercises, starting at 1
        index: usize,
        /// Number of sets (1-20)
        sets: usize,
        /// Target reps per set, 0 for none
        #[arg(default_value_t = 0)]
        reps: u32,
    },
    /// Show the path to the database file
    DbPath,
    /// Show the path to the config file
    ConfigPath,
    /// Set the table header color (e.g. "Blue", "DarkCyan")
    SetHeaderColor { color: String },
    /// Generate shell completion script
    GenerateCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Category and exercise names are stored trimmed
#[allow(clippy::unnecessary_wraps)]
fn trimmed(arg: &str) -> Result<String, String> {
    Ok(arg.trim().to_string())
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
