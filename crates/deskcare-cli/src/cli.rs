//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Break reminder and activity ledger.
///
/// Tracks focus, rest and pause sessions in a local SQLite ledger and turns
/// them into daily statistics and work reports.
#[derive(Debug, Parser)]
#[command(name = "deskcare", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the break timer, reading commands from stdin.
    Run,

    /// Show per-state totals for a day.
    Stats {
        /// Day to summarize (YYYY-MM-DD, today, yesterday, "N days ago").
        #[arg(long)]
        date: Option<String>,

        /// Output the flat statistics mapping as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the recorded sessions of a day.
    Timeline {
        /// Day to list (YYYY-MM-DD, today, yesterday, "N days ago").
        #[arg(long)]
        date: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Render a work report from annotated focus sessions.
    Report {
        /// Cover the week (Monday onward) up to the date.
        #[arg(long, conflicts_with = "month")]
        week: bool,

        /// Cover the month up to the date.
        #[arg(long)]
        month: bool,

        /// Only include formal work notes.
        #[arg(long)]
        formal: bool,

        /// Last day of the report (defaults to today).
        #[arg(long)]
        date: Option<String>,
    },

    /// Attach notes to a recorded session.
    Note {
        /// Session id as shown by `timeline`.
        id: i64,

        /// Formal work notes.
        #[arg(long)]
        formal: Option<String>,

        /// Learning notes.
        #[arg(long)]
        learning: Option<String>,

        /// Personal notes.
        #[arg(long)]
        personal: Option<String>,

        /// Work type: formal, learning or personal.
        #[arg(long)]
        work_type: Option<String>,
    },

    /// Show database location and the latest session.
    Status,
}
