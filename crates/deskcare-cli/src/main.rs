use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use deskcare_cli::commands::util::{parse_date_or_today, timezone_name};
use deskcare_cli::commands::{note, report, run, stats, status, timeline};
use deskcare_cli::{Cli, Commands, Config};
use deskcare_core::{ReportMode, WorkType};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(deskcare_db::Database, Config)> {
    let config = load_config(config_path)?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = deskcare_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, timezone = %timezone_name(), "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so `--json` output stays parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let mut stdout = io::stdout().lock();

    match &cli.command {
        Some(Commands::Run) => {
            let config = load_config(cli.config.as_deref())?;
            run::run(&config)?;
        }
        Some(Commands::Stats { date, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let date = parse_date_or_today(date.as_deref())?;
            stats::run(
                &mut stdout,
                &db,
                date,
                config.focus_session_threshold_secs,
                *json,
            )?;
        }
        Some(Commands::Timeline { date, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            let date = parse_date_or_today(date.as_deref())?;
            timeline::run(&mut stdout, &db, date, *json)?;
        }
        Some(Commands::Report {
            week,
            month,
            formal,
            date,
        }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            let date = parse_date_or_today(date.as_deref())?;
            let range = report::range_from_flags(*week, *month);
            let mode = if *formal {
                ReportMode::Formal
            } else {
                ReportMode::SelfReview
            };
            report::run(&mut stdout, &db, date, range, mode)?;
        }
        Some(Commands::Note {
            id,
            formal,
            learning,
            personal,
            work_type,
        }) => {
            let work_type = work_type
                .as_deref()
                .map(str::parse::<WorkType>)
                .transpose()
                .context("invalid --work-type")?;
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let update = note::NoteUpdate {
                formal: formal.clone(),
                learning: learning.clone(),
                personal: personal.clone(),
                work_type,
            };
            note::run(&mut stdout, &mut db, *id, update)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, &config.database_path)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
