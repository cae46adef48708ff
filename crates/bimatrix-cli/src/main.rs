//! `bimatrix` command-line tool.
//!
//! Replays recorded bimatrix sessions offline: settles payoffs and prints
//! per-round reports, writes the flat CSV export, reconstructs strategy
//! trajectories, or lists the round table.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments
//! 2. Load session settings and the round table
//! 3. Initialize structured logging (tracing), defaulting to the session's
//!    `logging.level` when `RUST_LOG` is unset
//! 4. Run the subcommand

mod commands;
mod error;

use std::io::Write;
use std::path::{Path, PathBuf};

use bimatrix_core::config::SessionConfig;
use bimatrix_core::decision::RngDecisionSource;
use bimatrix_core::round_table::RoundTable;
use bimatrix_core::trajectory::DecisionChannel;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

/// Offline payoff reports and export for recorded bimatrix sessions.
#[derive(Parser, Debug)]
#[command(name = "bimatrix", version, about, long_about = None)]
struct Args {
    /// Session settings file (YAML).
    #[arg(short, long, default_value = "bimatrix-session.yaml")]
    session: PathBuf,

    /// What to do.
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Settle payoffs and print per-round summaries as JSON.
    Payoffs {
        /// Recorded group rounds (JSON array).
        #[arg(short, long)]
        events: PathBuf,
    },

    /// Write the flat CSV export of every recorded group round.
    Export {
        /// Recorded group rounds (JSON array).
        #[arg(short, long)]
        events: PathBuf,

        /// Output file; standard output when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print reconstructed strategy trajectories as JSON.
    Trajectories {
        /// Recorded group rounds (JSON array).
        #[arg(short, long)]
        events: PathBuf,

        /// Seed for initial decisions; overrides the session setting.
        #[arg(long)]
        seed: Option<u64>,

        /// Read strategies from merged group snapshots instead of individual
        /// decisions.
        #[arg(long)]
        merged: bool,
    },

    /// List the rounds of the round table.
    Rounds,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let session = SessionConfig::from_file(&args.session)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&session.logging.level)),
        )
        .with_target(true)
        .init();

    let table = session.load_round_table()?;
    info!(
        session = %session.name,
        rounds = table.num_rounds(),
        "Session loaded"
    );

    run(&args.command, &session, &table)?;
    Ok(())
}

fn run(command: &Command, session: &SessionConfig, table: &RoundTable) -> Result<(), CliError> {
    match command {
        Command::Payoffs { events } => {
            let rounds = commands::load_rounds(events)?;
            let report = commands::payoff_report(table, rounds);
            write_json(&report)
        }
        Command::Export { events, output } => {
            let rounds = commands::load_rounds(events)?;
            let export = commands::export_table(table, &rounds, session.export.options())?;
            match output {
                Some(path) => write_export(&export, path),
                None => Ok(export.write_csv(std::io::stdout().lock())?),
            }
        }
        Command::Trajectories {
            events,
            seed,
            merged,
        } => {
            let rounds = commands::load_rounds(events)?;
            let channel = if *merged {
                DecisionChannel::Group
            } else {
                DecisionChannel::Individual
            };
            let report = match seed.or(session.randomness.seed) {
                Some(seed) => {
                    info!(seed, "Using seeded initial decisions");
                    let mut source = RngDecisionSource::seeded(seed);
                    commands::trajectory_report(table, &rounds, channel, &mut source)
                }
                None => {
                    let mut source = RngDecisionSource::from_entropy();
                    commands::trajectory_report(table, &rounds, channel, &mut source)
                }
            };
            write_json(&report)
        }
        Command::Rounds => {
            let mut out = std::io::stdout().lock();
            for line in commands::round_lines(table) {
                writeln!(out, "{line}")?;
            }
            Ok(())
        }
    }
}

fn write_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_export(export: &bimatrix_core::export::ExportTable, path: &Path) -> Result<(), CliError> {
    let file = std::fs::File::create(path)?;
    export.write_csv(std::io::BufWriter::new(file))?;
    info!(path = %path.display(), rows = export.rows.len(), "Export written");
    Ok(())
}
