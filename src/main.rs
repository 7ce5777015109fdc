use clap::{Parser, Subcommand};
use lexilog::{
    analytics::{struggling, summarize, top_performing, trend_with_window},
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    migration::{run_once, EstimationMode, GateOutcome, MigrationOptions, MigrationReport},
    render,
    store::keys::LAST_REPORT_KEY,
    Error, KeyValueStore, Snapshot, SqliteStore,
};
use std::{
    error::Error as StdError,
    fs,
    io::{self, Write},
    path::PathBuf,
};

/// vocabulary test-history analytics and legacy data migration
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Chapter-level analytics over vocabulary test history, plus a one-shot migration that rebuilds detailed per-word responses from legacy aggregate records."
)]
pub struct Cli {
    /// path to the store database (defaults to the configured or platform location)
    #[clap(long, global = true)]
    store: Option<PathBuf>,

    /// path to the JSON config file
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// per-chapter statistics, best chapters first
    Chapters {
        /// emit CSV instead of a table
        #[clap(long)]
        csv: bool,
    },

    /// global summary with top and struggling chapters
    Overview,

    /// accuracy trend of one chapter over its most recent tests
    Trend {
        /// chapter name
        chapter: String,
    },

    /// migrate legacy aggregate records into detailed responses
    Migrate {
        /// run even if the store was already migrated
        #[clap(long)]
        force: bool,

        /// sample estimates from a seeded rng instead of the deterministic rules
        #[clap(long)]
        seed: Option<u64>,
    },

    /// show the last persisted migration report
    Report,

    /// load a JSON file into the store under the given key
    Import {
        /// store key, e.g. testHistory
        key: String,

        /// JSON file to read
        file: PathBuf,
    },
}

impl Cli {
    fn load_config(&self) -> Config {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path).load(),
            None => FileConfigStore::new().load(),
        }
    }

    fn store_path(&self, config: &Config) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(|| config.resolved_store_path())
    }
}

fn main() -> Result<(), Box<dyn StdError>> {
    let cli = Cli::parse();
    let config = cli.load_config();
    logging::init(&config.log_level)?;

    let mut store = SqliteStore::open(&cli.store_path(&config))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Chapters { csv } => {
            let stats = Snapshot::load(&store)?.chapter_stats();
            if csv {
                render::chapters_csv(&mut out, &stats)?;
            } else {
                render::chapters_table(&mut out, &stats)?;
            }
        }
        Command::Overview => {
            let stats = Snapshot::load(&store)?.chapter_stats();
            let analytics = &config.analytics;
            render::overview(
                &mut out,
                &summarize(&stats),
                &top_performing(&stats, analytics.top_performing),
                &struggling(&stats, analytics.struggling, analytics.struggling_min_tested),
            )?;
        }
        Command::Trend { chapter } => {
            let history = Snapshot::load(&store)?.chapter_history(&chapter);
            let points = trend_with_window(&history, config.analytics.trend_window);
            render::trend(&mut out, &chapter, &points)?;
        }
        Command::Migrate { force, seed } => {
            let mut options = MigrationOptions::from(&config.migration);
            if let Some(seed) = seed {
                options.estimation = EstimationMode::Seeded(seed);
            }
            match run_once(&mut store, options, force) {
                Ok(GateOutcome::Migrated(outcome)) => {
                    writeln!(out, "backup: {}", outcome.backup_key)?;
                    render::report(&mut out, &outcome.report)?;
                }
                Ok(GateOutcome::AlreadyMigrated(flag)) => {
                    writeln!(
                        out,
                        "already migrated at {} (backup {}); pass --force to run again",
                        flag.completed_at.to_rfc3339(),
                        flag.backup_key
                    )?;
                }
                Err(Error::Migration { report, source }) => {
                    render::report(&mut io::stderr(), &report)?;
                    return Err(source.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Report => match store.get_as::<MigrationReport>(LAST_REPORT_KEY)? {
            Some(report) => render::report(&mut out, &report)?,
            None => writeln!(out, "no migration report stored")?,
        },
        Command::Import { key, file } => {
            let text = fs::read_to_string(&file)?;
            let value: serde_json::Value = serde_json::from_str(&text)?;
            store.set(&key, &value)?;
            writeln!(out, "imported {} into {key}", file.display())?;
        }
    }

    out.flush()?;
    Ok(())
}
