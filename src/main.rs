use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::FmtSubscriber;

use periods::{
    Config, DateSpec, Period, PeriodStore, PeriodType, SqlitePeriodRepository, Timestamp,
};

/// Find, create and decompose calendar periods stored in SQLite
#[derive(Parser, Debug)]
#[command(name = "periods", version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides configuration)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema
    Init,

    /// Period of a type containing a date
    Find {
        #[arg(long = "type", value_parser = parse_kind)]
        kind: PeriodType,
        /// YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS or RFC 3339
        date: String,
        /// Don't persist a new period
        #[arg(long)]
        transient: bool,
    },

    /// Resolve a partial date (year, month, week, day ...)
    From {
        year: i32,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        week: Option<u32>,
        #[arg(long)]
        day: Option<u32>,
        #[arg(long)]
        iso: bool,
        #[arg(long = "type", value_parser = parse_kind, default_value = "day")]
        kind: PeriodType,
        #[arg(long)]
        transient: bool,
    },

    /// Week by number
    Week {
        year: i32,
        week: u32,
        #[arg(long)]
        iso: bool,
    },

    /// Current period of a type
    Current {
        #[arg(long = "type", value_parser = parse_kind)]
        kind: PeriodType,
        #[arg(long)]
        transient: bool,
    },

    /// Period after a stored one
    Next { id: i64 },

    /// Period before a stored one
    Prev { id: i64 },

    /// Finer periods covering the period of a type containing a date
    Subdivide {
        #[arg(long = "type", value_parser = parse_kind)]
        kind: PeriodType,
        date: String,
        #[arg(long, value_parser = parse_kind)]
        into: PeriodType,
        /// Write CSV to stdout
        #[arg(long)]
        csv: bool,
    },

    /// Stored periods of a type
    List {
        #[arg(long = "type", value_parser = parse_kind)]
        kind: PeriodType,
        #[arg(long)]
        csv: bool,
    },
}

/// Flat, printable view of a period
#[derive(Debug, Serialize)]
struct PeriodOutput {
    id: Option<i64>,
    period_type: String,
    start_on: String,
    end_on: String,
    name: String,
    full_name: String,
    str_id: String,
    pid: String,
}

impl From<&Period> for PeriodOutput {
    fn from(period: &Period) -> Self {
        PeriodOutput {
            id: period.id(),
            period_type: period.period_type().to_string(),
            start_on: period.start_on().to_string(),
            end_on: period.end_on().to_string(),
            name: period.name(),
            full_name: period.full_name(),
            str_id: period.str_id(),
            pid: period.pid(),
        }
    }
}

fn parse_kind(raw: &str) -> std::result::Result<PeriodType, String> {
    raw.parse::<PeriodType>().map_err(|e| e.to_string())
}

fn parse_instant(raw: &str) -> Result<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Timestamp::Zoned(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Timestamp::Naive(dt));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("cannot parse date '{}'", raw))?;
    Ok(Timestamp::from(date))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level()?)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let repo = SqlitePeriodRepository::open(&config)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    let store = PeriodStore::new(repo);

    match cli.command {
        Command::Init => {
            println!("✓ Database ready: {}", config.database_path.display());
            println!("✓ Stored periods: {}", store.count()?);
        }
        Command::Find { kind, date, transient } => {
            let period = store.find_or_create_by_date(parse_instant(&date)?, kind, transient)?;
            print_one(&period, cli.json)?;
        }
        Command::From { year, month, week, day, iso, kind, transient } => {
            let spec = DateSpec {
                year,
                month,
                week,
                day,
                iso_week: iso,
                ..DateSpec::default()
            };
            let period = store.find_or_create_from(&spec, kind, transient)?;
            print_one(&period, cli.json)?;
        }
        Command::Week { year, week, iso } => {
            let period = store.find_or_create_by_week_number(year, week, iso)?;
            print_one(&period, cli.json)?;
        }
        Command::Current { kind, transient } => {
            let period = store.current(kind, transient)?;
            print_one(&period, cli.json)?;
        }
        Command::Next { id } => {
            let period = load(&store, id)?;
            print_one(&store.following(&period)?, cli.json)?;
        }
        Command::Prev { id } => {
            let period = load(&store, id)?;
            print_one(&store.previous(&period)?, cli.json)?;
        }
        Command::Subdivide { kind, date, into, csv } => {
            let period = store.find_or_create_by_date(parse_instant(&date)?, kind, true)?;
            let parts = store.subdivide_all(&period, into)?;
            print_many(&parts, csv, cli.json)?;
        }
        Command::List { kind, csv } => {
            let periods = store.list(kind)?;
            print_many(&periods, csv, cli.json)?;
        }
    }

    Ok(())
}

fn load(store: &PeriodStore<SqlitePeriodRepository>, id: i64) -> Result<Period> {
    store
        .get(id)?
        .with_context(|| format!("No period with id {}", id))
}

fn print_one(period: &Period, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&PeriodOutput::from(period))?);
        return Ok(());
    }

    let id = period
        .id()
        .map(|id| format!("#{}", id))
        .unwrap_or_else(|| "(transient)".to_string());
    println!("📅 {} {}: {}", period.period_type(), id, period.full_name());
    println!("   start:  {}", period.start_on());
    println!("   end:    {}", period.end_on());
    println!("   str_id: {}", period.str_id());
    println!("   pid:    {}", period.pid());
    Ok(())
}

fn print_many(periods: &[Period], csv: bool, json: bool) -> Result<()> {
    let rows: Vec<PeriodOutput> = periods.iter().map(PeriodOutput::from).collect();

    if csv {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    } else if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!("{:<10} {:<24} {} → {}", row.str_id, row.name, row.start_on, row.end_on);
        }
        println!("✓ {} periods", rows.len());
    }

    Ok(())
}
