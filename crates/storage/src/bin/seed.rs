use std::fmt;

use revision_core::model::{DEFAULT_SUBJECTS, SubjectKey, empty_rounds};
use storage::repository::{NewRowRecord, NewSubjectRecord, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    years: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidYears { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidYears { raw } => write!(f, "invalid --years value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("REVISION_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut years = std::env::var("REVISION_YEARS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(5);

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--years" => {
                    let value = require_value(&mut args, "--years")?;
                    years = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidYears { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, years })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --years <n>               Past-paper years per subject, from 2015 (default: 5)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  REVISION_DB_URL, REVISION_YEARS");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    let existing = storage.subjects.list_subjects().await?;
    if !existing.is_empty() {
        println!(
            "{} already holds {} subjects, nothing to do",
            args.db_url,
            existing.len()
        );
        return Ok(());
    }

    let names: Vec<String> = (0..args.years).map(|i| (2015 + i).to_string()).collect();

    let mut seeded_rows = 0;
    for (position, (label, icon)) in DEFAULT_SUBJECTS.iter().enumerate() {
        let subject_id = storage
            .subjects
            .insert_new_subject(NewSubjectRecord {
                key: SubjectKey::derive(label),
                label: (*label).to_owned(),
                icon: (*icon).to_owned(),
                sort_order: position,
            })
            .await?;

        let rows: Vec<NewRowRecord> = names
            .iter()
            .enumerate()
            .map(|(sort_order, name)| NewRowRecord {
                subject_id,
                name: name.clone(),
                rounds: empty_rounds(),
                sort_order,
            })
            .collect();
        seeded_rows += rows.len();
        storage.rows.insert_new_rows(rows).await?;
    }

    println!(
        "Seeded {} subjects with {seeded_rows} rows into {}",
        DEFAULT_SUBJECTS.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
