use std::fmt;

use chrono::{DateTime, Utc};
use quiz_core::model::{GuardianId, KidId};
use storage::repository::Storage;
use storage::seed::seed_demo;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    guardian_id: GuardianId,
    kid_id: KidId,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidGuardianId { raw: String },
    InvalidKidId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidGuardianId { raw } => write!(f, "invalid --guardian value: {raw}"),
            ArgsError::InvalidKidId { raw } => write!(f, "invalid --kid value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .unwrap_or_else(|_| "sqlite://quiz.sqlite3?mode=rwc".into());
        let mut guardian_id = std::env::var("QUIZ_GUARDIAN_ID")
            .ok()
            .and_then(|value| value.parse::<GuardianId>().ok())
            .unwrap_or(GuardianId::new(1));
        let mut kid_id = std::env::var("QUIZ_KID_ID")
            .ok()
            .and_then(|value| value.parse::<KidId>().ok())
            .unwrap_or(KidId::new(1));
        let mut now: Option<DateTime<Utc>> = None;

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
                "--guardian" => {
                    let value = require_value(&mut args, "--guardian")?;
                    guardian_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidGuardianId { raw: value.clone() })?;
                }
                "--kid" => {
                    let value = require_value(&mut args, "--kid")?;
                    kid_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidKidId { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            guardian_id,
            kid_id,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>    SQLite URL (default: sqlite://quiz.sqlite3?mode=rwc)");
    eprintln!("  --guardian <id>      Owning guardian id (default: 1)");
    eprintln!("  --kid <id>           Kid the packages are assigned to (default: 1)");
    eprintln!("  --now <rfc3339>      Fixed current time for deterministic seeding");
    eprintln!("  -h, --help           Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_GUARDIAN_ID, QUIZ_KID_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let report = seed_demo(&storage, args.guardian_id, args.kid_id, now).await?;

    println!(
        "Seeded {} packages ({} new questions, {} already present) for kid {} into {}",
        report.packages.len(),
        report.questions,
        report.skipped,
        args.kid_id,
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
