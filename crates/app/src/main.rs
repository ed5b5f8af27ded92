use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quiz_core::model::{AnswerId, GuardianId, KidId, PackageId};
use quiz_core::{Clock, SessionSettings};
use services::sessions::{CloseReason, FeedbackKind, OptionMark, QuestionView};
use services::{
    AppServices, PlayerInput, SessionEvent, SessionOutcome, SessionRunner, TracingNotifier,
};
use storage::seed::seed_demo;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3?mode=rwc";

#[derive(Debug)]
enum ArgsError {
    MissingCommand,
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownCommand(String),
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn parse_id<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

#[derive(Debug)]
enum Command {
    Play { kid_id: KidId },
    Import { package_id: PackageId, file: PathBuf },
    Seed { guardian_id: GuardianId, kid_id: KidId },
}

#[derive(Debug)]
struct Args {
    db_url: String,
    command: Command,
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into());
        let mut kid_id = std::env::var("QUIZ_KID_ID")
            .ok()
            .and_then(|value| value.parse::<KidId>().ok())
            .unwrap_or(KidId::new(1));
        let mut guardian_id = GuardianId::new(1);
        let mut package_id: Option<PackageId> = None;
        let mut file: Option<PathBuf> = None;

        let mut args = std::env::args().skip(1);
        let command = args.next().ok_or(ArgsError::MissingCommand)?;
        if matches!(command.as_str(), "--help" | "-h") {
            print_usage();
            std::process::exit(0);
        }

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--kid" => kid_id = parse_id("--kid", require_value(&mut args, "--kid")?)?,
                "--guardian" => {
                    guardian_id = parse_id("--guardian", require_value(&mut args, "--guardian")?)?;
                }
                "--package" => {
                    package_id = Some(parse_id("--package", require_value(&mut args, "--package")?)?);
                }
                "--file" => file = Some(PathBuf::from(require_value(&mut args, "--file")?)),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match command.as_str() {
            "play" => Command::Play { kid_id },
            "import" => Command::Import {
                package_id: package_id.ok_or(ArgsError::MissingFlag { flag: "--package" })?,
                file: file.ok_or(ArgsError::MissingFlag { flag: "--file" })?,
            },
            "seed" => Command::Seed {
                guardian_id,
                kid_id,
            },
            _ => return Err(ArgsError::UnknownCommand(command)),
        };

        Ok(Self { db_url, command })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play   [--db <sqlite_url>] [--kid <id>]");
    eprintln!("  cargo run -p app -- import --package <id> --file <path> [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- seed   [--db <sqlite_url>] [--guardian <id>] [--kid <id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --kid 1, --guardian 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_KID_ID");
    eprintln!("  QUIZ_API_URL + QUIZ_API_KEY  play against a REST backend instead of the database");
    eprintln!("  RUST_LOG                     log filter (default: info)");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ─── Play ──────────────────────────────────────────────────────────────────────

fn print_question(view: &QuestionView) -> Vec<AnswerId> {
    println!();
    println!(
        "Question {}/{} ({} points): {}",
        view.number(),
        view.total,
        view.points,
        view.content
    );
    for (n, option) in view.options.iter().enumerate() {
        println!("  {}) {}", n + 1, option.content);
    }
    if view.options.is_empty() {
        println!("  (no answers available)");
    }
    if let Some(secs) = view.remaining_secs {
        println!("You have {secs} seconds. Type a number and press Enter, or q to quit.");
    }
    view.options.iter().map(|o| o.id).collect()
}

fn print_feedback(kind: FeedbackKind, view: &QuestionView, points: u32) {
    let correct = view
        .options
        .iter()
        .find(|o| o.mark == Some(OptionMark::Correct))
        .map_or("", |o| o.content.as_str());
    match kind {
        FeedbackKind::Correct => println!("Correct! +{points} points"),
        FeedbackKind::Incorrect => println!("Not quite. The answer was: {correct}"),
        FeedbackKind::TimeUp => println!("Time's up! The answer was: {correct}"),
    }
}

fn print_closed(reason: CloseReason) {
    match reason {
        CloseReason::NoPackages => println!("No quizzes are assigned yet."),
        CloseReason::NoQuestions => println!("These quizzes have no questions yet."),
        CloseReason::FetchFailed => println!("Could not load your quizzes."),
    }
}

async fn play(app: &AppServices, kid_id: KidId) -> Result<(), Box<dyn std::error::Error>> {
    let settings = SessionSettings::default().validate()?;
    let runner = SessionRunner::new(app.backend(), Arc::new(TracingNotifier)).with_settings(settings);
    let (input_tx, input_rx) = mpsc::channel(8);
    let (event_tx, mut event_rx) = mpsc::channel(32);
    let session = tokio::spawn(async move { runner.run(kid_id, input_rx, event_tx).await });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut options: Vec<AnswerId> = Vec::new();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    SessionEvent::QuestionShown(view) => options = print_question(&view),
                    SessionEvent::Highlighted(_) => {}
                    SessionEvent::Tick { remaining_secs } => {
                        if remaining_secs <= 5 || remaining_secs % 10 == 0 {
                            println!("  {remaining_secs}s left");
                        }
                    }
                    SessionEvent::Resolved { resolution, view } => {
                        options.clear();
                        print_feedback(resolution.feedback, &view, resolution.answer.points_awarded);
                    }
                    SessionEvent::FeedbackCountdown { remaining_secs } => {
                        println!("  next question in {remaining_secs}...");
                    }
                    SessionEvent::Rejected(e) => println!("  {e}"),
                    SessionEvent::Completed(summary) => {
                        println!();
                        println!(
                            "Done! {} of {} correct, {} points.",
                            summary.correct(),
                            summary.total_questions(),
                            summary.total_points()
                        );
                    }
                    SessionEvent::Closed(reason) => print_closed(reason),
                }
            }
            line = lines.next_line(), if stdin_open => {
                let input = match line? {
                    None => {
                        stdin_open = false;
                        Some(PlayerInput::Quit)
                    }
                    Some(line) => parse_input(line.trim(), &options),
                };
                if let Some(input) = input {
                    debug!(?input, "player input");
                    if input_tx.send(input).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    let outcome = session.await?;
    if outcome == SessionOutcome::Quit {
        println!("Bye!");
    }
    Ok(())
}

fn parse_input(line: &str, options: &[AnswerId]) -> Option<PlayerInput> {
    if line.eq_ignore_ascii_case("q") {
        return Some(PlayerInput::Quit);
    }
    let n: usize = line.parse().ok()?;
    let answer_id = *options.get(n.checked_sub(1)?)?;
    Some(PlayerInput::Choose(answer_id))
}

// ─── Import / Seed ─────────────────────────────────────────────────────────────

async fn import(
    app: &AppServices,
    package_id: PackageId,
    file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = tokio::fs::read_to_string(file).await?;
    let report = app.import().import(package_id, &input).await?;

    println!("Imported {} questions into package {package_id}", report.imported.len());
    for failure in &report.failures {
        println!("  line {}: {}", failure.line, failure.error);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing();

    let clock = Clock::default_clock();
    let app = AppServices::from_env(&args.db_url, clock).await?;
    info!(db_url = %args.db_url, "storage ready");

    match args.command {
        Command::Play { kid_id } => play(&app, kid_id).await,
        Command::Import { package_id, file } => import(&app, package_id, &file).await,
        Command::Seed {
            guardian_id,
            kid_id,
        } => {
            let report = seed_demo(app.storage(), guardian_id, kid_id, clock.now()).await?;
            println!(
                "Seeded {} packages ({} new questions, {} already present) for kid {kid_id}",
                report.packages.len(),
                report.questions,
                report.skipped,
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
