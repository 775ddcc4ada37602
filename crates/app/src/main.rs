use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{
    Category, CategoryId, Quiz, QuizSettings, QuizSettingsDraft, SettingsError,
};
use services::{
    Clock, GrantOutcome, Navigation, OfferError, OfferResult, QuizSessionController,
    RewardError, RewardedOfferProvider, SessionEvent, SessionPhase,
};
use storage::repository::{CatalogRepository, Storage};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

mod demo;

const BONUS_POINTS: u32 = 20;
const RECENT_ATTEMPTS: u32 = 5;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCategoryId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNumber { var: &'static str, raw: String },
    Settings(SettingsError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCategoryId { raw } => {
                write!(f, "invalid --category-id value: {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { var, raw } => write!(f, "invalid {var} value: {raw}"),
            ArgsError::Settings(err) => write!(f, "invalid settings: {err}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play [--db <sqlite_url>] [--category-id <id>]");
    eprintln!("  cargo run -p app -- seed [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults for play:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --category-id <first category>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_CATEGORY_ID");
    eprintln!("  QUIZ_LOAD_ATTEMPTS, QUIZ_RETRY_DELAY_MS, QUIZ_CACHE_TTL_SECS");
    eprintln!("  RUST_LOG (e.g. RUST_LOG=services=debug)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    category_id: Option<CategoryId>,
    settings: QuizSettings,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut category_id = std::env::var("QUIZ_CATEGORY_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(CategoryId::new);
        let settings = settings_from_env()?;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--category-id" => {
                    let value = require_value(args, "--category-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCategoryId { raw: value.clone() })?;
                    category_id = Some(CategoryId::new(parsed));
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
            category_id,
            settings,
        })
    }
}

fn env_number(var: &'static str) -> Result<Option<u64>, ArgsError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ArgsError::InvalidNumber { var, raw }),
        Err(_) => Ok(None),
    }
}

fn settings_from_env() -> Result<QuizSettings, ArgsError> {
    let mut draft = QuizSettingsDraft::default();
    if let Some(attempts) = env_number("QUIZ_LOAD_ATTEMPTS")? {
        draft.load_attempts = u32::try_from(attempts).map_err(|_| ArgsError::InvalidNumber {
            var: "QUIZ_LOAD_ATTEMPTS",
            raw: attempts.to_string(),
        })?;
    }
    if let Some(ms) = env_number("QUIZ_RETRY_DELAY_MS")? {
        draft.retry_delay = Duration::from_millis(ms);
    }
    if let Some(secs) = env_number("QUIZ_CACHE_TTL_SECS")? {
        draft.cache_ttl = Duration::from_secs(secs);
    }
    draft.validate().map_err(ArgsError::Settings)
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Stands in for an ad network and always pays out.
struct TerminalOffer;

#[async_trait]
impl RewardedOfferProvider for TerminalOffer {
    async fn show_rewarded_offer(&self) -> Result<OfferResult, OfferError> {
        println!("  [offer] Thanks for watching! +{BONUS_POINTS} points");
        Ok(OfferResult {
            granted: true,
            amount: BONUS_POINTS,
        })
    }
}

type Input = Lines<BufReader<Stdin>>;

async fn prompt(input: &mut Input, text: &str) -> Result<Option<String>, std::io::Error> {
    println!("{text}");
    Ok(input.next_line().await?.map(|line| line.trim().to_owned()))
}

async fn pick_category(
    catalog: &dyn CatalogRepository,
    preferred: Option<CategoryId>,
) -> Result<Category, Box<dyn std::error::Error>> {
    let mut categories = catalog.list_categories().await?;
    if categories.is_empty() {
        // First launch against an empty database.
        demo::seed_demo_catalog(catalog).await?;
        categories = catalog.list_categories().await?;
    }

    if categories.is_empty() {
        return Err("catalog has no categories".into());
    }
    let index = preferred
        .and_then(|id| categories.iter().position(|c| c.id() == id))
        .unwrap_or(0);
    Ok(categories.swap_remove(index))
}

fn report_events(events: &[SessionEvent]) {
    for event in events {
        match event {
            SessionEvent::EmptyResult { resource } => println!("  no {resource} yet"),
            SessionEvent::LoadFailed { resource, message, .. } => {
                println!("  could not load {resource}: {message}");
            }
            SessionEvent::AttemptNotSaved { message, .. } => {
                println!("  your result was not saved: {message}");
            }
            _ => log::debug!("{event:?}"),
        }
    }
}

async fn play(storage: &Storage, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let category = pick_category(storage.catalog.as_ref(), args.category_id).await?;
    println!("Category: {} ({})", category.folder(), category.difficulty());

    let mut ctl =
        QuizSessionController::from_storage(args.settings.clone(), Clock::default(), storage);
    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();

    ctl.select_category(category);
    report_events(&ctl.settle().await);

    let snapshot = ctl.snapshot();
    if snapshot.quizzes.len() > 1 {
        for (n, quiz) in snapshot.quizzes.iter().enumerate() {
            println!("  {}. {} ({} questions)", n + 1, quiz.title(), quiz.question_count());
        }
        let choice = prompt(&mut input, "Pick a quiz [1]:").await?;
        let picked = choice
            .and_then(|raw| raw.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| snapshot.quizzes.get(i).cloned());
        let current = snapshot.quiz.as_ref().map(Quiz::id);
        if let Some(quiz) = picked.filter(|q| Some(q.id()) != current) {
            ctl.select_quiz(quiz)?;
            report_events(&ctl.settle().await);
        }
    }

    if ctl.phase() != SessionPhase::InProgress {
        println!("Nothing to play right now ({}).", ctl.phase());
        return Ok(());
    }

    while ctl.phase() == SessionPhase::InProgress {
        let Some(question) = ctl.current_question().cloned() else {
            break;
        };
        println!();
        println!("{}", question.prompt());
        for (n, option) in question.options().iter().enumerate() {
            println!("  {}. {option}", n + 1);
        }

        let Some(raw) = prompt(&mut input, "Your answer:").await? else {
            println!("Input closed, leaving the quiz.");
            return Ok(());
        };
        let Some(option) = raw.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) else {
            println!("Please answer with a number from 1 to {}.", question.options().len());
            continue;
        };
        if let Err(err) = ctl.answer_current(option) {
            println!("{err}");
            continue;
        }

        if question.is_correct(option) {
            println!("Correct!");
        } else {
            println!("Not quite. {}", question.explanation());
        }

        if let Navigation::Finished(report) = ctl.next_question()? {
            println!();
            println!(
                "Done: {}/{} correct ({}%), {} points.",
                report.correct, report.total, report.accuracy, report.points
            );
        }
    }

    report_events(&ctl.settle().await);

    if ctl.can_offer_bonus() {
        let answer = prompt(&mut input, "Watch an offer for bonus points? [y/N]").await?;
        if answer.is_some_and(|a| a.eq_ignore_ascii_case("y")) {
            match ctl.claim_bonus(&TerminalOffer).await {
                Ok(GrantOutcome::Granted { .. } | GrantOutcome::AlreadyGranted { .. }) => {
                    println!("Total: {} points.", ctl.snapshot().points);
                }
                Err(RewardError::Declined) => println!("No bonus this time."),
                Err(err) => println!("Bonus unavailable: {err}"),
            }
        }
    }

    if let Some(quiz) = ctl.snapshot().quiz {
        let recent = storage.attempts.list_attempts(quiz.id(), RECENT_ATTEMPTS).await?;
        if !recent.is_empty() {
            println!();
            println!("Recent attempts at {}:", quiz.title());
            for row in recent {
                let record = &row.record;
                println!(
                    "  {}  {:>3}%  {} points{}",
                    record.completed_at().format("%Y-%m-%d %H:%M"),
                    record.score(),
                    record.points(),
                    if record.completed() { "" } else { "  (partial)" }
                );
            }
        }
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Playing is the default when no subcommand is given.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup so core/services stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    match cmd {
        Command::Play => play(&storage, &parsed).await,
        Command::Seed => {
            let written = demo::seed_demo_catalog(storage.catalog.as_ref()).await?;
            println!("seeded {written} questions into {}", parsed.db_url);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
