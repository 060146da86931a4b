//! Lexis CLI
//!
//! Operator tool over the scheduling core: pick the next card, record
//! reviews, inspect daily and scenario progress.

mod catalog;

use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use directories::ProjectDirs;
use lexis_core::{
    CardFilter, CardKey, LearnerId, LearnerSettings, QueueTurn, ReviewAction, ReviewRequest,
    Scenario, Scheduler, SchedulerConfig, SchedulerError, Scope, SelectRequest, SettingsProvider,
    Storage,
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Lexis - vocabulary scheduling CLI
#[derive(Parser)]
#[command(name = "lexis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the Lexis spaced-repetition scheduler")]
#[command(long_about = "Lexis schedules vocabulary cards with the FSRS-6 memory model.\n\nWords come from a word file (one per line, optional comma-separated list ids).")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Custom data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Scheduler configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Word file; defaults to words.txt in the data directory
    #[arg(long, global = true)]
    words: Option<PathBuf>,

    /// Learner id
    #[arg(long, short, global = true, default_value = "default")]
    learner: String,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick the next card to show
    Next {
        /// Restrict to a word list
        #[arg(long)]
        list: Option<String>,
        /// Card filter: new, review or both
        #[arg(long, default_value = "both")]
        filter: String,
        /// Queue turn: new, review or auto
        #[arg(long, default_value = "auto")]
        turn: String,
        /// Words to skip (comma-separated)
        #[arg(long)]
        exclude: Option<String>,
    },

    /// Grade, freeze or hide a card
    Review {
        word: String,
        mode: String,
        /// fail|hard|success|easy, 1-4, freeze or hide
        action: String,
        /// Version seen at selection time
        #[arg(long)]
        expect_version: Option<u64>,
        #[arg(long)]
        turn_id: Option<String>,
    },

    /// Record a click (forced fail) on a card
    Click {
        word: String,
        mode: String,
        #[arg(long)]
        turn_id: Option<String>,
    },

    /// Show the outcome of every grade without recording
    Preview { word: String, mode: String },

    /// Show today's statistics
    Stats {
        #[arg(long)]
        list: Option<String>,
    },

    /// Show scenario progress, or whether one word is learned
    Learned {
        /// Scenario id (understanding, recognition)
        #[arg(long, default_value = "understanding")]
        scenario: String,
        #[arg(long)]
        list: Option<String>,
        /// Check a single word
        #[arg(long)]
        word: Option<String>,
    },

    /// Show or change learner settings
    Settings {
        #[arg(long)]
        daily_new_limit: Option<u32>,
        #[arg(long)]
        daily_review_limit: Option<u32>,
        #[arg(long)]
        target_retention: Option<f64>,
        #[arg(long)]
        new_review_ratio: Option<u32>,
    },

    /// Show the review log of a card, newest first
    History {
        word: String,
        mode: String,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

struct App {
    scheduler: Scheduler,
    storage: Arc<Storage>,
    learner: LearnerId,
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let app = open_app(&cli.global)?;

    match cli.command {
        Commands::Next {
            list,
            filter,
            turn,
            exclude,
        } => run_next(&app, list, &filter, &turn, exclude),
        Commands::Review {
            word,
            mode,
            action,
            expect_version,
            turn_id,
        } => run_review(&app, word, mode, &action, expect_version, turn_id),
        Commands::Click {
            word,
            mode,
            turn_id,
        } => run_click(&app, word, mode, turn_id),
        Commands::Preview { word, mode } => run_preview(&app, word, mode),
        Commands::Stats { list } => run_stats(&app, list),
        Commands::Learned {
            scenario,
            list,
            word,
        } => run_learned(&app, &scenario, list, word),
        Commands::Settings {
            daily_new_limit,
            daily_review_limit,
            target_retention,
            new_review_ratio,
        } => run_settings(
            &app,
            SettingsUpdate {
                daily_new_limit,
                daily_review_limit,
                target_retention,
                new_review_ratio,
            },
        ),
        Commands::History { word, mode, limit } => run_history(&app, word, mode, limit),
    }
}

fn data_dir(custom: Option<&PathBuf>) -> anyhow::Result<PathBuf> {
    match custom {
        Some(dir) => Ok(dir.clone()),
        None => ProjectDirs::from("com", "lexis", "core")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| anyhow!("Could not determine data directory")),
    }
}

fn open_app(global: &GlobalArgs) -> anyhow::Result<App> {
    let dir = data_dir(global.data_dir.as_ref())?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

    let config = match &global.config {
        Some(path) => SchedulerConfig::from_file(path)?.with_env_overrides()?,
        None => SchedulerConfig::from_env()?,
    };

    let words_path = global.words.clone().unwrap_or_else(|| dir.join("words.txt"));
    let catalog = Arc::new(catalog::load_words(&words_path)?);
    let storage = Arc::new(Storage::new(Some(dir.join("lexis.db")))?);
    let scheduler = Scheduler::new(storage.clone(), catalog, storage.clone(), config)?;

    Ok(App {
        scheduler,
        storage,
        learner: LearnerId::from(global.learner.as_str()),
        json: global.json,
    })
}

fn scope(list: Option<String>) -> Scope {
    list.map_or(Scope::All, Scope::List)
}

fn key(app: &App, word: String, mode: String) -> CardKey {
    CardKey::new(app.learner.clone(), word, mode)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fmt_days(days: f64) -> String {
    if days < 1.0 {
        format!("{:.0}m", days * 1440.0)
    } else {
        format!("{:.1}d", days)
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_next(
    app: &App,
    list: Option<String>,
    filter: &str,
    turn: &str,
    exclude: Option<String>,
) -> anyhow::Result<()> {
    let filter = CardFilter::parse_name(filter).ok_or_else(|| anyhow!("Unknown filter: {}", filter))?;
    let turn = QueueTurn::parse_name(turn).ok_or_else(|| anyhow!("Unknown turn: {}", turn))?;
    let excluded: Vec<String> = exclude
        .map(|e| e.split(',').map(|w| w.trim().to_string()).filter(|w| !w.is_empty()).collect())
        .unwrap_or_default();

    let req = SelectRequest::new(app.learner.clone(), scope(list))
        .filter(filter)
        .turn(turn)
        .exclude(excluded);
    let picked = app.scheduler.select_next(&req)?;

    if app.json {
        return print_json(&picked);
    }
    match picked {
        Some(card) => {
            println!(
                "{} {} [{}] {}",
                card.word_id.as_str().white().bold(),
                card.mode.as_str().cyan(),
                card.source.as_str().yellow(),
                format!("v{}", card.expected_version()).dimmed()
            );
            let s = card.stats;
            println!(
                "{}",
                format!(
                    "new {}/{}  reviews {}/{}  pool {}  learning due {}  review due {}",
                    s.new_today,
                    s.daily_new_limit,
                    s.reviews_today,
                    s.daily_review_limit,
                    s.new_pool_size,
                    s.learning_due,
                    s.review_due
                )
                .dimmed()
            );
        }
        None => println!("{}", "Nothing to study right now.".dimmed()),
    }
    Ok(())
}

fn run_review(
    app: &App,
    word: String,
    mode: String,
    action: &str,
    expect_version: Option<u64>,
    turn_id: Option<String>,
) -> anyhow::Result<()> {
    let action = ReviewAction::from_str(action)?;
    let mut req = ReviewRequest::new(key(app, word, mode), action);
    if let Some(version) = expect_version {
        req = req.expect_version(version);
    }
    if let Some(id) = turn_id {
        req = req.turn_id(id);
    }

    match app.scheduler.record_review(&req) {
        Ok(outcome) => {
            if app.json {
                return print_json(&outcome);
            }
            let state = &outcome.state;
            println!(
                "{} {} {}",
                "Recorded".green().bold(),
                action.as_str(),
                state.key
            );
            println!("  {}: {}", "Phase".white().bold(), state.phase().as_str());
            if let Some(memory) = state.memory {
                println!(
                    "  {}: {:.2}d  {}: {:.2}",
                    "Stability".white().bold(),
                    memory.stability,
                    "Difficulty".white().bold(),
                    memory.difficulty
                );
            }
            if let Some(due) = state.due_at() {
                println!("  {}: {}", "Due".white().bold(), due.format("%Y-%m-%d %H:%M"));
            }
            if state.is_hidden() {
                println!("  {}", "Hidden from scheduling".dimmed());
            }
            Ok(())
        }
        Err(SchedulerError::ConcurrencyConflict {
            expected, current, ..
        }) => {
            let seen = current.map_or(0, |c| c.version);
            Err(anyhow!(
                "Card changed since selection (expected v{}, now v{}); select again",
                expected,
                seen
            ))
        }
        Err(e) => Err(e.into()),
    }
}

fn run_click(app: &App, word: String, mode: String, turn_id: Option<String>) -> anyhow::Result<()> {
    let outcome = app.scheduler.record_click(&key(app, word, mode), turn_id)?;
    if app.json {
        return print_json(&outcome);
    }
    println!(
        "{} {} ({} clicks)",
        "Click recorded".yellow().bold(),
        outcome.state.key,
        outcome.state.click_count
    );
    Ok(())
}

fn run_preview(app: &App, word: String, mode: String) -> anyhow::Result<()> {
    let preview = app.scheduler.preview(&key(app, word, mode))?;
    if app.json {
        return print_json(&preview);
    }
    println!("{}", "=== Grade Preview ===".cyan().bold());
    for grade in lexis_core::Grade::ALL {
        let out = preview.get(grade);
        println!(
            "  {:8} interval {:>8}  S {:>8.2}  D {:>5.2}",
            grade.as_str(),
            fmt_days(out.interval_days),
            out.stability,
            out.difficulty
        );
    }
    Ok(())
}

fn run_stats(app: &App, list: Option<String>) -> anyhow::Result<()> {
    let stats = app.scheduler.daily_stats(&app.learner, &scope(list))?;
    if app.json {
        return print_json(&stats);
    }
    println!("{}", "=== Lexis Daily Statistics ===".cyan().bold());
    println!();
    println!(
        "{}: {}/{} ({} words)",
        "New Today".white().bold(),
        stats.new_cards_today,
        stats.daily_new_limit,
        stats.new_words_today
    );
    println!(
        "{}: {}/{} ({} words)",
        "Reviews Done".white().bold(),
        stats.review_cards_done,
        stats.daily_review_limit,
        stats.review_words_done
    );
    println!("{}: {}", "Clicks Today".white().bold(), stats.clicks_today);
    println!(
        "{}: {} ({} words)",
        "Due Now".white().bold(),
        stats.review_cards_due,
        stats.review_words_due
    );
    println!(
        "{}: {}/{}",
        "Words Started".white().bold(),
        stats.total_words_started,
        stats.total_words_in_scope
    );
    Ok(())
}

fn run_learned(
    app: &App,
    scenario: &str,
    list: Option<String>,
    word: Option<String>,
) -> anyhow::Result<()> {
    let scenario = Scenario::find_builtin(scenario)?;

    if let Some(word) = word {
        let learned = app
            .scheduler
            .is_learned(&app.learner, &word.as_str().into(), &scenario)?;
        if app.json {
            return print_json(&serde_json::json!({ "word": word, "learned": learned }));
        }
        let verdict = if learned { "learned".green() } else { "not learned".yellow() };
        println!("{} under {}: {}", word.white().bold(), scenario.name, verdict);
        return Ok(());
    }

    let stats = app
        .scheduler
        .scenario_stats(&app.learner, &scope(list), &scenario)?;
    if app.json {
        return print_json(&stats);
    }
    println!("{}", format!("=== {} ===", scenario.name).cyan().bold());
    println!("{}: {}", "Learned".green().bold(), stats.learned);
    println!("{}: {}", "In Progress".yellow().bold(), stats.in_progress);
    println!("{}: {}", "New".white().bold(), stats.new);
    println!("{}: {}", "Total".white().bold(), stats.total);
    Ok(())
}

struct SettingsUpdate {
    daily_new_limit: Option<u32>,
    daily_review_limit: Option<u32>,
    target_retention: Option<f64>,
    new_review_ratio: Option<u32>,
}

impl SettingsUpdate {
    fn is_empty(&self) -> bool {
        self.daily_new_limit.is_none()
            && self.daily_review_limit.is_none()
            && self.target_retention.is_none()
            && self.new_review_ratio.is_none()
    }

    fn apply(self, mut settings: LearnerSettings) -> LearnerSettings {
        if let Some(v) = self.daily_new_limit {
            settings.daily_new_limit = v;
        }
        if let Some(v) = self.daily_review_limit {
            settings.daily_review_limit = v;
        }
        if let Some(v) = self.target_retention {
            settings.target_retention = v;
        }
        if let Some(v) = self.new_review_ratio {
            settings.new_review_ratio = v;
        }
        settings
    }
}

fn run_settings(app: &App, update: SettingsUpdate) -> anyhow::Result<()> {
    let mut settings = app.storage.settings(&app.learner)?;
    if !update.is_empty() {
        settings = update.apply(settings);
        app.storage.save_settings(&app.learner, &settings)?;
    }
    if app.json {
        return print_json(&settings);
    }
    println!("{}", format!("=== Settings: {} ===", app.learner).cyan().bold());
    println!("{}: {}", "Daily New Limit".white().bold(), settings.daily_new_limit);
    println!("{}: {}", "Daily Review Limit".white().bold(), settings.daily_review_limit);
    println!(
        "{}: {:.0}%",
        "Target Retention".white().bold(),
        settings.target_retention * 100.0
    );
    println!("{}: {}", "New:Review Ratio".white().bold(), settings.new_review_ratio);
    Ok(())
}

fn run_history(app: &App, word: String, mode: String, limit: usize) -> anyhow::Result<()> {
    let history = app.scheduler.review_history(&key(app, word, mode), limit)?;
    if app.json {
        return print_json(&history);
    }
    if history.is_empty() {
        println!("{}", "No reviews recorded.".dimmed());
        return Ok(());
    }
    for entry in &history {
        println!(
            "{}  {:8} {:8} -> {:>8}  S {:.2}",
            entry.reviewed_at.format("%Y-%m-%d %H:%M"),
            entry.review_type.as_str(),
            entry.grade.as_str(),
            fmt_days(entry.interval_after),
            entry.stability_after
        );
    }
    Ok(())
}
