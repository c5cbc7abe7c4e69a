use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::warn;

use fitpro_sync::cache::CollectionKind;
use fitpro_sync::config::Config;
use fitpro_sync::domains::{DayExercises, Exercise, ExerciseSchedule, TrainingDay, WorkoutPlan};
use fitpro_sync::error::{FitproError, Result};
use fitpro_sync::identity::SessionContext;
use fitpro_sync::interfaces::backend::WorkoutBackend;
use fitpro_sync::logging::init_tracing;
use fitpro_sync::providers::{HttpBackend, InMemoryBackend};
use fitpro_sync::read_model::ReadModel;
use fitpro_sync::services::{Poller, SyncEvent, SyncOptions, ToggleOutcome, WorkoutSync};

/// Consecutive failures on every collection before the watcher says so.
const PERSISTENT_FAILURES: u32 = 3;

#[derive(Parser, Debug)]
#[command(name = "fitpro-sync")]
#[command(about = "Client-side workout sync for assigned training plans")]
struct Cli {
    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Falls back to FITPRO_CLIENT_ID, then the config file.
    #[arg(long)]
    client_id: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    /// Serve a seeded in-memory store instead of the REST API.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Repeat for more log output on stderr.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List assigned plans.
    Plans {
        /// Print the exercise schedule of this plan.
        #[arg(long)]
        expand: Option<String>,
    },
    Bookmarks,
    History {
        #[arg(long)]
        plan: Option<String>,
    },
    Notes,
    /// Bookmark or unbookmark a plan.
    Toggle { plan_id: String },
    /// Log a completed session.
    Log {
        plan_id: String,
        #[arg(long, default_value = "")]
        duration: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Save a plan's note. An empty note deletes it.
    Note {
        plan_id: String,
        #[arg(default_value = "")]
        text: String,
    },
    /// Poll until interrupted, printing sync events.
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing("fitpro_sync", cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(FitproError::Unavailable) => {
            eprintln!("Unable to load workout plans");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::convention_defaults(),
    }
    .apply_env_overrides();
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    config.validate()?;

    let session =
        SessionContext::resolve_with_env(cli.client_id.as_deref(), config.client_id.as_deref());
    let client = session.require()?.clone();

    let backend: Arc<dyn WorkoutBackend> = if cli.offline {
        let store = InMemoryBackend::new();
        for plan in demo_plans() {
            store.assign_plan(&client, plan).await;
        }
        Arc::new(store)
    } else {
        Arc::new(HttpBackend::new(&config.api)?)
    };

    let sync = Arc::new(WorkoutSync::new(backend, session, SyncOptions::from(&config)));
    sync.refresh_all().await?;

    match cli.command {
        Command::Plans { expand } => {
            let model = sync.read_model()?;
            require_loaded(&sync, CollectionKind::Plans)?;
            if let Some(plan_id) = &expand {
                sync.update_selection(|s| s.toggle_expanded(plan_id));
            }
            print_plans(&model, sync.selection().expanded_plan());
        }
        Command::Bookmarks => {
            let model = sync.read_model()?;
            require_loaded(&sync, CollectionKind::Bookmarks)?;
            for entry in model.bookmarked_plans() {
                println!("{}  {}", entry.plan.id, entry.plan.name);
            }
        }
        Command::History { plan } => {
            let model = sync.read_model()?;
            require_loaded(&sync, CollectionKind::History)?;
            let sessions = match &plan {
                Some(plan_id) => model.recent_history_of(plan_id),
                None => model.history().iter().collect(),
            };
            if sessions.is_empty() {
                println!("No workout history yet");
            }
            for session in sessions {
                println!(
                    "{}  {}  {} min{}",
                    session.completed_at.format("%Y-%m-%d %H:%M"),
                    session.workout_name,
                    session.duration,
                    session
                        .notes
                        .as_deref()
                        .filter(|n| !n.is_empty())
                        .map(|n| format!("  ({n})"))
                        .unwrap_or_default()
                );
            }
        }
        Command::Notes => {
            let model = sync.read_model()?;
            require_loaded(&sync, CollectionKind::Notes)?;
            for (plan_id, text) in model.notes() {
                println!("{plan_id}:\n{text}\n");
            }
        }
        Command::Toggle { plan_id } => match sync.toggle_bookmark(&plan_id).await? {
            ToggleOutcome::Bookmarked => println!("Bookmarked {plan_id}"),
            ToggleOutcome::Unbookmarked => println!("Removed bookmark for {plan_id}"),
            ToggleOutcome::Skipped => println!("Unknown plan {plan_id}; nothing changed"),
        },
        Command::Log {
            plan_id,
            duration,
            notes,
        } => {
            sync.update_selection(|s| {
                s.begin_logging(&plan_id);
                if !duration.is_empty() {
                    s.set_duration_draft(&duration);
                }
                s.set_session_notes_draft(&notes);
            });
            let session = sync.submit_log_form().await?;
            println!(
                "Logged {} min of {} ({})",
                session.duration, session.workout_name, session.id
            );
        }
        Command::Note { plan_id, text } => {
            sync.update_selection(|s| {
                s.open_note_editor(&plan_id, "");
                s.edit_note(&plan_id, &text);
            });
            sync.save_note_draft(&plan_id).await?;
            sync.update_selection(|s| s.close_note_editor(&plan_id));
            println!("Notes saved for {plan_id}");
        }
        Command::Watch => watch(Arc::clone(&sync), &config).await?,
    }

    sync.close();
    Ok(())
}

async fn watch(sync: Arc<WorkoutSync>, config: &Config) -> Result<()> {
    let mut events = sync.subscribe();
    let mut poller = Poller::start(Arc::clone(&sync), &config.polling);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SyncEvent::SnapshotApplied { kind, version }) => {
                    println!("{kind} updated (v{version})");
                }
                Ok(SyncEvent::FetchFailed { kind, error }) => {
                    println!("{kind} refresh failed: {error}");
                    if sync.cache().all_failing(PERSISTENT_FAILURES) {
                        println!("Unable to reach the server; showing last loaded data");
                    }
                }
                Ok(SyncEvent::Notice(notice)) => println!("{}", notice.message),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event observer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| FitproError::Runtime(e.to_string()))?;
                break;
            }
        }
    }
    sync.close();
    poller.stop().await;
    Ok(())
}

/// A collection whose first fetch failed has nothing to show.
fn require_loaded(sync: &WorkoutSync, kind: CollectionKind) -> Result<()> {
    let status = sync.status(kind);
    if status.loaded {
        return Ok(());
    }
    Err(FitproError::Http(status.last_error.unwrap_or_else(|| {
        format!("{} not loaded", kind.label())
    })))
}

fn print_plans(model: &ReadModel, expanded: Option<&str>) {
    if model.plans().is_empty() {
        println!("No workout plans assigned");
        return;
    }
    for plan in model.plans() {
        let star = if model.is_bookmarked(&plan.id) { "*" } else { " " };
        let logged = model.history_of(&plan.id).len();
        println!("{star} {}  {}  ({logged} logged)", plan.id, plan.name);
        if let Some(description) = &plan.description {
            println!("    {description}");
        }
        let note = model.notes_of(&plan.id);
        if !note.is_empty() {
            println!("    note: {}", note.replace('\n', "\n          "));
        }
        if expanded == Some(plan.id.as_str()) {
            print_schedule(&plan.exercises);
        }
    }
}

fn print_schedule(schedule: &ExerciseSchedule) {
    if schedule.is_empty() {
        println!("    (no schedule)");
        return;
    }
    for day in schedule.days() {
        println!("    {}", day.day);
        match &day.exercises {
            DayExercises::Listed(exercises) if !exercises.is_empty() => {
                for exercise in exercises {
                    println!("      - {}", exercise.label());
                }
            }
            _ => println!("      No exercises configured"),
        }
    }
}

fn demo_day(day: &str, exercises: &[&str]) -> TrainingDay {
    TrainingDay {
        day: day.to_string(),
        exercises: DayExercises::Listed(
            exercises
                .iter()
                .map(|name| Exercise::Named(name.to_string()))
                .collect(),
        ),
    }
}

fn demo_plans() -> Vec<WorkoutPlan> {
    let mut legs = WorkoutPlan::new("plan-legs", "Leg Day");
    legs.description = Some("Lower body strength".to_string());
    legs.exercises = ExerciseSchedule::new(vec![
        demo_day("Monday", &["Back Squat 5x5", "Romanian Deadlift 3x8"]),
        demo_day("Thursday", &["Walking Lunges 3x12"]),
    ]);
    let mut push = WorkoutPlan::new("plan-push", "Push");
    push.exercises = ExerciseSchedule::new(vec![demo_day(
        "Tuesday",
        &["Bench Press 4x6", "Overhead Press 3x8"],
    )]);
    vec![legs, push]
}
