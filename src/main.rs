//! questlog - skill-branch progression for completed tasks
//!
//! Usage:
//!   questlog complete task.json     → award a finished task (or its due milestones)
//!   questlog plan task.json         → show which installments are due
//!   questlog status                 → branch levels, perks, streak
//!   questlog achievements           → unlocked, daily and weekly achievements
//!   questlog decay                  → apply pending decay without awarding
//!   questlog init-config            → write the default config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use questlog::store::{read_task, write_json_atomic};
use questlog::{data_dir, expand_tilde, parse_at, report, Store};
use questlog_core::{EscrowMode, Tick};
use questlog_engine::{due_payouts, EngineConfig, ProgressionEngine};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "questlog",
    about = "Skill-branch progression for completed tasks",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Profile file (default: ~/.questlog/profile.json)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Engine config file, TOML (default: ~/.questlog/questlog.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    /// Override the clock, e.g. 2026-10-19T08:30
    #[arg(long, global = true)]
    at: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Award a completed task. Paid flags are written back into the task file.
    Complete {
        /// Task record (JSON)
        task: PathBuf,
    },
    /// Show the installments currently due for a task
    Plan {
        /// Task record (JSON)
        task: PathBuf,
    },
    /// Show branch levels, perks and streak
    Status,
    /// List unlocked achievements
    Achievements,
    /// Apply pending decay
    Decay,
    /// Write the default config (to --config, or stdout)
    InitConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref());

    let config_path = cli
        .config
        .as_deref()
        .map(expand_tilde)
        .unwrap_or_else(|| data_dir().join("questlog.toml"));

    if let Commands::InitConfig = cli.command {
        let toml = EngineConfig::default().to_toml();
        if cli.config.is_some() {
            if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&config_path, toml)
                .with_context(|| format!("writing {}", config_path.display()))?;
            println!("Wrote {}", config_path.display());
        } else {
            print!("{}", toml);
        }
        return Ok(());
    }

    let engine = ProgressionEngine::new(EngineConfig::load(&config_path));
    let store = Store::new(
        cli.profile
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(|| data_dir().join("profile.json")),
    );
    let mut profile = store.load_or_create();

    let now = match cli.at.as_deref() {
        Some(raw) => parse_at(raw)?,
        None => chrono::Local::now().naive_local(),
    };
    let tick = Tick::new(now, profile.level(&engine.config().levels));

    match cli.command {
        Commands::Complete { task: task_path } => {
            let mut task = read_task(&task_path)?;
            if task.escrow.mode != EscrowMode::Milestone {
                task.done = true;
            }

            let mut gained = 0u64;
            let settled = engine.settle(&mut profile.state, &mut task, &tick, &mut |d: u64| gained += d);
            profile.add_global_xp(gained);

            print!("{}", report::format_settlements(&settled));
            if !settled.is_empty() {
                store.save(&profile)?;
                write_json_atomic(&task_path, &task)?;
                info!("Task {} settled: {} payout(s), +{} global", task.id, settled.len(), gained);
            }
        }
        Commands::Plan { task: task_path } => {
            let task = read_task(&task_path)?;
            print!("{}", report::format_plan(&due_payouts(&task)));
        }
        Commands::Status => {
            print!("{}", report::format_status(&profile, engine.config(), &tick));
        }
        Commands::Achievements => {
            print!("{}", report::format_achievements(&profile));
        }
        Commands::Decay => {
            let decay = profile
                .state
                .ledger
                .apply_decay(tick.today(), &engine.config().decay);
            if decay.changed {
                println!("Decay applied for {} day(s)", decay.days_elapsed);
            } else {
                println!("No decay due");
            }
            store.save(&profile)?;
        }
        // handled before the profile is loaded
        Commands::InitConfig => {}
    }

    Ok(())
}

fn init_tracing(log_file: Option<&str>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "questlog=info,questlog_engine=info".into());
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match log_file {
        Some(path) => {
            let path = expand_tilde(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "questlog.log".to_string());
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}
