// Insight Desk - command line entry point
//
// Replays recorded backend event streams through the state managers and
// prints the resulting state as JSON.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use insight_desk::models::settings::AppConfig;
use insight_desk::state::AppState;
use insight_desk::storage::config::ConfigService;
use insight_desk_core::{AdapterError, Clock, EventAdapter, JsonLinesAdapter, ManualClock};

#[derive(Parser)]
#[command(
    name = "insight-desk",
    version,
    about = "Replay analysis event streams through the Insight Desk state managers",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSON-lines event recording and print the final state
    Replay {
        /// Recording to read, or `-` for stdin
        input: String,

        /// Config file (default: ~/.insight-desk/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run every pending timer after the last event
        #[arg(long)]
        settle: bool,
    },
    /// Print the effective configuration
    ShowConfig {
        /// Config file (default: ~/.insight-desk/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let service = match path {
        Some(path) => ConfigService::open(path.clone())
            .with_context(|| format!("failed to open config {}", path.display()))?,
        None => ConfigService::new().context("failed to open default config")?,
    };
    Ok(service.get_config_clone())
}

fn init_tracing(config: &AppConfig) {
    let level = if config.debug_mode {
        tracing::Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(tracing::Level::INFO)
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn open_input(input: &str) -> Result<Box<dyn BufRead>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(input).with_context(|| format!("failed to open recording {}", input))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Fire timers in deadline order until the clock reaches `target_ms`.
async fn advance_to(state: &AppState, clock: &ManualClock, target_ms: i64) {
    while let Some(deadline) = state.next_deadline().await {
        if deadline > target_ms {
            break;
        }
        clock.set(deadline.max(clock.now_ms()));
        state.fire_due_timers().await;
    }
    if target_ms > clock.now_ms() {
        clock.set(target_ms);
    }
}

async fn replay(input: &str, config: AppConfig, settle: bool) -> Result<()> {
    let clock = Arc::new(ManualClock::new(0));
    let state = AppState::with_clock(config, clock.clone());
    let mut adapter = JsonLinesAdapter::new();
    let mut dispatched = 0usize;
    let mut skipped = 0usize;

    for line in open_input(input)?.lines() {
        let line = line.context("failed to read recording")?;
        let events = match adapter.adapt(&line) {
            Ok(events) => events,
            Err(AdapterError::UnsupportedEvent(name)) => {
                tracing::warn!("[Replay] Skipping unsupported event '{}'", name);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e).context(format!("{} adapter failed", adapter.name())),
        };

        for recorded in events {
            if let Some(at_ms) = recorded.at_ms {
                advance_to(&state, &clock, at_ms).await;
            }
            state.dispatch(recorded.event).await;
            state.drain_outbox().await;
            dispatched += 1;
        }
    }

    if settle {
        while let Some(deadline) = state.next_deadline().await {
            advance_to(&state, &clock, deadline).await;
        }
    } else {
        advance_to(&state, &clock, clock.now_ms()).await;
    }

    tracing::info!(
        "[Replay] {} events dispatched, {} skipped, {} lines read",
        dispatched,
        skipped,
        adapter.lines_seen()
    );

    let snapshot = state.snapshot().await;
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &snapshot)?;
    writeln!(stdout)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Replay {
            input,
            config,
            settle,
        } => {
            let config = load_config(config)?;
            init_tracing(&config);
            replay(&input, config, settle).await
        }
        Command::ShowConfig { config } => {
            let config = load_config(config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
