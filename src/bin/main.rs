//! `proxima run`, the kernel runner (spec.md §6): `run --experiment-id
//! <id> [--steps N] [--seed S] [--read-only]`. Exit codes: `0` normal,
//! `2` config error, `3` commit-overdraft under strict mode, `4`
//! external-store unreachable.

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use proxima::builder::Builder;
use proxima::command;
use proxima::config::CONFIG;
use proxima::store::{Command as StoreCommand, CommandSource, ConfigStore, FanoutLogSink, PollingCommandSource, SimulationLogSink};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "proxima")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Runs an experiment's simulation to completion (or forever, polling
    /// for dashboard commands, if `--steps` is omitted).
    Run {
        #[arg(long)]
        experiment_id: Option<String>,
        #[arg(long)]
        steps: Option<u64>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        read_only: bool,
    },
}

/// Connects to Postgres when `db_uri` names one, otherwise falls back to
/// the in-process store (local runs, tests).
async fn build_store(db_uri: &str) -> Arc<dyn ConfigStore> {
    if db_uri.starts_with("postgres://") || db_uri.starts_with("postgresql://") {
        Arc::new(proxima::store::PostgresConfigStore::connect(db_uri).await)
    } else {
        Arc::new(proxima::store::InMemoryConfigStore::new())
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    pretty_env_logger::init_timed();

    let cli = Cli::parse();
    let Cmd::Run {
        experiment_id,
        steps,
        seed: _,
        read_only,
    } = cli.command;

    let experiment_id = experiment_id.unwrap_or_else(|| CONFIG.experiment_id.clone());
    let read_only = read_only || CONFIG.read_only;
    info!("proxima: starting run for experiment {experiment_id} (read_only={read_only})");

    let store: Arc<dyn ConfigStore> = build_store(&CONFIG.db_uri).await;
    let builder = Builder::new(store.as_ref());
    let mut world = match builder.build_world(&experiment_id).await {
        Ok(world) => world,
        Err(e) => {
            error!("proxima: failed to build world: {e}");
            std::process::exit(2);
        }
    };

    let command_source = PollingCommandSource::new(store.clone());
    let log_sink = FanoutLogSink::new(vec![Box::new(proxima::store::CsvLogSink::new(
        std::path::PathBuf::from(format!("{experiment_id}.csv")),
        1,
    )) as Box<dyn SimulationLogSink>]);

    let mut cycles_run: u64 = 0;
    loop {
        if let Some(n) = steps {
            if cycles_run >= n {
                break;
            }
        }
        if let Some(n) = CONFIG.update_cycles {
            if cycles_run >= n {
                break;
            }
        }

        if !read_only {
            let pending: Vec<StoreCommand> = command_source.drain_pending().await;
            for cmd in &pending {
                if let Err(e) = command::apply_command(&mut world, cmd) {
                    warn!("proxima: command {} rejected: {e}", cmd.id);
                }
            }
        }

        if world.runner_state == proxima::world::RunnerState::Paused {
            if CONFIG.update_rate_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(CONFIG.update_rate_ms)).await;
            }
            continue;
        }

        let snapshot = world.step();
        let aborted = snapshot.errors.iter().any(|e| e.starts_with("CommitOverdraft") && e.contains("aborted"));
        if let Err(e) = log_sink.write_snapshot(&snapshot).await {
            error!("proxima: log sink failed: {e}");
        }
        cycles_run += 1;

        if aborted && world.commit_mode == proxima::config::CommitMode::Strict {
            error!("proxima: commit overdraft under strict mode, stopping at step {}", snapshot.t);
            std::process::exit(3);
        }

        if CONFIG.update_rate_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(CONFIG.update_rate_ms)).await;
        }
    }

    info!("proxima: run complete after {cycles_run} step(s)");
}
