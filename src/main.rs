//! Codebee - unified CLI
//!
//! Serves the game over HTTP and manages problems and replays.

#![warn(missing_docs)]

mod cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{body::Body, http::Request};
use clap::Parser;
use cli::{Cli, Command};
use codebee::{
    BeeConfig, BotRoster, GameService, GameStore, MemoryStore, NewProblem, NodeExecutor,
    Scheduler, SolutionExecutor, SqliteStore, TaskRunner, Worker, all_inputs, replay, router,
};
use tower::ServiceBuilder;
use tokio::sync::oneshot;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

const EXECUTOR_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            db_path,
            memory,
            host,
            port,
            node,
        } => {
            let config = load_config(config)?;
            if memory {
                serve(MemoryStore::new(), config, host, port, node).await
            } else {
                serve(SqliteStore::open(&db_path)?, config, host, port, node).await
            }
        }
        Command::AddProblem { db_path, file } => add_problem(&db_path, file),
        Command::Playback { db_path, game_id } => playback(&db_path, game_id),
    }
}

#[instrument]
fn load_config(path: Option<PathBuf>) -> Result<BeeConfig> {
    let config = match path {
        Some(path) => BeeConfig::from_file(&path)?,
        None => BeeConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

/// Runs the HTTP server and the bot worker until shutdown.
#[instrument(skip(store, config, node))]
async fn serve<S: GameStore>(
    store: S,
    config: BeeConfig,
    host: String,
    port: u16,
    node: Option<PathBuf>,
) -> Result<()> {
    let roster = BotRoster::from_config(&config);
    let (scheduler, rx) = Scheduler::channel();
    let service = GameService::new(store, config, scheduler);

    let executor = node.map(|program| {
        info!(program = %program.display(), "Scoring with node");
        Arc::new(NodeExecutor::new(program, EXECUTOR_TIMEOUT)) as Arc<dyn SolutionExecutor>
    });
    let worker = Worker::new(TaskRunner::new(service.clone(), roster, executor), rx);
    let (stop_worker, stopped) = oneshot::channel::<()>();
    let worker = tokio::spawn(worker.run(async {
        stopped.await.ok();
    }));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    info!("Server ready at http://{}:{}/", host, port);

    let app = router(service).layer(ServiceBuilder::new().map_request(log_request));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    stop_worker.send(()).ok();
    worker.await.context("Worker panicked")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
    }
    info!("Shutting down");
}

fn log_request(req: Request<Body>) -> Request<Body> {
    info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
    req
}

#[instrument]
fn add_problem(db_path: &str, file: PathBuf) -> Result<()> {
    let contents = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let problem: NewProblem = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let (scheduler, _rx) = Scheduler::channel();
    let service = GameService::new(SqliteStore::open(db_path)?, BeeConfig::default(), scheduler);
    let problem = service.create_problem(problem)?;
    println!("Added problem {}", problem.id());
    Ok(())
}

#[instrument]
fn playback(db_path: &str, game_id: i64) -> Result<()> {
    let store = SqliteStore::open(db_path)?;
    let inputs = store.transaction(|txn| all_inputs(txn, game_id))?;

    for (step, (input, state)) in inputs.iter().zip(replay(&inputs).iter().skip(1)).enumerate() {
        println!(
            "{:>4} {:<8} {:<10} {:?}",
            step + 1,
            input.side(),
            input.operation.to_string(),
            state.code()
        );
    }
    Ok(())
}
