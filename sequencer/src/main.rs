//! Entrypoint: parses configuration, wires the core crates together behind
//! an `axum` listener, and runs the periodic timeout sweep alongside the
//! server (`spec.md` §4.7, §6).

mod config;
mod error;
mod routes;
mod state;

use clap::Parser;
use sequencer_ballot_queue::BallotQueue;
use sequencer_ingress::Ingress;
use sequencer_job_manager::{JobManager, JobManagerConfig};
use sequencer_process_store::InMemoryProcessStore;
use sequencer_worker_registry::{WorkerRegistry, WorkerRegistryConfig};
use state::{now_millis, worker_uuid_from_seed, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = config::Cli::parse();
    let config = config::Config::load(cli)?;

    let raw_verification_key = std::fs::read(&config.verification_key_path).map_err(|source| {
        anyhow::anyhow!(
            "failed to read verification key at {:?}: {source}",
            config.verification_key_path
        )
    })?;

    let process_store = Arc::new(InMemoryProcessStore::new());
    let ballot_queue = Arc::new(BallotQueue::new());
    let worker_registry = Arc::new(WorkerRegistry::new(WorkerRegistryConfig {
        max_consecutive_failures: config.max_consecutive_failures,
        ban_timeout_millis: config.ban_timeout_millis,
    }));
    let (job_manager, failure_rx) = JobManager::new(
        Arc::clone(&ballot_queue),
        Arc::clone(&worker_registry),
        JobManagerConfig {
            job_timeout_millis: config.worker_job_timeout_millis,
        },
    );
    let job_manager = Arc::new(job_manager);

    let ingress = Ingress::new(Arc::clone(&process_store), Arc::clone(&ballot_queue), raw_verification_key);

    let worker_uuid = config.worker_seed.as_deref().map(worker_uuid_from_seed);
    if let Some(uuid) = worker_uuid {
        info!(%uuid, "worker endpoints enabled");
    } else {
        info!("no worker seed configured; /workers endpoints are disabled");
    }

    let state = Arc::new(AppState {
        ingress,
        ballot_queue,
        job_manager: Arc::clone(&job_manager),
        worker_uuid,
    });

    // Unbuffered by design (`spec.md` §9): this thread is the permanent
    // consumer so `JobManager::sweep` never blocks indefinitely.
    std::thread::spawn(move || {
        while let Ok(failed) = failure_rx.recv() {
            warn!(worker = %failed.worker, vote_id = %failed.vote_id, "job timed out");
        }
    });

    let sweep_interval = Duration::from_millis(config.sweep_interval_millis);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let now = now_millis();
            job_manager.sweep(now);
            worker_registry.sweep(now);
        }
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.listen_host, config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
