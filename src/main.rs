use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use oddsboard::api::health::HealthState;
use oddsboard::api::latency::LatencyStats;
use oddsboard::api::{router, ApiState};
use oddsboard::config::{Config, CHANNEL_CAPACITY};
use oddsboard::db::{self, DbWriter, PersistMsg};
use oddsboard::detector::MovementModel;
use oddsboard::error::{AppError, Result};
use oddsboard::seed;
use oddsboard::state::MemoryStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::open(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Restore the store from disk ---
    let store = MemoryStore::new();
    db::load_into(&pool, &store).await?;

    // --- Persistence task ---
    let health = Arc::new(HealthState::new());
    let (persist_tx, persist_rx) = mpsc::channel::<PersistMsg>(CHANNEL_CAPACITY);
    let writer = DbWriter::new(pool.clone(), persist_rx, health.clone());
    tokio::spawn(async move { writer.run().await });

    // --- Fixture catalog ---
    if let Some(path) = &cfg.seed_path {
        match seed::read_catalog(path).await {
            Ok(catalog) => {
                let outcome = seed::apply(&store, catalog);
                let now_ms = chrono::Utc::now().timestamp_millis();
                health.record_ingest(outcome.report.accepted, now_ms);
                for contest in outcome.contests {
                    enqueue(&persist_tx, &health, PersistMsg::Contest(contest)).await?;
                }
                for (contest_id, samples) in outcome.samples {
                    enqueue(&persist_tx, &health, PersistMsg::Samples { contest_id, samples }).await?;
                }
            }
            Err(e) => warn!(path = %path, "[SEED] catalog not loaded: {e}"),
        }
    }

    info!(
        contests = store.contest_count(),
        samples = store.sample_count(),
        window_minutes = cfg.movement_window.map(|w| w.num_minutes()),
        "Store ready"
    );

    // --- HTTP API server ---
    let api_state = ApiState {
        store,
        model: MovementModel::new(cfg.thresholds, cfg.movement_window),
        persist_tx,
        latency: Arc::new(LatencyStats::new()),
        health,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn enqueue(tx: &mpsc::Sender<PersistMsg>, health: &HealthState, msg: PersistMsg) -> Result<()> {
    health.inc_write_queue_pending();
    tx.send(msg).await.map_err(|e| {
        health.dec_write_queue_pending();
        AppError::ChannelSend(e.to_string())
    })
}
