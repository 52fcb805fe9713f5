use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::api::health::HealthState;
use crate::db::models::{ContestRow, SampleRow};
use crate::error::Result;
use crate::types::{Contest, OddsSample};

/// Work for the writer. Samples arrive already accepted by the store, so
/// their order per contest is strictly increasing.
#[derive(Debug, Clone)]
pub enum PersistMsg {
    Contest(Contest),
    Samples {
        contest_id: String,
        samples: Vec<OddsSample>,
    },
}

/// Receives accepted data from the ingest path and persists it to SQLite.
/// Runs as a dedicated background task so HTTP handlers never wait on disk.
pub struct DbWriter {
    pool: sqlx::SqlitePool,
    rx: mpsc::Receiver<PersistMsg>,
    health: Arc<HealthState>,
}

impl DbWriter {
    pub fn new(pool: sqlx::SqlitePool, rx: mpsc::Receiver<PersistMsg>, health: Arc<HealthState>) -> Self {
        Self { pool, rx, health }
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            let outcome = match &msg {
                PersistMsg::Contest(c) => write_contest(&self.pool, c).await,
                PersistMsg::Samples { contest_id, samples } => {
                    write_samples(&self.pool, contest_id, samples).await
                }
            };
            self.health.dec_write_queue_pending();
            if let Err(e) = outcome {
                self.health.inc_write_errors();
                error!("DB write error: {e}");
            }
        }
        debug!("[DB] writer channel closed");
    }
}

/// Insert or refresh a contest. Keeps the original rowid so catalog order survives.
pub async fn write_contest(pool: &sqlx::SqlitePool, c: &Contest) -> Result<()> {
    let row = ContestRow::from_contest(c)?;
    let now_ms = chrono::Utc::now().timestamp_millis();
    sqlx::query(
        r#"
        INSERT INTO contests (id, home, away, start_time_ms, league, status, score_json, storyline_json, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            home = excluded.home,
            away = excluded.away,
            start_time_ms = excluded.start_time_ms,
            league = excluded.league,
            status = excluded.status,
            score_json = excluded.score_json,
            storyline_json = excluded.storyline_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&row.id)
    .bind(&row.home)
    .bind(&row.away)
    .bind(row.start_time_ms)
    .bind(&row.league)
    .bind(&row.status)
    .bind(&row.score_json)
    .bind(&row.storyline_json)
    .bind(now_ms)
    .execute(pool)
    .await?;
    Ok(())
}

/// Append a batch in one transaction. Rows already present (same contest and
/// timestamp) are left untouched.
pub async fn write_samples(pool: &sqlx::SqlitePool, contest_id: &str, samples: &[OddsSample]) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for s in samples {
        let row = SampleRow::from_sample(contest_id, s);
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO samples (
                contest_id, ts_ms, spread, moneyline, total, sharp_action, public_action, note
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.contest_id)
        .bind(row.ts_ms)
        .bind(row.spread)
        .bind(row.moneyline)
        .bind(row.total)
        .bind(&row.sharp_action)
        .bind(row.public_action)
        .bind(&row.note)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
