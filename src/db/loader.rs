use tracing::{info, warn};

use crate::db::models::{ContestRow, SampleRow};
use crate::error::Result;
use crate::state::MemoryStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub contests: usize,
    pub samples: usize,
    pub skipped: usize,
}

/// Rebuild the in-memory store from SQLite. Rows that no longer validate are
/// skipped and logged rather than failing startup.
pub async fn load_into(pool: &sqlx::SqlitePool, store: &MemoryStore) -> Result<LoadStats> {
    let mut stats = LoadStats::default();

    let contests: Vec<ContestRow> = sqlx::query_as(
        "SELECT id, home, away, start_time_ms, league, status, score_json, storyline_json
         FROM contests ORDER BY rowid",
    )
    .fetch_all(pool)
    .await?;

    for row in contests {
        let id = row.id.clone();
        match row.into_contest() {
            Ok(c) => {
                store.add_contest(c);
                stats.contests += 1;
            }
            Err(e) => {
                warn!(contest_id = %id, "[DB] skipping stored contest: {e}");
                stats.skipped += 1;
            }
        }
    }

    let samples: Vec<SampleRow> = sqlx::query_as(
        "SELECT contest_id, ts_ms, spread, moneyline, total, sharp_action, public_action, note
         FROM samples ORDER BY contest_id, ts_ms",
    )
    .fetch_all(pool)
    .await?;

    for row in samples {
        let contest_id = row.contest_id.clone();
        let appended = row
            .into_sample()
            .and_then(|s| store.append_sample(&contest_id, s));
        match appended {
            Ok(()) => stats.samples += 1,
            Err(e) => {
                warn!(contest_id = %contest_id, "[DB] skipping stored sample: {e}");
                stats.skipped += 1;
            }
        }
    }

    info!(
        contests = stats.contests,
        samples = stats.samples,
        skipped = stats.skipped,
        "[DB] store loaded"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::writer::{write_contest, write_samples};
    use crate::ingest::{ingest_batch, RawSample};
    use crate::state::TimeSeriesStore;
    use crate::testutil::{contest, series_from};

    async fn memory_pool() -> sqlx::SqlitePool {
        crate::db::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn persisted_rows_reload_in_catalog_order() {
        let pool = memory_pool().await;
        write_contest(&pool, &contest("2", "Lakers", "Warriors", "NBA")).await.unwrap();
        write_contest(&pool, &contest("1", "Celtics", "Knicks", "NBA")).await.unwrap();
        // Re-writing keeps position.
        write_contest(&pool, &contest("2", "Lakers", "Warriors", "NBA")).await.unwrap();

        let series = series_from(&[(10, -5.5), (11, -5.0), (12, -6.0)]);
        write_samples(&pool, "1", &series).await.unwrap();
        write_samples(&pool, "1", &series[..1]).await.unwrap();

        let store = MemoryStore::new();
        let stats = load_into(&pool, &store).await.unwrap();
        assert_eq!(stats, LoadStats { contests: 2, samples: 3, skipped: 0 });

        let ids: Vec<_> = store
            .list_contests(&Default::default())
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(store.get_series("1", None).unwrap(), series);
    }

    #[tokio::test]
    async fn orphan_samples_are_skipped() {
        let pool = memory_pool().await;
        write_samples(&pool, "ghost", &series_from(&[(10, -5.5)])).await.unwrap();

        let store = MemoryStore::new();
        let stats = load_into(&pool, &store).await.unwrap();
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.skipped, 1);
    }

    #[tokio::test]
    async fn sub_millisecond_samples_reload_unchanged() {
        let pool = memory_pool().await;
        let c = contest("1", "Celtics", "Knicks", "NBA");
        write_contest(&pool, &c).await.unwrap();

        let live = MemoryStore::new();
        live.add_contest(c);
        let batch: Vec<RawSample> = serde_json::from_value(serde_json::json!([
            {"time": "2025-02-22T10:00:00.000100Z", "spread": -5.5, "moneyline": -180, "total": 224.5},
            {"time": "2025-02-22T10:00:00.000400Z", "spread": -6.0, "moneyline": -185, "total": 224.5},
            {"time": "2025-02-22T10:00:00.002700Z", "spread": -6.5, "moneyline": -190, "total": 224.0}
        ]))
        .unwrap();
        let (report, accepted) = ingest_batch(&live, "1", &batch);
        assert_eq!(report.accepted, 2);
        write_samples(&pool, "1", &accepted).await.unwrap();

        let restored = MemoryStore::new();
        let stats = load_into(&pool, &restored).await.unwrap();
        assert_eq!(stats.skipped, 0);
        assert_eq!(restored.get_series("1", None).unwrap(), live.get_series("1", None).unwrap());
    }
}
