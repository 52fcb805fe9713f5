use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{AppError, Result};
use crate::types::{Contest, ContestQuery, OddsSample, TimeRange};

// ---------------------------------------------------------------------------
// TimeSeriesStore: the read contract every view and handler depends on
// ---------------------------------------------------------------------------

pub trait TimeSeriesStore: Send + Sync {
    /// Contests in catalog order, narrowed by the optional query fields.
    fn list_contests(&self, query: &ContestQuery) -> Vec<Contest>;

    fn get_contest(&self, contest_id: &str) -> Option<Contest>;

    /// Samples ascending by timestamp. A known contest with no observations yields
    /// an empty vec; an unknown contest is `NotFound`.
    fn get_series(&self, contest_id: &str, range: Option<TimeRange>) -> Result<Vec<OddsSample>>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CatalogEntry {
    /// Insertion sequence; listing sorts on this to keep catalog order.
    seq: u64,
    contest: Contest,
}

pub struct MemoryStore {
    /// contest_id → contest metadata
    contests: DashMap<String, CatalogEntry>,
    /// contest_id → samples, strictly ascending by timestamp
    series: DashMap<String, Vec<OddsSample>>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Insert or replace contest metadata. Replacing keeps the original catalog
    /// position and the recorded series.
    pub fn add_contest(&self, contest: Contest) {
        let id = contest.id.clone();
        match self.contests.get_mut(&id) {
            Some(mut entry) => entry.contest = contest,
            None => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                self.contests.insert(id.clone(), CatalogEntry { seq, contest });
            }
        }
        self.series.entry(id).or_default();
    }

    pub fn add_contests(&self, contests: Vec<Contest>) {
        for contest in contests {
            self.add_contest(contest);
        }
    }

    pub fn contains(&self, contest_id: &str) -> bool {
        self.contests.contains_key(contest_id)
    }

    /// Append a new observation. The timestamp must be strictly after the
    /// current last sample; earlier or equal timestamps are rejected untouched.
    pub fn append_sample(&self, contest_id: &str, sample: OddsSample) -> Result<()> {
        if !self.contests.contains_key(contest_id) {
            return Err(AppError::NotFound(format!("contest {contest_id}")));
        }
        let mut series = self.series.entry(contest_id.to_string()).or_default();
        if let Some(last) = series.last() {
            if sample.timestamp <= last.timestamp {
                return Err(AppError::OutOfOrder {
                    contest_id: contest_id.to_string(),
                    timestamp: sample.timestamp.to_rfc3339(),
                    last: last.timestamp.to_rfc3339(),
                });
            }
        }
        series.push(sample);
        Ok(())
    }

    pub fn latest_sample(&self, contest_id: &str) -> Option<OddsSample> {
        self.series.get(contest_id)?.last().cloned()
    }

    pub fn contest_count(&self) -> usize {
        self.contests.len()
    }

    pub fn sample_count(&self) -> usize {
        self.series.iter().map(|e| e.value().len()).sum()
    }

    pub fn all_contest_ids(&self) -> Vec<String> {
        self.list_contests(&ContestQuery::default())
            .into_iter()
            .map(|c| c.id)
            .collect()
    }
}

impl TimeSeriesStore for MemoryStore {
    fn list_contests(&self, query: &ContestQuery) -> Vec<Contest> {
        let mut entries: Vec<CatalogEntry> = self
            .contests
            .iter()
            .filter(|e| {
                let c = &e.value().contest;
                query
                    .league
                    .as_ref()
                    .map_or(true, |l| c.in_league(l))
                    && query.status.map_or(true, |s| c.status == s)
            })
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.contest).collect()
    }

    fn get_contest(&self, contest_id: &str) -> Option<Contest> {
        self.contests.get(contest_id).map(|e| e.contest.clone())
    }

    fn get_series(&self, contest_id: &str, range: Option<TimeRange>) -> Result<Vec<OddsSample>> {
        if !self.contests.contains_key(contest_id) {
            return Err(AppError::NotFound(format!("contest {contest_id}")));
        }
        let Some(series) = self.series.get(contest_id) else {
            return Ok(Vec::new());
        };
        Ok(match range {
            Some(r) => series
                .value()
                .iter()
                .filter(|s| r.contains(s.timestamp))
                .cloned()
                .collect(),
            None => series.value().clone(),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            contests: DashMap::new(),
            series: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContestStatus;
    use chrono::{TimeZone, Utc};

    fn contest(id: &str, home: &str, away: &str, league: &str) -> Contest {
        Contest::new(id, home, away, Utc.with_ymd_and_hms(2025, 2, 23, 0, 30, 0).unwrap(), league)
    }

    fn sample(hour: u32, spread: f64) -> OddsSample {
        OddsSample {
            timestamp: Utc.with_ymd_and_hms(2025, 2, 22, hour, 0, 0).unwrap(),
            spread,
            moneyline: -180,
            total: 224.5,
            sharp_action: None,
            public_action: None,
            note: None,
        }
    }

    #[test]
    fn listing_keeps_catalog_order() {
        let store = MemoryStore::new();
        store.add_contest(contest("z", "Lakers", "Warriors", "NBA"));
        store.add_contest(contest("a", "Celtics", "Knicks", "NBA"));
        store.add_contest(contest("m", "Chiefs", "Bills", "NFL"));

        let ids: Vec<String> = store
            .list_contests(&ContestQuery::default())
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["z", "a", "m"]);

        let nba = store.list_contests(&ContestQuery { league: Some("nba".into()), status: None });
        assert_eq!(nba.len(), 2);
    }

    #[test]
    fn replacing_contest_keeps_position_and_series() {
        let store = MemoryStore::new();
        store.add_contest(contest("1", "Celtics", "Knicks", "NBA"));
        store.add_contest(contest("2", "Lakers", "Warriors", "NBA"));
        store.append_sample("1", sample(10, -5.5)).unwrap();

        let mut live = contest("1", "Celtics", "Knicks", "NBA");
        live.status = ContestStatus::Live;
        store.add_contest(live);

        let listed = store.list_contests(&ContestQuery::default());
        assert_eq!(listed[0].id, "1");
        assert_eq!(listed[0].status, ContestStatus::Live);
        assert_eq!(store.get_series("1", None).unwrap().len(), 1);

        let live_only =
            store.list_contests(&ContestQuery { league: None, status: Some(ContestStatus::Live) });
        assert_eq!(live_only.len(), 1);
    }

    #[test]
    fn empty_series_is_not_an_error() {
        let store = MemoryStore::new();
        store.add_contest(contest("1", "Celtics", "Knicks", "NBA"));
        assert!(store.get_series("1", None).unwrap().is_empty());
        assert!(store.latest_sample("1").is_none());
    }

    #[test]
    fn unknown_contest_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.get_series("nope", None), Err(AppError::NotFound(_))));
        assert!(matches!(store.append_sample("nope", sample(10, -5.5)), Err(AppError::NotFound(_))));
    }

    #[test]
    fn out_of_order_and_duplicate_timestamps_rejected() {
        let store = MemoryStore::new();
        store.add_contest(contest("1", "Celtics", "Knicks", "NBA"));
        store.append_sample("1", sample(11, -5.5)).unwrap();

        assert!(matches!(
            store.append_sample("1", sample(11, -6.0)),
            Err(AppError::OutOfOrder { .. })
        ));
        assert!(matches!(
            store.append_sample("1", sample(10, -6.0)),
            Err(AppError::OutOfOrder { .. })
        ));
        store.append_sample("1", sample(12, -6.0)).unwrap();

        let series = store.get_series("1", None).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(store.sample_count(), 2);
    }

    #[test]
    fn range_query_is_inclusive() {
        let store = MemoryStore::new();
        store.add_contest(contest("1", "Celtics", "Knicks", "NBA"));
        for (h, s) in [(14, -5.5), (15, -5.0), (16, -5.5), (17, -6.0)] {
            store.append_sample("1", sample(h, s)).unwrap();
        }
        let range = TimeRange {
            from: Some(Utc.with_ymd_and_hms(2025, 2, 22, 15, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2025, 2, 22, 16, 0, 0).unwrap()),
        };
        let slice = store.get_series("1", Some(range)).unwrap();
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].spread, -5.0);
    }
}
