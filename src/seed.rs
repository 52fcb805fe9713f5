//! Fixture catalog loading. Samples go through the same validation as live
//! ingest, so a bad fixture record is rejected and logged like any other.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::ingest::{ingest_batch, IngestReport, RawSample};
use crate::state::MemoryStore;
use crate::types::{Contest, OddsSample};

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCatalog {
    pub contests: Vec<Contest>,
    /// Raw records keyed by contest id.
    #[serde(default)]
    pub samples: BTreeMap<String, Vec<RawSample>>,
}

/// What a seed run added, for the caller to persist.
#[derive(Debug, Default)]
pub struct SeedOutcome {
    pub contests: Vec<Contest>,
    pub samples: Vec<(String, Vec<OddsSample>)>,
    pub report: IngestReport,
}

pub fn parse_catalog(json: &str) -> Result<SeedCatalog> {
    Ok(serde_json::from_str(json)?)
}

pub async fn read_catalog(path: impl AsRef<Path>) -> Result<SeedCatalog> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_catalog(&raw)
}

/// Add fixture contests the store does not know yet, with their samples.
/// Contests already present (e.g. restored from the database) are left alone
/// so restarting never replays fixture data on top of persisted series.
pub fn apply(store: &MemoryStore, catalog: SeedCatalog) -> SeedOutcome {
    let mut outcome = SeedOutcome::default();
    let SeedCatalog { contests, mut samples } = catalog;

    for contest in contests {
        if store.contains(&contest.id) {
            samples.remove(&contest.id);
            continue;
        }
        store.add_contest(contest.clone());
        outcome.contests.push(contest);
    }

    for (contest_id, raws) in samples {
        if !outcome.contests.iter().any(|c| c.id == contest_id) {
            if !store.contains(&contest_id) {
                warn!(contest_id = %contest_id, "[SEED] samples for unknown contest skipped");
                outcome.report.rejected_unknown_contest += raws.len();
            }
            continue;
        }
        let (report, accepted) = ingest_batch(store, &contest_id, &raws);
        outcome.report.absorb(report);
        if !accepted.is_empty() {
            outcome.samples.push((contest_id, accepted));
        }
    }

    info!(
        contests = outcome.contests.len(),
        accepted = outcome.report.accepted,
        rejected = outcome.report.rejected(),
        "[SEED] catalog applied"
    );
    outcome
}
