//! Shared health state for the /health endpoint.
//! Updated by the ingest handler and DbWriter.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Millisecond wall-clock time of the last accepted sample (0 = none).
    pub last_ingest_at_ms: AtomicI64,
    /// Samples accepted since startup, including seed and persisted ones.
    pub samples_ingested: AtomicU64,
    /// Batches handed to the DbWriter but not yet written.
    pub write_queue_pending: AtomicU64,
    /// Failed DB writes since startup.
    pub write_errors: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ingest(&self, accepted: usize, at_ms: i64) {
        if accepted == 0 {
            return;
        }
        self.samples_ingested.fetch_add(accepted as u64, Ordering::Relaxed);
        self.last_ingest_at_ms.store(at_ms, Ordering::Relaxed);
    }

    pub fn inc_write_queue_pending(&self) {
        self.write_queue_pending.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_write_queue_pending(&self) {
        // Saturate: a writer started before the state was shared may decrement first.
        let _ = self
            .write_queue_pending
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }

    pub fn inc_write_errors(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_ingest_at_ms(&self) -> i64 {
        self.last_ingest_at_ms.load(Ordering::Relaxed)
    }

    pub fn samples_ingested(&self) -> u64 {
        self.samples_ingested.load(Ordering::Relaxed)
    }

    pub fn write_queue_pending(&self) -> u64 {
        self.write_queue_pending.load(Ordering::Relaxed)
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }
}
