//! Deterministic fixtures for unit tests. Compiled only under `cfg(test)`.

use chrono::{Duration, TimeZone, Utc};

use crate::types::{Contest, OddsSample, SharpAction};

pub fn contest(id: &str, home: &str, away: &str, league: &str) -> Contest {
    Contest::new(id, home, away, Utc.with_ymd_and_hms(2025, 2, 23, 0, 30, 0).unwrap(), league)
}

/// Hourly samples on 2025-02-22 with the given `(hour, spread)` pairs.
pub fn series_from(points: &[(u32, f64)]) -> Vec<OddsSample> {
    points
        .iter()
        .map(|&(hour, spread)| OddsSample {
            timestamp: Utc.with_ymd_and_hms(2025, 2, 22, hour, 0, 0).unwrap(),
            spread,
            moneyline: -180,
            total: 224.5,
            sharp_action: None,
            public_action: None,
            note: None,
        })
        .collect()
}

/// `len` samples with strictly increasing timestamps and values wandering
/// around typical NBA lines. Same seed, same series.
pub fn synthetic_series(seed: u64, len: usize) -> Vec<OddsSample> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 33) as f64) / f64::from(u32::MAX >> 1)
    };

    let start = Utc.with_ymd_and_hms(2025, 2, 22, 12, 0, 0).unwrap();
    let mut ts = start;
    (0..len)
        .map(|i| {
            ts += Duration::minutes(5 + (next() * 55.0) as i64);
            let sharp = match i % 4 {
                0 => None,
                1 => Some(SharpAction::Low),
                2 => Some(SharpAction::Medium),
                _ => Some(SharpAction::High),
            };
            OddsSample {
                timestamp: ts,
                spread: -5.5 + ((next() * 4.0).round() - 2.0) * 0.5,
                moneyline: -180 + (next() * 40.0) as i32 - 20,
                total: 224.5 + ((next() * 8.0).round() - 4.0) * 0.5,
                sharp_action: sharp,
                public_action: Some((next() * 100.0) as u8),
                note: None,
            }
        })
        .collect()
}
