//! Movement classification. Every screen, the API and the search filter go
//! through these functions so a contest never shows two different buckets.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::config::movement_thresholds;
use crate::types::{Direction, MarketField, MovementBucket, OddsSample};

/// Absolute-delta cut-offs for one market. `medium <= high` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementThresholds {
    medium: f64,
    high: f64,
}

impl MovementThresholds {
    pub fn new(medium: f64, high: f64) -> Option<Self> {
        if medium.is_finite() && high.is_finite() && 0.0 <= medium && medium <= high {
            Some(Self { medium, high })
        } else {
            None
        }
    }

    pub fn medium(&self) -> f64 {
        self.medium
    }

    pub fn high(&self) -> f64 {
        self.high
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub spread: MovementThresholds,
    pub moneyline: MovementThresholds,
    pub total: MovementThresholds,
}

impl ThresholdTable {
    pub fn for_field(&self, field: MarketField) -> MovementThresholds {
        match field {
            MarketField::Spread => self.spread,
            MarketField::Moneyline => self.moneyline,
            MarketField::Total => self.total,
        }
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        use movement_thresholds::*;
        let pair = |(medium, high): (f64, f64)| MovementThresholds { medium, high };
        Self {
            spread: pair(SPREAD),
            moneyline: pair(MONEYLINE),
            total: pair(TOTAL),
        }
    }
}

/// Everything needed to classify a series; cheap to copy into views and handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementModel {
    pub thresholds: ThresholdTable,
    /// Trailing window ending at the last sample. `None` = whole series.
    pub window: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub field: MarketField,
    pub bucket: MovementBucket,
    /// `last - first` inside the window.
    pub delta: f64,
    pub direction: Direction,
}

impl MovementModel {
    pub fn new(thresholds: ThresholdTable, window: Option<Duration>) -> Self {
        Self { thresholds, window }
    }

    pub fn classify(&self, series: &[OddsSample], field: MarketField) -> Movement {
        let delta = window_delta(series, field, self.window);
        Movement {
            field,
            bucket: classify_delta(delta, self.thresholds.for_field(field)),
            delta,
            direction: direction_of(delta),
        }
    }

    /// Contest-level bucket, taken from the primary market.
    pub fn contest_bucket(&self, series: &[OddsSample]) -> MovementBucket {
        self.classify(series, MarketField::PRIMARY).bucket
    }
}

/// Bucket an absolute move. Boundaries are inclusive: `|delta| == high` is high.
pub fn classify_delta(delta: f64, thresholds: MovementThresholds) -> MovementBucket {
    let magnitude = delta.abs();
    if magnitude >= thresholds.high {
        MovementBucket::High
    } else if magnitude >= thresholds.medium {
        MovementBucket::Medium
    } else {
        MovementBucket::Low
    }
}

pub fn classify_series(
    series: &[OddsSample],
    field: MarketField,
    thresholds: MovementThresholds,
    window: Option<Duration>,
) -> MovementBucket {
    classify_delta(window_delta(series, field, window), thresholds)
}

pub fn direction(series: &[OddsSample], field: MarketField) -> Direction {
    direction_of(window_delta(series, field, None))
}

fn direction_of(delta: f64) -> Direction {
    if delta > 0.0 {
        Direction::Up
    } else if delta < 0.0 {
        Direction::Down
    } else {
        Direction::Flat
    }
}

/// `last - first`, where first is the earliest sample no older than `window`
/// before the last one. Fewer than two samples in range → 0.
fn window_delta(series: &[OddsSample], field: MarketField, window: Option<Duration>) -> f64 {
    let Some(last) = series.last() else {
        return 0.0;
    };
    let first = match window {
        // A window reaching past the representable range covers the whole series.
        Some(w) => match last.timestamp.checked_sub_signed(w) {
            // Series is ascending, so the first match is the earliest in-window sample.
            Some(cutoff) => series.iter().find(|s| s.timestamp >= cutoff).unwrap_or(last),
            None => &series[0],
        },
        None => &series[0],
    };
    last.value(field) - first.value(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(hour: u32, spread: f64, moneyline: i32) -> OddsSample {
        OddsSample {
            timestamp: Utc.with_ymd_and_hms(2025, 2, 22, hour, 0, 0).unwrap(),
            spread,
            moneyline,
            total: 224.5,
            sharp_action: None,
            public_action: None,
            note: None,
        }
    }

    fn spread_thresholds() -> MovementThresholds {
        MovementThresholds::new(0.25, 0.4).unwrap()
    }

    #[test]
    fn scenario_half_point_move_is_high() {
        let series = vec![sample(10, -5.5, -180), sample(11, -5.0, -175), sample(12, -6.0, -190)];
        let bucket = classify_series(&series, MarketField::Spread, spread_thresholds(), None);
        assert_eq!(bucket, MovementBucket::High);
    }

    #[test]
    fn boundaries_are_inclusive() {
        let t = spread_thresholds();
        assert_eq!(classify_delta(0.4, t), MovementBucket::High);
        assert_eq!(classify_delta(-0.25, t), MovementBucket::Medium);
        assert_eq!(classify_delta(0.2, t), MovementBucket::Low);
    }

    #[test]
    fn short_series_is_low() {
        let t = spread_thresholds();
        assert_eq!(classify_series(&[], MarketField::Spread, t, None), MovementBucket::Low);
        assert_eq!(
            classify_series(&[sample(10, -5.5, -180)], MarketField::Spread, t, None),
            MovementBucket::Low
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let series = vec![sample(10, -5.5, -180), sample(12, -5.0, -190)];
        let model = MovementModel::default();
        let first = model.classify(&series, MarketField::Moneyline);
        for _ in 0..10 {
            assert_eq!(model.classify(&series, MarketField::Moneyline), first);
        }
    }

    #[test]
    fn moneyline_uses_its_own_thresholds() {
        let series = vec![sample(10, -5.5, -180), sample(12, -5.5, -195)];
        let model = MovementModel::default();
        let m = model.classify(&series, MarketField::Moneyline);
        assert_eq!(m.bucket, MovementBucket::Medium);
        assert_eq!(m.direction, Direction::Down);
        assert_eq!(model.contest_bucket(&series), MovementBucket::Low);
    }

    #[test]
    fn trailing_window_ignores_older_samples() {
        let series = vec![sample(10, -3.0, -180), sample(11, -5.5, -180), sample(12, -5.6, -180)];
        let whole = classify_series(&series, MarketField::Spread, spread_thresholds(), None);
        let recent = classify_series(
            &series,
            MarketField::Spread,
            spread_thresholds(),
            Some(Duration::minutes(90)),
        );
        assert_eq!(whole, MovementBucket::High);
        assert_eq!(recent, MovementBucket::Low);
    }

    #[test]
    fn oversized_window_covers_whole_series() {
        let series = vec![sample(10, -3.0, -180), sample(11, -5.5, -180), sample(12, -5.6, -180)];
        let model = MovementModel::new(
            ThresholdTable::default(),
            Some(Duration::minutes(1_000_000_000_000)),
        );
        let m = model.classify(&series, MarketField::Spread);
        assert_eq!(m.bucket, MovementBucket::High);
        assert!((m.delta - -2.6).abs() < 1e-9);
    }

    #[test]
    fn invalid_thresholds_rejected() {
        assert!(MovementThresholds::new(0.5, 0.4).is_none());
        assert!(MovementThresholds::new(-1.0, 0.4).is_none());
        assert!(MovementThresholds::new(f64::NAN, 0.4).is_none());
    }
}
