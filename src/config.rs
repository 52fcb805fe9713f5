use crate::detector::movement::{MovementThresholds, ThresholdTable};
use crate::error::{AppError, Result};

pub const API_PORT: u16 = 3000;

/// Channel capacity for samples handed from ingestion to the DB writer.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Vertical padding (in market units) added below the minimum and above the maximum
/// so extreme points never sit on the chart edge.
pub const Y_PAD: f64 = 1.0;

/// Half-width of the time domain used when every sample shares one timestamp.
pub const X_DOMAIN_EPSILON_MS: i64 = 60_000;

/// Number of ticks requested per axis.
pub const AXIS_TICKS: usize = 5;

/// Pointer distance (px) within which a marker counts as hovered.
pub const HIT_RADIUS: f64 = 12.0;

/// Search input is recomputed at most once per this interval while typing.
pub const SEARCH_DEBOUNCE_MS: u64 = 250;

/// Playback of a series lasts this long per sample.
pub const ANIMATION_MS_PER_SAMPLE: u64 = 1_000;

/// Chart margins in pixels.
pub mod margins {
    pub const TOP: f64 = 20.0;
    pub const RIGHT: f64 = 30.0;
    pub const BOTTOM: f64 = 30.0;
    pub const LEFT: f64 = 60.0;
}

/// Default movement thresholds per market, as `(medium, high)` absolute deltas.
pub mod movement_thresholds {
    pub const SPREAD: (f64, f64) = (0.25, 0.4);
    pub const TOTAL: (f64, f64) = (0.5, 1.0);
    pub const MONEYLINE: (f64, f64) = (10.0, 20.0);
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// JSON fixture catalog loaded at startup (SEED_PATH). Skipped when unset.
    pub seed_path: Option<String>,
    /// Trailing window for movement classification (MOVEMENT_WINDOW_MINUTES).
    /// Unset means the whole series.
    pub movement_window: Option<chrono::Duration>,
    pub thresholds: ThresholdTable,
}

/// Longest accepted MOVEMENT_WINDOW_MINUTES: one year.
pub const MAX_MOVEMENT_WINDOW_MINUTES: i64 = 366 * 24 * 60;

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `get`.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        use movement_thresholds::*;

        Ok(Self {
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            db_path: get("DB_PATH").unwrap_or_else(|| "oddsboard.db".to_string()),
            api_port: get("API_PORT")
                .unwrap_or_else(|| API_PORT.to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            seed_path: get("SEED_PATH").filter(|s| !s.trim().is_empty()),
            movement_window: movement_window(get("MOVEMENT_WINDOW_MINUTES"))?,
            thresholds: ThresholdTable {
                spread: thresholds_from(&get, "SPREAD", SPREAD)?,
                moneyline: thresholds_from(&get, "MONEYLINE", MONEYLINE)?,
                total: thresholds_from(&get, "TOTAL", TOTAL)?,
            },
        })
    }
}

fn movement_window(raw: Option<String>) -> Result<Option<chrono::Duration>> {
    let Some(raw) = raw.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let minutes = raw.trim().parse::<i64>().map_err(|_| {
        AppError::Config("MOVEMENT_WINDOW_MINUTES must be a whole number".to_string())
    })?;
    if !(1..=MAX_MOVEMENT_WINDOW_MINUTES).contains(&minutes) {
        return Err(AppError::Config(format!(
            "MOVEMENT_WINDOW_MINUTES must be between 1 and {MAX_MOVEMENT_WINDOW_MINUTES}"
        )));
    }
    Ok(Some(chrono::Duration::minutes(minutes)))
}

/// Reads `<PREFIX>_MEDIUM` / `<PREFIX>_HIGH`, falling back to the defaults.
fn thresholds_from<F>(get: &F, prefix: &str, default: (f64, f64)) -> Result<MovementThresholds>
where
    F: Fn(&str) -> Option<String>,
{
    let medium = number_or(get, &format!("{prefix}_MEDIUM"), default.0)?;
    let high = number_or(get, &format!("{prefix}_HIGH"), default.1)?;
    MovementThresholds::new(medium, high)
        .ok_or_else(|| AppError::Config(format!("{prefix} thresholds need 0 <= medium <= high")))
}

fn number_or<F>(get: &F, name: &str, default: f64) -> Result<f64>
where
    F: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(v) => v
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(|| AppError::Config(format!("{name} must be a number"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.api_port, API_PORT);
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.seed_path.is_none());
        assert!(cfg.movement_window.is_none());
        assert_eq!(cfg.thresholds, ThresholdTable::default());
    }

    #[test]
    fn threshold_overrides_apply_per_market() {
        let cfg = config(&[("SPREAD_MEDIUM", "0.5"), ("SPREAD_HIGH", " 1.5 ")]).unwrap();
        assert_eq!(cfg.thresholds.spread.medium(), 0.5);
        assert_eq!(cfg.thresholds.spread.high(), 1.5);
        assert_eq!(cfg.thresholds.total, ThresholdTable::default().total);
    }

    #[test]
    fn medium_above_high_is_rejected() {
        let err = config(&[("TOTAL_MEDIUM", "3"), ("TOTAL_HIGH", "2")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(matches!(config(&[("MONEYLINE_HIGH", "NaN")]), Err(AppError::Config(_))));
    }

    #[test]
    fn window_must_be_positive_and_bounded() {
        let cfg = config(&[("MOVEMENT_WINDOW_MINUTES", "90")]).unwrap();
        assert_eq!(cfg.movement_window, Some(chrono::Duration::minutes(90)));
        assert!(config(&[("MOVEMENT_WINDOW_MINUTES", "")]).unwrap().movement_window.is_none());

        for bad in ["0", "-5", "1.5", "1000000000000", "200000000000000000"] {
            assert!(
                matches!(config(&[("MOVEMENT_WINDOW_MINUTES", bad)]), Err(AppError::Config(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(matches!(config(&[("API_PORT", "70000")]), Err(AppError::Config(_))));
    }
}
