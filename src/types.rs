use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Contest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    pub id: String,
    pub home: String,
    pub away: String,
    pub start_time: DateTime<Utc>,
    /// Free-text league tag ("NBA", "nfl", ...). Compared case-insensitively.
    pub league: String,
    #[serde(default)]
    pub status: ContestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storyline: Option<Storyline>,
}

impl Contest {
    pub fn new(
        id: impl Into<String>,
        home: impl Into<String>,
        away: impl Into<String>,
        start_time: DateTime<Utc>,
        league: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            home: home.into(),
            away: away.into(),
            start_time,
            league: league.into(),
            status: ContestStatus::Upcoming,
            score: None,
            storyline: None,
        }
    }

    pub fn matchup(&self) -> String {
        format!("{} vs {}", self.away, self.home)
    }

    /// League tags compare case-insensitively under Unicode lowercasing, the
    /// same folding team-name search uses.
    pub fn in_league(&self, league: &str) -> bool {
        self.league.trim().to_lowercase() == league.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    #[default]
    Upcoming,
    Live,
    Final,
}

impl std::fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContestStatus::Upcoming => "upcoming",
            ContestStatus::Live => "live",
            ContestStatus::Final => "final",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ContestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(ContestStatus::Upcoming),
            "live" => Ok(ContestStatus::Live),
            "final" => Ok(ContestStatus::Final),
            other => Err(AppError::BadRequest(format!("unknown contest status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
    /// Game clock as reported by the feed, e.g. "Q3 4:20".
    pub clock: String,
}

// ---------------------------------------------------------------------------
// Storyline: static narrative attached to a contest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storyline {
    pub narrative: String,
    pub sentiment: Sentiment,
    /// 0–100.
    pub confidence: u8,
    #[serde(default)]
    pub key_events: Vec<KeyEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Display label for when it happened ("7:45 PM").
    pub at: String,
    pub event: String,
    /// Signed impact, -3..=3.
    pub impact: i8,
}

// ---------------------------------------------------------------------------
// Odds samples
// ---------------------------------------------------------------------------

/// One point-in-time observation of the three markets for a contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsSample {
    pub timestamp: DateTime<Utc>,
    pub spread: f64,
    /// American-odds convention.
    pub moneyline: i32,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharp_action: Option<SharpAction>,
    /// Public betting percentage, 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_action: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OddsSample {
    pub fn value(&self, field: MarketField) -> f64 {
        match field {
            MarketField::Spread => self.spread,
            MarketField::Moneyline => f64::from(self.moneyline),
            MarketField::Total => self.total,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketField {
    #[default]
    Spread,
    Moneyline,
    Total,
}

impl MarketField {
    pub const ALL: [MarketField; 3] = [MarketField::Spread, MarketField::Moneyline, MarketField::Total];

    /// The market used when a single contest-level movement bucket is needed.
    pub const PRIMARY: MarketField = MarketField::Spread;

    pub fn label(self) -> &'static str {
        match self {
            MarketField::Spread => "Spread",
            MarketField::Moneyline => "ML",
            MarketField::Total => "Total",
        }
    }

    /// Format a value the way the market is quoted.
    pub fn format_value(self, value: f64) -> String {
        match self {
            MarketField::Moneyline => {
                let v = value.round() as i64;
                if v > 0 {
                    format!("+{v}")
                } else {
                    v.to_string()
                }
            }
            MarketField::Spread => {
                if value > 0.0 {
                    format!("+{value:.1}")
                } else {
                    format!("{value:.1}")
                }
            }
            MarketField::Total => format!("{value:.1}"),
        }
    }
}

impl std::fmt::Display for MarketField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketField::Spread => "spread",
            MarketField::Moneyline => "moneyline",
            MarketField::Total => "total",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MarketField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spread" => Ok(MarketField::Spread),
            "moneyline" | "ml" => Ok(MarketField::Moneyline),
            "total" => Ok(MarketField::Total),
            other => Err(AppError::BadRequest(format!("unknown market field: {other}"))),
        }
    }
}

/// Betting volume attributed to professional bettors, bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharpAction {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for SharpAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SharpAction::Low => "low",
            SharpAction::Medium => "medium",
            SharpAction::High => "high",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SharpAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(SharpAction::Low),
            "medium" => Ok(SharpAction::Medium),
            "high" => Ok(SharpAction::High),
            other => Err(AppError::InvalidSample(format!("unknown sharp action: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Movement classification
// ---------------------------------------------------------------------------

/// Coarse size of a market move over a trailing window. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementBucket {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for MovementBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MovementBucket::Low => "low",
            MovementBucket::Medium => "medium",
            MovementBucket::High => "high",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MovementBucket {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(MovementBucket::Low),
            "medium" => Ok(MovementBucket::Medium),
            "high" => Ok(MovementBucket::High),
            other => Err(AppError::BadRequest(format!("unknown movement bucket: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Flat => "flat",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Store queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContestQuery {
    pub league: Option<String>,
    pub status: Option<ContestStatus>,
}

/// Inclusive time range for series queries. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn market_field_parses_wire_names() {
        assert_eq!("spread".parse::<MarketField>().unwrap(), MarketField::Spread);
        assert_eq!("ML".parse::<MarketField>().unwrap(), MarketField::Moneyline);
        assert_eq!(" Total ".parse::<MarketField>().unwrap(), MarketField::Total);
        assert!("prop".parse::<MarketField>().is_err());
    }

    #[test]
    fn format_value_follows_market_convention() {
        assert_eq!(MarketField::Moneyline.format_value(135.0), "+135");
        assert_eq!(MarketField::Moneyline.format_value(-180.0), "-180");
        assert_eq!(MarketField::Spread.format_value(-5.5), "-5.5");
        assert_eq!(MarketField::Spread.format_value(2.5), "+2.5");
        assert_eq!(MarketField::Total.format_value(224.5), "224.5");
    }

    #[test]
    fn time_range_is_inclusive() {
        let t = |h| Utc.with_ymd_and_hms(2025, 2, 22, h, 0, 0).unwrap();
        let range = TimeRange { from: Some(t(14)), to: Some(t(16)) };
        assert!(range.contains(t(14)));
        assert!(range.contains(t(16)));
        assert!(!range.contains(t(17)));
        assert!(TimeRange::default().contains(t(3)));
    }

    #[test]
    fn optional_sample_fields_are_omitted_when_absent() {
        let sample = OddsSample {
            timestamp: Utc.with_ymd_and_hms(2025, 2, 22, 14, 0, 0).unwrap(),
            spread: -5.5,
            moneyline: -180,
            total: 224.5,
            sharp_action: None,
            public_action: None,
            note: None,
        };
        let json = serde_json::to_value(&sample).unwrap();
        assert!(json.get("sharp_action").is_none());
        assert!(json.get("public_action").is_none());
        assert!(json.get("note").is_none());
    }
}
