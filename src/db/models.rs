//! Row types for the schema in migrations/0001_init.sql, and conversions to
//! the domain types.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{AppError, Result};
use crate::types::{Contest, ContestStatus, OddsSample, Score, SharpAction, Storyline};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContestRow {
    pub id: String,
    pub home: String,
    pub away: String,
    pub start_time_ms: i64,
    pub league: String,
    pub status: String,
    pub score_json: Option<String>,
    pub storyline_json: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SampleRow {
    pub contest_id: String,
    pub ts_ms: i64,
    pub spread: f64,
    pub moneyline: i64,
    pub total: f64,
    pub sharp_action: Option<String>,
    pub public_action: Option<i64>,
    pub note: Option<String>,
}

fn from_ms(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| AppError::InvalidSample(format!("timestamp out of range: {ms}")))
}

impl ContestRow {
    pub fn from_contest(c: &Contest) -> Result<Self> {
        Ok(Self {
            id: c.id.clone(),
            home: c.home.clone(),
            away: c.away.clone(),
            start_time_ms: c.start_time.timestamp_millis(),
            league: c.league.clone(),
            status: c.status.to_string(),
            score_json: c.score.as_ref().map(serde_json::to_string).transpose()?,
            storyline_json: c.storyline.as_ref().map(serde_json::to_string).transpose()?,
        })
    }

    pub fn into_contest(self) -> Result<Contest> {
        let score: Option<Score> = self.score_json.as_deref().map(serde_json::from_str).transpose()?;
        let storyline: Option<Storyline> =
            self.storyline_json.as_deref().map(serde_json::from_str).transpose()?;
        Ok(Contest {
            id: self.id,
            home: self.home,
            away: self.away,
            start_time: from_ms(self.start_time_ms)?,
            league: self.league,
            status: self.status.parse::<ContestStatus>()?,
            score,
            storyline,
        })
    }
}

impl SampleRow {
    pub fn from_sample(contest_id: &str, s: &OddsSample) -> Self {
        Self {
            contest_id: contest_id.to_string(),
            ts_ms: s.timestamp.timestamp_millis(),
            spread: s.spread,
            moneyline: i64::from(s.moneyline),
            total: s.total,
            sharp_action: s.sharp_action.map(|a| a.to_string()),
            public_action: s.public_action.map(i64::from),
            note: s.note.clone(),
        }
    }

    /// Rows are re-validated on the way in: the table is not trusted to only
    /// hold values the ingest path would accept.
    pub fn into_sample(self) -> Result<OddsSample> {
        if !self.spread.is_finite() || !self.total.is_finite() {
            return Err(AppError::InvalidSample(format!(
                "non-finite value stored for {} at {}",
                self.contest_id, self.ts_ms
            )));
        }
        let moneyline = i32::try_from(self.moneyline)
            .map_err(|_| AppError::InvalidSample(format!("moneyline out of range: {}", self.moneyline)))?;
        let public_action = self
            .public_action
            .map(|p| u8::try_from(p).ok().filter(|p| *p <= 100))
            .map(|p| p.ok_or_else(|| AppError::InvalidSample("public_action out of range".to_string())))
            .transpose()?;
        Ok(OddsSample {
            timestamp: from_ms(self.ts_ms)?,
            spread: self.spread,
            moneyline,
            total: self.total,
            sharp_action: self.sharp_action.as_deref().map(str::parse::<SharpAction>).transpose()?,
            public_action,
            note: self.note,
        })
    }
}
