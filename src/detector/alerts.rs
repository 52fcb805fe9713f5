use serde::{Deserialize, Serialize};

use crate::detector::movement::Movement;
use crate::types::{Contest, ContestStatus, MarketField};

pub const DEFAULT_LINE_MOVEMENT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    LineMovement,
    ScoreChange,
    GameStart,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertKind::LineMovement => "line-movement",
            AlertKind::ScoreChange => "score-change",
            AlertKind::GameStart => "game-start",
        };
        write!(f, "{s}")
    }
}

/// Per-contest alert preferences. All alerts start disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSettings {
    pub line_movement: bool,
    pub line_movement_threshold: f64,
    pub score_change: bool,
    pub game_start: bool,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            line_movement: false,
            line_movement_threshold: DEFAULT_LINE_MOVEMENT_THRESHOLD,
            score_change: false,
            game_start: false,
        }
    }
}

impl AlertSettings {
    pub fn is_enabled(&self, kind: AlertKind) -> bool {
        match kind {
            AlertKind::LineMovement => self.line_movement,
            AlertKind::ScoreChange => self.score_change,
            AlertKind::GameStart => self.game_start,
        }
    }

    pub fn toggle(&mut self, kind: AlertKind) {
        let flag = match kind {
            AlertKind::LineMovement => &mut self.line_movement,
            AlertKind::ScoreChange => &mut self.score_change,
            AlertKind::GameStart => &mut self.game_start,
        };
        *flag = !*flag;
    }

    /// Non-finite or negative thresholds are ignored.
    pub fn set_threshold(&mut self, threshold: f64) {
        if threshold.is_finite() && threshold >= 0.0 {
            self.line_movement_threshold = threshold;
        }
    }

    pub fn has_active(&self) -> bool {
        self.line_movement || self.score_change || self.game_start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub contest_id: String,
    pub kind: AlertKind,
    pub message: String,
}

/// Fires when a market's classified move reaches the threshold. `prev` is the
/// earlier snapshot of the same market, if any: a move that was already past
/// the threshold in the same direction does not fire again.
pub fn check_line_movement(
    contest_id: &str,
    prev: Option<&Movement>,
    cur: &Movement,
    settings: &AlertSettings,
) -> Option<Alert> {
    if !settings.line_movement || !crosses(cur, settings.line_movement_threshold) {
        return None;
    }
    if let Some(prev) = prev {
        if crosses(prev, settings.line_movement_threshold) && prev.direction == cur.direction {
            return None;
        }
    }
    let moved = match cur.field {
        MarketField::Moneyline => format!("{:+.0}", cur.delta),
        MarketField::Spread | MarketField::Total => format!("{:+.1}", cur.delta),
    };
    Some(Alert {
        contest_id: contest_id.to_string(),
        kind: AlertKind::LineMovement,
        message: format!("{} moved {moved}", cur.field),
    })
}

fn crosses(movement: &Movement, threshold: f64) -> bool {
    movement.delta != 0.0 && movement.delta.abs() >= threshold
}

pub fn check_score_change(prev: &Contest, cur: &Contest, settings: &AlertSettings) -> Option<Alert> {
    if !settings.score_change || prev.score == cur.score {
        return None;
    }
    let score = cur.score.as_ref()?;
    Some(Alert {
        contest_id: cur.id.clone(),
        kind: AlertKind::ScoreChange,
        message: format!(
            "{} {} – {} {} ({})",
            cur.away, score.away, cur.home, score.home, score.clock
        ),
    })
}

pub fn check_game_start(prev: &Contest, cur: &Contest, settings: &AlertSettings) -> Option<Alert> {
    let started = prev.status == ContestStatus::Upcoming && cur.status == ContestStatus::Live;
    if !settings.game_start || !started {
        return None;
    }
    Some(Alert {
        contest_id: cur.id.clone(),
        kind: AlertKind::GameStart,
        message: format!("{} has started", cur.matchup()),
    })
}
