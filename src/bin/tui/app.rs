use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use oddsboard::api::latency::LatencySummary;
use oddsboard::api::ContestSummary;
use oddsboard::chart::Viewport;
use oddsboard::detector::alerts::{self, Alert, AlertKind};
use oddsboard::state::prefs::{load_alerts, save_alerts};
use oddsboard::state::MemoryPrefs;
use oddsboard::types::{Contest, MarketField, MovementBucket, OddsSample};
use oddsboard::view::{Deferred, DetailView, Expired, ScoreboardView, SearchView};

/// Alerts kept on screen.
const MAX_ALERTS: usize = 8;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, serde::Deserialize, Default)]
pub struct HealthResponse {
    pub contests: usize,
    pub samples: usize,
    pub samples_ingested: u64,
    pub last_ingest_at_ms: Option<i64>,
    pub write_queue_pending: u64,
    pub write_errors: u64,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Scoreboard,
    Search,
    Detail,
    Analysis,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Screen::Scoreboard => "Scoreboard",
            Screen::Search => "Search",
            Screen::Detail => "Game",
            Screen::Analysis => "Analysis",
        }
    }
}

/// Result of a spawned series fetch, tagged with the contest it was for.
pub struct SeriesFetched {
    pub contest_id: String,
    pub result: Result<Vec<OddsSample>, String>,
}

pub struct AppState {
    pub status: ConnectionStatus,
    pub screen: Screen,
    pub contests: Vec<ContestSummary>,
    pub scoreboard: ScoreboardView<MemoryPrefs>,
    pub search: SearchView,
    pub detail: Option<DetailView>,
    pub alerts: Vec<Alert>,
    pub health: HealthResponse,
    pub latency: Option<LatencySummary>,
    /// Viewer's UTC offset, resolved once the terminal is up.
    pub tz: Deferred<FixedOffset>,
    pub scoreboard_selected: usize,
    pub search_selected: usize,
    pub last_refresh: Instant,
    pub base_url: String,
    detail_fetch: Option<JoinHandle<()>>,
    fetched_tx: mpsc::Sender<SeriesFetched>,
    expired_tx: mpsc::Sender<Expired>,
}

impl AppState {
    pub fn new(
        base_url: String,
        fetched_tx: mpsc::Sender<SeriesFetched>,
        expired_tx: mpsc::Sender<Expired>,
    ) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            screen: Screen::Scoreboard,
            contests: Vec::new(),
            scoreboard: ScoreboardView::new(MemoryPrefs::new()),
            search: SearchView::new(),
            detail: None,
            alerts: Vec::new(),
            health: HealthResponse::default(),
            latency: None,
            tz: Deferred::Pending,
            scoreboard_selected: 0,
            search_selected: 0,
            last_refresh: Instant::now(),
            base_url,
            detail_fetch: None,
            fetched_tx,
            expired_tx,
        }
    }

    /// Called after the first frame: the local zone is read only from here on.
    pub fn hydrate(&mut self) {
        self.tz.resolve_with(|| Local::now().offset().fix());
        let tz = self.tz.get().copied();
        if let (Some(tz), Some(detail)) = (tz, self.detail.as_mut()) {
            if let Some(c) = self.contests.iter().find(|c| c.contest.id == detail.contest_id()) {
                detail.start_label.resolve(format_local(c.contest.start_time, tz));
            }
        }
    }

    /// Local kick-off time, or a placeholder until hydrated.
    pub fn start_label(&self, start: DateTime<Utc>) -> String {
        match self.tz.get() {
            Some(tz) => format_local(start, *tz),
            None => "--:--".to_string(),
        }
    }

    pub fn catalog(&self) -> Vec<Contest> {
        self.contests.iter().map(|c| c.contest.clone()).collect()
    }

    pub fn summary(&self, contest_id: &str) -> Option<&ContestSummary> {
        self.contests.iter().find(|c| c.contest.id == contest_id)
    }

    pub fn scoreboard_rows(&self) -> Vec<&ContestSummary> {
        let catalog = self.catalog();
        let visible: Vec<String> = self
            .scoreboard
            .visible(&catalog)
            .into_iter()
            .map(|c| c.id.clone())
            .collect();
        visible.iter().filter_map(|id| self.summary(id)).collect()
    }

    /// Per-market movement as last reported by the service.
    fn movement_lookup(&self) -> HashMap<(String, MarketField), MovementBucket> {
        self.contests
            .iter()
            .flat_map(|c| c.markets.iter().map(|m| ((c.contest.id.clone(), m.field), m.bucket)))
            .collect()
    }

    pub fn refresh_search(&mut self, now: Instant) {
        let catalog = self.catalog();
        let lookup = self.movement_lookup();
        let changed = self.search.refresh(&catalog, now, |c, field| {
            lookup
                .get(&(c.id.clone(), field))
                .copied()
                .unwrap_or(MovementBucket::Low)
        });
        if changed {
            self.search_selected = self.search_selected.min(self.search.results().len().saturating_sub(1));
        }
    }

    // -----------------------------------------------------------------------
    // HTTP
    // -----------------------------------------------------------------------

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let contests_url = format!("{}/contests", self.base_url);
        let health_url = format!("{}/health", self.base_url);
        let latency_url = format!("{}/stats/latency", self.base_url);

        let (contests_res, health_res, latency_res) = tokio::join!(
            client.get(&contests_url).send(),
            client.get(&health_url).send(),
            client.get(&latency_url).send(),
        );

        let contests = match contests_res {
            Ok(resp) => resp.json::<Vec<ContestSummary>>().await,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };
        match contests {
            Ok(fresh) => {
                self.raise_contest_alerts(&fresh);
                self.contests = fresh;
                self.search.invalidate();
                self.status = ConnectionStatus::Connected;
                self.last_refresh = Instant::now();
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        }

        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthResponse>().await {
                self.health = health;
            }
        }
        if let Ok(l) = latency_res {
            if let Ok(latency) = l.json::<LatencySummary>().await {
                self.latency = Some(latency);
            }
        }
        debug!(contests = self.contests.len(), "[TUI] refreshed");
    }

    fn raise_contest_alerts(&mut self, fresh: &[ContestSummary]) {
        let prefs = self.scoreboard.favorites().store();
        let mut raised = Vec::new();
        for cur in fresh {
            let Some(prev) = self.summary(&cur.contest.id) else {
                continue;
            };
            let settings = load_alerts(prefs, &cur.contest.id);
            if !settings.has_active() {
                continue;
            }
            if let Some(line) = cur.market(MarketField::PRIMARY) {
                let before = prev.market(MarketField::PRIMARY);
                raised.extend(alerts::check_line_movement(&cur.contest.id, before, line, &settings));
            }
            raised.extend(alerts::check_score_change(&prev.contest, &cur.contest, &settings));
            raised.extend(alerts::check_game_start(&prev.contest, &cur.contest, &settings));
        }
        for alert in raised {
            self.push_alert(alert);
        }
    }

    fn push_alert(&mut self, alert: Alert) {
        info!(contest_id = %alert.contest_id, kind = %alert.kind, "[ALERT] {}", alert.message);
        self.alerts.insert(0, alert);
        self.alerts.truncate(MAX_ALERTS);
    }

    /// Open the detail screen for a contest. A fetch still running for a
    /// previous contest is aborted so its result can never land here.
    pub fn open_detail(&mut self, contest_id: &str, viewport: Viewport) {
        if let Some(handle) = self.detail_fetch.take() {
            handle.abort();
        }
        let mut detail = DetailView::new(contest_id, Vec::new(), viewport, self.expired_tx.clone());
        if let (Some(tz), Some(c)) = (self.tz.get(), self.summary(contest_id)) {
            detail.start_label.resolve(format_local(c.contest.start_time, *tz));
        }
        self.detail = Some(detail);
        self.screen = Screen::Detail;
        self.spawn_series_fetch(contest_id.to_string());
    }

    pub fn reload_detail(&mut self) {
        if let Some(id) = self.detail.as_ref().map(|d| d.contest_id().to_string()) {
            if let Some(handle) = self.detail_fetch.take() {
                handle.abort();
            }
            self.spawn_series_fetch(id);
        }
    }

    fn spawn_series_fetch(&mut self, contest_id: String) {
        let url = format!("{}/contests/{}/series", self.base_url, contest_id);
        let tx = self.fetched_tx.clone();
        self.detail_fetch = Some(tokio::spawn(async move {
            let result = match reqwest::get(&url).await {
                Ok(resp) if resp.status().is_success() => {
                    resp.json::<Vec<OddsSample>>().await.map_err(|e| e.to_string())
                }
                Ok(resp) => Err(format!("HTTP {}", resp.status())),
                Err(e) => Err(e.to_string()),
            };
            let _ = tx.send(SeriesFetched { contest_id, result }).await;
        }));
    }

    pub fn on_series_fetched(&mut self, fetched: SeriesFetched) {
        let Some(detail) = self.detail.as_mut() else {
            return;
        };
        if detail.contest_id() != fetched.contest_id {
            debug!(contest_id = %fetched.contest_id, "[TUI] dropping superseded series");
            return;
        }
        self.detail_fetch = None;
        match fetched.result {
            Ok(series) => detail.set_series(series),
            Err(e) => {
                warn!(contest_id = %fetched.contest_id, "[TUI] series fetch failed: {e}");
                self.status = ConnectionStatus::Error(e);
            }
        }
    }

    pub fn on_expired(&mut self, expired: Expired) {
        if let Some(detail) = self.detail.as_mut() {
            detail.on_expired(expired);
        }
    }

    /// Switch every alert kind on or off together for the contest on the detail screen.
    pub fn toggle_alerts(&mut self) {
        let Some(id) = self.detail.as_ref().map(|d| d.contest_id().to_string()) else {
            return;
        };
        let prefs = self.scoreboard.favorites().store();
        let mut settings = load_alerts(prefs, &id);
        let on = !settings.has_active();
        for kind in [AlertKind::LineMovement, AlertKind::ScoreChange, AlertKind::GameStart] {
            if settings.is_enabled(kind) != on {
                settings.toggle(kind);
            }
        }
        if let Err(e) = save_alerts(prefs, &id, &settings) {
            warn!(contest_id = %id, "[TUI] could not save alert settings: {e}");
        }
        // A line already past the threshold is reported once on enable;
        // refreshes only report new crossings.
        let pending = self
            .summary(&id)
            .and_then(|c| c.market(MarketField::PRIMARY))
            .and_then(|line| alerts::check_line_movement(&id, None, line, &settings));
        if let Some(alert) = pending {
            self.push_alert(alert);
        }
    }

    pub fn alerts_enabled(&self, contest_id: &str) -> bool {
        load_alerts(self.scoreboard.favorites().store(), contest_id).has_active()
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_local(ts: DateTime<Utc>, tz: FixedOffset) -> String {
    ts.with_timezone(&tz).format("%a %-I:%M %p").to_string()
}

pub fn format_count(n: usize, singular: &str) -> String {
    if n == 1 {
        format!("1 {singular}")
    } else {
        format!("{n} {singular}s")
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
