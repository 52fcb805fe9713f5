use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::api::health::HealthState;
use crate::api::latency::{LatencyStats, LatencySummary};
use crate::chart::{Scene, Viewport};
use crate::db::PersistMsg;
use crate::detector::{Movement, MovementModel};
use crate::error::{AppError, Result};
use crate::filter::{self, FilterSpec};
use crate::ingest::{ingest_batch, parse_timestamp, IngestReport, RawSample};
use crate::state::{MemoryStore, TimeSeriesStore};
use crate::types::{Contest, ContestQuery, Direction, MarketField, MovementBucket, OddsSample, TimeRange};

const DEFAULT_CHART_WIDTH: f64 = 800.0;
const DEFAULT_CHART_HEIGHT: f64 = 400.0;
const MAX_CHART_SIDE: f64 = 4_000.0;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<MemoryStore>,
    pub model: MovementModel,
    pub persist_tx: mpsc::Sender<PersistMsg>,
    pub latency: Arc<LatencyStats>,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/contests", get(get_contests))
        .route("/contests/:id", get(get_contest))
        .route("/contests/:id/series", get(get_series))
        .route("/contests/:id/movement", get(get_movement))
        .route("/contests/:id/chart.svg", get(get_chart_svg))
        .route("/contests/:id/samples", axum::routing::post(post_samples))
        .route("/search", get(get_search))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SeriesQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Deserialize)]
pub struct FieldQuery {
    pub field: Option<String>,
}

#[derive(Deserialize)]
pub struct ChartQuery {
    pub field: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub league: Option<String>,
    pub bet_type: Option<String>,
    pub movement: Option<String>,
    pub q: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A contest with what a list row needs: latest quote and primary-market movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestSummary {
    #[serde(flatten)]
    pub contest: Contest,
    pub movement: MovementBucket,
    pub direction: Direction,
    /// Per-market movement, in `MarketField::ALL` order.
    pub markets: Vec<Movement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<OddsSample>,
    pub sample_count: usize,
}

impl ContestSummary {
    pub fn market(&self, field: MarketField) -> Option<&Movement> {
        self.markets.iter().find(|m| m.field == field)
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub contests: usize,
    pub samples: usize,
    pub samples_ingested: u64,
    pub last_ingest_at_ms: Option<i64>,
    pub write_queue_pending: u64,
    pub write_errors: u64,
}

fn summarize(state: &ApiState, contest: Contest) -> ContestSummary {
    let series = state.store.get_series(&contest.id, None).unwrap_or_default();
    let markets: Vec<Movement> = MarketField::ALL
        .iter()
        .map(|&field| state.model.classify(&series, field))
        .collect();
    let primary = state.model.classify(&series, MarketField::PRIMARY);
    ContestSummary {
        contest,
        movement: primary.bucket,
        direction: primary.direction,
        markets,
        latest: series.last().cloned(),
        sample_count: series.len(),
    }
}

fn parse_field(raw: Option<&str>) -> Result<MarketField> {
    raw.map_or(Ok(MarketField::PRIMARY), str::parse::<MarketField>)
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    raw.map(|s| parse_timestamp(s).map_err(|_| AppError::BadRequest(format!("{name} must be an RFC 3339 timestamp"))))
        .transpose()
}

fn chart_side(name: &str, raw: Option<f64>, default: f64) -> Result<f64> {
    let v = raw.unwrap_or(default);
    if v.is_finite() && v > 0.0 && v <= MAX_CHART_SIDE {
        Ok(v)
    } else {
        Err(AppError::BadRequest(format!("{name} must be in (0, {MAX_CHART_SIDE}]")))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_contests(
    State(state): State<ApiState>,
    Query(query): Query<ContestQuery>,
) -> Json<Vec<ContestSummary>> {
    let contests = state.store.list_contests(&query);
    Json(contests.into_iter().map(|c| summarize(&state, c)).collect())
}

async fn get_contest(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ContestSummary>> {
    let contest = state
        .store
        .get_contest(&id)
        .ok_or_else(|| AppError::NotFound(format!("contest {id}")))?;
    Ok(Json(summarize(&state, contest)))
}

async fn get_series(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<SeriesQuery>,
) -> Result<Json<Vec<OddsSample>>> {
    let range = TimeRange {
        from: parse_bound("from", params.from.as_deref())?,
        to: parse_bound("to", params.to.as_deref())?,
    };
    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            return Err(AppError::BadRequest("from is after to".to_string()));
        }
    }
    let range = (range.from.is_some() || range.to.is_some()).then_some(range);
    Ok(Json(state.store.get_series(&id, range)?))
}

async fn get_movement(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<FieldQuery>,
) -> Result<Json<Movement>> {
    let field = parse_field(params.field.as_deref())?;
    let series = state.store.get_series(&id, None)?;
    Ok(Json(state.model.classify(&series, field)))
}

async fn get_chart_svg(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<ChartQuery>,
) -> Result<impl IntoResponse> {
    let field = parse_field(params.field.as_deref())?;
    let viewport = Viewport::new(
        chart_side("width", params.width, DEFAULT_CHART_WIDTH)?,
        chart_side("height", params.height, DEFAULT_CHART_HEIGHT)?,
    );
    let series = state.store.get_series(&id, None)?;
    let svg = Scene::build(&series, field, &viewport).to_svg();
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

async fn post_samples(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(raws): Json<Vec<RawSample>>,
) -> Result<Json<IngestReport>> {
    let started = Instant::now();
    if !state.store.contains(&id) {
        return Err(AppError::NotFound(format!("contest {id}")));
    }

    let (report, accepted) = ingest_batch(&state.store, &id, &raws);
    state
        .health
        .record_ingest(report.accepted, chrono::Utc::now().timestamp_millis());

    if !accepted.is_empty() {
        state.health.inc_write_queue_pending();
        let msg = PersistMsg::Samples { contest_id: id.clone(), samples: accepted };
        if let Err(e) = state.persist_tx.send(msg).await {
            state.health.dec_write_queue_pending();
            return Err(AppError::ChannelSend(e.to_string()));
        }
    }
    state.latency.record(started.elapsed());

    info!(
        contest_id = %id,
        accepted = report.accepted,
        rejected = report.rejected(),
        "[INGEST] batch processed"
    );
    Ok(Json(report))
}

async fn get_search(
    State(state): State<ApiState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<ContestSummary>>> {
    let spec = FilterSpec::from_params(
        params.league.as_deref(),
        params.bet_type.as_deref(),
        params.movement.as_deref(),
        params.q.as_deref(),
    )?;
    let found = filter::search(state.store.as_ref(), &state.model, &spec);
    Ok(Json(found.into_iter().map(|c| summarize(&state, c)).collect()))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let last = state.health.last_ingest_at_ms();
    Json(HealthResponse {
        status: "ok",
        contests: state.store.contest_count(),
        samples: state.store.sample_count(),
        samples_ingested: state.health.samples_ingested(),
        last_ingest_at_ms: (last > 0).then_some(last),
        write_queue_pending: state.health.write_queue_pending(),
        write_errors: state.health.write_errors(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySummary> {
    Json(state.latency.summary())
}
