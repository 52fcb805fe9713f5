//! Validation of raw odds records before they reach the store.
//!
//! Feeds quote numbers as JSON numbers or as strings ("-5.5", "+135"). Anything
//! that does not parse to a finite value rejects the whole record: it is logged
//! and counted, never stored, so no NaN can reach the scale mapper. Text
//! fields arrive as raw JSON too, so a record with the wrong type is rejected
//! on its own instead of failing the whole batch.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::state::MemoryStore;
use crate::types::{OddsSample, SharpAction};

/// Maximum number of rejection messages echoed back in a report.
const MAX_REPORTED_ERRORS: usize = 20;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSample {
    #[serde(default, alias = "time")]
    pub timestamp: Value,
    #[serde(default)]
    pub spread: Value,
    #[serde(default)]
    pub moneyline: Value,
    #[serde(default)]
    pub total: Value,
    #[serde(default, alias = "sharpAction")]
    pub sharp_action: Option<Value>,
    #[serde(default, alias = "publicAction")]
    pub public_action: Option<Value>,
    #[serde(default)]
    pub note: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected_malformed: usize,
    pub rejected_out_of_order: usize,
    pub rejected_unknown_contest: usize,
    pub errors: Vec<String>,
}

impl IngestReport {
    pub fn rejected(&self) -> usize {
        self.rejected_malformed + self.rejected_out_of_order + self.rejected_unknown_contest
    }

    /// Fold another report into this one.
    pub fn absorb(&mut self, other: IngestReport) {
        self.accepted += other.accepted;
        self.rejected_malformed += other.rejected_malformed;
        self.rejected_out_of_order += other.rejected_out_of_order;
        self.rejected_unknown_contest += other.rejected_unknown_contest;
        let room = MAX_REPORTED_ERRORS.saturating_sub(self.errors.len());
        self.errors.extend(other.errors.into_iter().take(room));
    }

    fn note_error(&mut self, e: &AppError) {
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(e.to_string());
        }
    }
}

/// Validate one raw record.
pub fn parse_sample(raw: &RawSample) -> Result<OddsSample> {
    let timestamp = match &raw.timestamp {
        Value::String(s) => parse_timestamp(s)?,
        other => return Err(AppError::InvalidSample(format!("timestamp must be a string, got {other}"))),
    };
    let spread = parse_number("spread", &raw.spread)?;
    let moneyline = parse_number("moneyline", &raw.moneyline)?;
    let total = parse_number("total", &raw.total)?;

    if moneyline.fract() != 0.0 || moneyline.abs() > f64::from(i32::MAX) {
        return Err(AppError::InvalidSample(format!("moneyline must be a whole number, got {moneyline}")));
    }
    if total <= 0.0 {
        return Err(AppError::InvalidSample(format!("total must be positive, got {total}")));
    }

    let sharp_action = match optional_text("sharp_action", raw.sharp_action.as_ref())? {
        None => None,
        Some(s) => Some(s.parse::<SharpAction>()?),
    };

    let public_action = match &raw.public_action {
        None | Some(Value::Null) => None,
        Some(v) => {
            let pct = parse_number("public_action", v)?;
            if !(0.0..=100.0).contains(&pct) {
                return Err(AppError::InvalidSample(format!("public_action out of range: {pct}")));
            }
            Some(pct.round() as u8)
        }
    };

    Ok(OddsSample {
        timestamp,
        spread,
        moneyline: moneyline as i32,
        total,
        sharp_action,
        public_action,
        note: optional_text("note", raw.note.as_ref())?.map(str::to_string),
    })
}

/// Validate and append a batch for one contest. Returns the report and the
/// samples that made it into the store, in order.
pub fn ingest_batch(
    store: &MemoryStore,
    contest_id: &str,
    raws: &[RawSample],
) -> (IngestReport, Vec<OddsSample>) {
    let mut report = IngestReport::default();
    let mut accepted = Vec::with_capacity(raws.len());

    for raw in raws {
        let sample = match parse_sample(raw) {
            Ok(s) => s,
            Err(e) => {
                warn!(contest_id, timestamp = %raw.timestamp, "[INGEST] rejected malformed sample: {e}");
                report.rejected_malformed += 1;
                report.note_error(&e);
                continue;
            }
        };
        match store.append_sample(contest_id, sample.clone()) {
            Ok(()) => {
                report.accepted += 1;
                accepted.push(sample);
            }
            Err(e) => {
                match e {
                    AppError::NotFound(_) => report.rejected_unknown_contest += 1,
                    _ => report.rejected_out_of_order += 1,
                }
                warn!(contest_id, "[INGEST] rejected sample: {e}");
                report.note_error(&e);
            }
        }
    }

    (report, accepted)
}

fn parse_number(field: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            s.strip_prefix('+').unwrap_or(s).parse::<f64>().ok()
        }
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| AppError::InvalidSample(format!("{field} is not a number: {value}")))
}

/// Trimmed text, with null and blank treated as absent. Any other JSON type is
/// an error.
fn optional_text<'a>(field: &str, value: Option<&'a Value>) -> Result<Option<&'a str>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim()).filter(|s| !s.is_empty())),
        Some(other) => Err(AppError::InvalidSample(format!("{field} must be a string, got {other}"))),
    }
}

/// RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM:SS` taken as UTC. Truncated to
/// whole milliseconds, the precision samples are persisted at.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    let ts = match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.with_timezone(&Utc),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .map(|naive| naive.and_utc())
            .map_err(|_| AppError::InvalidSample(format!("bad timestamp: {raw:?}")))?,
    };
    Ok(ts.trunc_subsecs(3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TimeSeriesStore;
    use crate::types::Contest;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw(value: Value) -> RawSample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let sample = parse_sample(&raw(json!({
            "time": "2025-02-22T14:00:00",
            "spread": "-5.5",
            "moneyline": "+135",
            "total": 224.5,
            "sharpAction": "high",
            "publicAction": 65,
            "note": "Sharp money moving the line"
        })))
        .unwrap();
        assert_eq!(sample.timestamp, Utc.with_ymd_and_hms(2025, 2, 22, 14, 0, 0).unwrap());
        assert_eq!(sample.spread, -5.5);
        assert_eq!(sample.moneyline, 135);
        assert_eq!(sample.sharp_action, Some(SharpAction::High));
        assert_eq!(sample.public_action, Some(65));
    }

    #[test]
    fn missing_optional_fields_stay_absent() {
        let sample = parse_sample(&raw(json!({
            "timestamp": "2025-02-22T19:30:00-05:00",
            "spread": -2.5, "moneyline": -130, "total": 228.5, "note": "  "
        })))
        .unwrap();
        assert_eq!(sample.timestamp, Utc.with_ymd_and_hms(2025, 2, 23, 0, 30, 0).unwrap());
        assert!(sample.sharp_action.is_none());
        assert!(sample.public_action.is_none());
        assert!(sample.note.is_none());
    }

    #[test]
    fn rejects_malformed_values() {
        let base = json!({"time": "2025-02-22T14:00:00", "spread": -5.5, "moneyline": -180, "total": 224.5});
        for (field, bad) in [
            ("spread", json!("N/A")),
            ("spread", json!(null)),
            ("moneyline", json!(-180.5)),
            ("total", json!(-1)),
            ("time", json!("yesterday")),
            ("time", json!(1740232800)),
            ("sharpAction", json!("extreme")),
            ("sharpAction", json!(3)),
            ("publicAction", json!(140)),
            ("note", json!(["late scratch"])),
        ] {
            let mut v = base.clone();
            v[field] = bad;
            assert!(
                matches!(parse_sample(&raw(v)), Err(AppError::InvalidSample(_))),
                "{field} should be rejected"
            );
        }
    }

    #[test]
    fn malformed_sample_is_excluded_from_series() {
        let store = MemoryStore::new();
        store.add_contest(Contest::new(
            "1",
            "Celtics",
            "Knicks",
            Utc.with_ymd_and_hms(2025, 2, 23, 0, 30, 0).unwrap(),
            "NBA",
        ));
        let batch = vec![
            raw(json!({"time": "2025-02-22T14:00:00", "spread": -5.5, "moneyline": -180, "total": 224.5})),
            raw(json!({"time": "2025-02-22T15:00:00", "spread": "N/A", "moneyline": -175, "total": 225.0})),
            raw(json!({"time": "2025-02-22T16:00:00", "spread": -5.5, "moneyline": -185, "total": 224.0})),
            raw(json!({"time": "2025-02-22T16:00:00", "spread": -6.0, "moneyline": -190, "total": 224.5})),
        ];
        let (report, accepted) = ingest_batch(&store, "1", &batch);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected_malformed, 1);
        assert_eq!(report.rejected_out_of_order, 1);
        assert_eq!(report.rejected(), 2);
        assert_eq!(accepted.len(), 2);

        let series = store.get_series("1", None).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.iter().all(|s| s.spread.is_finite()));
    }

    #[test]
    fn timestamps_keep_millisecond_precision() {
        let a = parse_timestamp("2025-02-22T10:00:00.000100Z").unwrap();
        let b = parse_timestamp("2025-02-22T10:00:00.000400Z").unwrap();
        let c = parse_timestamp("2025-02-22T10:00:00.001999Z").unwrap();
        assert_eq!(a, Utc.with_ymd_and_hms(2025, 2, 22, 10, 0, 0).unwrap());
        assert_eq!(a, b);
        assert_eq!(c.timestamp_millis() - a.timestamp_millis(), 1);
        assert_eq!(c.timestamp_subsec_nanos(), 1_000_000);
    }

    #[test]
    fn same_millisecond_is_out_of_order() {
        let store = MemoryStore::new();
        store.add_contest(Contest::new(
            "1",
            "Celtics",
            "Knicks",
            Utc.with_ymd_and_hms(2025, 2, 23, 0, 30, 0).unwrap(),
            "NBA",
        ));
        let batch = vec![
            raw(json!({"time": "2025-02-22T10:00:00.000100Z", "spread": -5.5, "moneyline": -180, "total": 224.5})),
            raw(json!({"time": "2025-02-22T10:00:00.000400Z", "spread": -6.0, "moneyline": -185, "total": 224.5})),
        ];
        let (report, accepted) = ingest_batch(&store, "1", &batch);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected_out_of_order, 1);
        assert_eq!(accepted[0].spread, -5.5);
    }

    #[test]
    fn wrongly_typed_text_rejects_only_that_record() {
        let store = MemoryStore::new();
        store.add_contest(Contest::new(
            "1",
            "Celtics",
            "Knicks",
            Utc.with_ymd_and_hms(2025, 2, 23, 0, 30, 0).unwrap(),
            "NBA",
        ));
        let batch: Vec<RawSample> = serde_json::from_value(json!([
            {"time": "2025-02-22T14:00:00", "spread": -5.5, "moneyline": -180, "total": 224.5},
            {"time": "2025-02-22T15:00:00", "spread": -5.5, "moneyline": -180, "total": 224.5, "sharpAction": 3},
            {"time": 1740240000, "spread": -5.5, "moneyline": -180, "total": 224.5},
            {"time": "2025-02-22T17:00:00", "spread": -6.0, "moneyline": -190, "total": 224.5, "sharpAction": null, "note": null}
        ]))
        .unwrap();
        let (report, accepted) = ingest_batch(&store, "1", &batch);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected_malformed, 2);
        assert!(accepted[1].sharp_action.is_none());
        assert!(accepted[1].note.is_none());
    }
}
