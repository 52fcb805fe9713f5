//! Pure mapping from an odds series onto pixel space.

use chrono::{DateTime, TimeZone, Utc};

use crate::config::{margins, X_DOMAIN_EPSILON_MS, Y_PAD};
use crate::types::{MarketField, OddsSample};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: margins::TOP,
            right: margins::RIGHT,
            bottom: margins::BOTTOM,
            left: margins::LEFT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub margin: Margins,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, margin: Margins::default() }
    }

    pub fn with_margin(mut self, margin: Margins) -> Self {
        self.margin = margin;
        self
    }

    pub fn inner_width(&self) -> f64 {
        (self.width - self.margin.left - self.margin.right).max(0.0)
    }

    pub fn inner_height(&self) -> f64 {
        (self.height - self.margin.top - self.margin.bottom).max(0.0)
    }
}

// ---------------------------------------------------------------------------
// LinearScale
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// A zero-width domain maps everything to the middle of the range.
    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, px: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return (d0 + d1) / 2.0;
        }
        d0 + (px - r0) / (r1 - r0) * (d1 - d0)
    }

    /// Roughly `count` round values (1, 2 or 5 × 10^k apart) inside the domain.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = ordered(self.domain);
        let step = tick_step(lo, hi, count);
        if !step.is_finite() || step <= 0.0 {
            return Vec::new();
        }
        let first = (lo / step).ceil() as i64;
        let last = (hi / step).floor() as i64;
        (first..=last).map(|i| i as f64 * step).collect()
    }
}

fn ordered((a, b): (f64, f64)) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn tick_step(lo: f64, hi: f64, count: usize) -> f64 {
    let raw = (hi - lo) / count.max(1) as f64;
    if raw <= 0.0 || !raw.is_finite() {
        return 0.0;
    }
    let power = 10f64.powf(raw.log10().floor());
    let error = raw / power;
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * power
}

/// Candidate spacings for time ticks, in milliseconds.
const TIME_INTERVALS_MS: &[i64] = &[
    1_000,
    5_000,
    15_000,
    30_000,
    60_000,
    5 * 60_000,
    15 * 60_000,
    30 * 60_000,
    3_600_000,
    3 * 3_600_000,
    6 * 3_600_000,
    12 * 3_600_000,
    86_400_000,
    2 * 86_400_000,
    7 * 86_400_000,
];

// ---------------------------------------------------------------------------
// ScaleMapper
// ---------------------------------------------------------------------------

/// Maps timestamps to x and market values to y (inverted: larger values plot higher).
/// Coordinates are relative to the inner plot area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleMapper {
    field: MarketField,
    x: LinearScale,
    y: LinearScale,
    viewport: Viewport,
}

impl ScaleMapper {
    /// `None` for an empty series.
    pub fn new(series: &[OddsSample], field: MarketField, viewport: &Viewport) -> Option<Self> {
        let first = series.first()?;
        let (mut t_min, mut t_max) = (first.timestamp.timestamp_millis(), first.timestamp.timestamp_millis());
        let (mut v_min, mut v_max) = (first.value(field), first.value(field));
        for s in series {
            let t = s.timestamp.timestamp_millis();
            t_min = t_min.min(t);
            t_max = t_max.max(t);
            let v = s.value(field);
            v_min = v_min.min(v);
            v_max = v_max.max(v);
        }
        if t_min == t_max {
            t_min -= X_DOMAIN_EPSILON_MS;
            t_max += X_DOMAIN_EPSILON_MS;
        }

        Some(Self {
            field,
            x: LinearScale::new((t_min as f64, t_max as f64), (0.0, viewport.inner_width())),
            y: LinearScale::new((v_min - Y_PAD, v_max + Y_PAD), (viewport.inner_height(), 0.0)),
            viewport: *viewport,
        })
    }

    pub fn field(&self) -> MarketField {
        self.field
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn x_scale(&self) -> &LinearScale {
        &self.x
    }

    pub fn y_scale(&self) -> &LinearScale {
        &self.y
    }

    pub fn x(&self, ts: DateTime<Utc>) -> f64 {
        self.x.map(ts.timestamp_millis() as f64)
    }

    pub fn y(&self, value: f64) -> f64 {
        self.y.map(value)
    }

    pub fn point(&self, sample: &OddsSample) -> (f64, f64) {
        (self.x(sample.timestamp), self.y(sample.value(self.field)))
    }

    pub fn y_ticks(&self, count: usize) -> Vec<f64> {
        self.y.ticks(count)
    }

    /// Time ticks aligned to the first interval that yields at most `count` spans.
    pub fn x_ticks(&self, count: usize) -> Vec<DateTime<Utc>> {
        let (lo, hi) = ordered(self.x.domain());
        let (lo, hi) = (lo as i64, hi as i64);
        let span = hi - lo;
        let count = count.max(1) as i64;
        let interval = TIME_INTERVALS_MS
            .iter()
            .copied()
            .find(|&i| span / i <= count)
            .unwrap_or_else(|| {
                let day = 86_400_000;
                ((span / count) / day + 1) * day
            });
        let first = lo.div_euclid(interval) + i64::from(lo.rem_euclid(interval) != 0);
        let last = hi.div_euclid(interval);
        (first..=last)
            .filter_map(|k| Utc.timestamp_millis_opt(k * interval).single())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{series_from, synthetic_series};

    fn viewport() -> Viewport {
        Viewport::new(800.0, 350.0)
    }

    #[test]
    fn inner_size_subtracts_margins() {
        let v = viewport();
        assert_eq!(v.inner_width(), 710.0);
        assert_eq!(v.inner_height(), 300.0);
        assert_eq!(Viewport::new(10.0, 10.0).inner_width(), 0.0);
    }

    #[test]
    fn empty_series_has_no_mapper() {
        assert!(ScaleMapper::new(&[], MarketField::Spread, &viewport()).is_none());
    }

    #[test]
    fn x_spans_inner_width_monotonically() {
        for seed in 1..20u64 {
            let series = synthetic_series(seed, 2 + seed as usize);
            let mapper = ScaleMapper::new(&series, MarketField::Spread, &viewport()).unwrap();
            let xs: Vec<f64> = series.iter().map(|s| mapper.x(s.timestamp)).collect();
            assert!(xs.windows(2).all(|w| w[0] <= w[1]), "seed {seed}: {xs:?}");
            assert!((xs[0] - 0.0).abs() < 1e-9);
            assert!((xs[xs.len() - 1] - viewport().inner_width()).abs() < 1e-9);
        }
    }

    #[test]
    fn y_is_strictly_decreasing_in_value() {
        for seed in 1..20u64 {
            let series = synthetic_series(seed, 6);
            for field in MarketField::ALL {
                let mapper = ScaleMapper::new(&series, field, &viewport()).unwrap();
                let values = [-300.0, -5.5, -5.0, 0.0, 2.5, 224.5, 300.0];
                let ys: Vec<f64> = values.iter().map(|&v| mapper.y(v)).collect();
                assert!(ys.windows(2).all(|w| w[0] > w[1]), "{field}: {ys:?}");
            }
        }
    }

    #[test]
    fn extremes_are_padded_off_the_edges() {
        let series = series_from(&[(10, -5.5), (11, -5.0), (12, -6.0)]);
        let mapper = ScaleMapper::new(&series, MarketField::Spread, &viewport()).unwrap();
        assert_eq!(mapper.y_scale().domain(), (-7.0, -4.0));
        let (_, y_max) = mapper.point(&series[1]);
        assert!(y_max > 0.0);
        let (_, y_min) = mapper.point(&series[2]);
        assert!(y_min < viewport().inner_height());
    }

    #[test]
    fn single_sample_gets_a_non_zero_domain() {
        let series = series_from(&[(10, -5.5)]);
        let mapper = ScaleMapper::new(&series, MarketField::Spread, &viewport()).unwrap();
        let (d0, d1) = mapper.x_scale().domain();
        assert!(d1 > d0);
        let (x, y) = mapper.point(&series[0]);
        assert!((x - viewport().inner_width() / 2.0).abs() < 1e-9);
        assert!(y.is_finite());
    }

    #[test]
    fn same_inputs_same_mapping() {
        let series = synthetic_series(7, 12);
        let a = ScaleMapper::new(&series, MarketField::Total, &viewport()).unwrap();
        let b = ScaleMapper::new(&series, MarketField::Total, &viewport()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn linear_ticks_are_round() {
        let scale = LinearScale::new((-7.0, -4.0), (300.0, 0.0));
        assert_eq!(scale.ticks(5), vec![-7.0, -6.5, -6.0, -5.5, -5.0, -4.5, -4.0]);
        let ml = LinearScale::new((-191.0, -174.0), (300.0, 0.0));
        assert_eq!(ml.ticks(5), vec![-190.0, -185.0, -180.0, -175.0]);
        assert!(LinearScale::new((1.0, 1.0), (0.0, 1.0)).ticks(5).is_empty());
    }

    #[test]
    fn invert_undoes_map() {
        let scale = LinearScale::new((-7.0, -4.0), (300.0, 0.0));
        assert!((scale.invert(scale.map(-5.25)) + 5.25).abs() < 1e-9);
    }

    #[test]
    fn hourly_series_gets_hourly_ticks() {
        let series = series_from(&[(14, -5.5), (15, -5.0), (16, -5.5), (17, -6.0), (18, -5.5)]);
        let mapper = ScaleMapper::new(&series, MarketField::Spread, &viewport()).unwrap();
        let ticks = mapper.x_ticks(5);
        assert_eq!(ticks.len(), 5);
        assert_eq!(ticks[0], series[0].timestamp);
        assert_eq!(ticks[4], series[4].timestamp);
    }
}
