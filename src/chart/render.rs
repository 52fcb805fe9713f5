//! Chart scene: everything needed to draw an odds timeline, derived in one pass
//! from the series, the selected market and the viewport. Rebuilt from scratch
//! whenever any of those change.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chart::curve::{area_path, line_path, Point};
use crate::chart::scale::{ScaleMapper, Viewport};
use crate::config::{AXIS_TICKS, HIT_RADIUS};
use crate::detector::movement::direction;
use crate::types::{Direction, MarketField, OddsSample, SharpAction};

const MARKER_RADIUS: f64 = 4.0;
const GLOW_RADIUS: f64 = 8.0;

const COLOR_GRID: &str = "#1e293b";
const COLOR_AXIS: &str = "#64748b";
const COLOR_UP: &str = "#22c55e";
const COLOR_DOWN: &str = "#ef4444";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    Muted,
    Normal,
    Strong,
}

impl Emphasis {
    /// Higher sharp action → more prominent marker. Absent data stays muted.
    pub fn from_sharp_action(sharp: Option<SharpAction>) -> Self {
        match sharp {
            Some(SharpAction::High) => Emphasis::Strong,
            Some(SharpAction::Medium) => Emphasis::Normal,
            Some(SharpAction::Low) | None => Emphasis::Muted,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Emphasis::Strong => "#6366f1",
            Emphasis::Normal => "#0ea5e9",
            Emphasis::Muted => COLOR_AXIS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    /// Pixel offset along the axis, inner-plot coordinates.
    pub position: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// Index into the series the scene was built from.
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// 0 when there is no glow.
    pub glow_radius: f64,
    pub emphasis: Emphasis,
}

/// Full record of a hovered sample, as shown in the side panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverPanel {
    pub timestamp: DateTime<Utc>,
    pub field: MarketField,
    pub value: f64,
    pub formatted_value: String,
    pub sharp_action: Option<SharpAction>,
    pub public_action: Option<u8>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub inner_width: f64,
    pub inner_height: f64,
    pub offset: (f64, f64),
    pub field: MarketField,
    pub x_ticks: Vec<Tick>,
    pub y_ticks: Vec<Tick>,
    /// y positions of the horizontal grid lines.
    pub grid: Vec<f64>,
    pub line_path: Option<String>,
    pub area_path: Option<String>,
    pub markers: Vec<Marker>,
    #[serde(skip)]
    samples: Vec<OddsSample>,
}

impl Scene {
    /// An empty series yields axes only: no ticks, path or markers.
    pub fn build(series: &[OddsSample], field: MarketField, viewport: &Viewport) -> Self {
        let mut scene = Scene {
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            inner_width: viewport.inner_width(),
            inner_height: viewport.inner_height(),
            offset: (viewport.margin.left, viewport.margin.top),
            field,
            x_ticks: Vec::new(),
            y_ticks: Vec::new(),
            grid: Vec::new(),
            line_path: None,
            area_path: None,
            markers: Vec::new(),
            samples: series.to_vec(),
        };
        let Some(mapper) = ScaleMapper::new(series, field, viewport) else {
            return scene;
        };

        scene.x_ticks = mapper
            .x_ticks(AXIS_TICKS)
            .into_iter()
            .map(|ts| Tick { position: mapper.x(ts), label: ts.format("%I:%M %p").to_string() })
            .collect();
        scene.y_ticks = mapper
            .y_ticks(AXIS_TICKS)
            .into_iter()
            .map(|v| Tick { position: mapper.y(v), label: field.format_value(v) })
            .collect();
        scene.grid = scene.y_ticks.iter().map(|t| t.position).collect();

        let points: Vec<Point> = series.iter().map(|s| mapper.point(s)).collect();
        scene.line_path = Some(line_path(&points));
        scene.area_path = Some(area_path(&points, scene.inner_height));
        scene.markers = series
            .iter()
            .zip(points.iter())
            .enumerate()
            .map(|(index, (s, &(x, y)))| {
                let emphasis = Emphasis::from_sharp_action(s.sharp_action);
                Marker {
                    index,
                    x,
                    y,
                    radius: MARKER_RADIUS,
                    glow_radius: if emphasis == Emphasis::Strong { GLOW_RADIUS } else { 0.0 },
                    emphasis,
                }
            })
            .collect();
        scene
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Nearest marker within the hit radius of an inner-plot point.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<usize> {
        self.markers
            .iter()
            .map(|m| (m.index, (m.x - x).hypot(m.y - y)))
            .filter(|&(_, d)| d <= HIT_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Nearest sample by horizontal position only, for keyboard/column hover.
    pub fn nearest_by_x(&self, x: f64) -> Option<usize> {
        self.markers
            .iter()
            .min_by(|a, b| (a.x - x).abs().total_cmp(&(b.x - x).abs()))
            .map(|m| m.index)
    }

    pub fn hover(&self, index: usize) -> Option<HoverPanel> {
        let s = self.samples.get(index)?;
        let value = s.value(self.field);
        Some(HoverPanel {
            timestamp: s.timestamp,
            field: self.field,
            value,
            formatted_value: self.field.format_value(value),
            sharp_action: s.sharp_action,
            public_action: s.public_action,
            note: s.note.clone(),
        })
    }

    pub fn to_svg(&self) -> String {
        let (w, h) = (self.inner_width, self.inner_height);
        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}">"#,
            self.viewport_width, self.viewport_height, self.viewport_width, self.viewport_height
        );
        svg.push_str(concat!(
            r##"<defs><linearGradient id="line-gradient" x1="0%" y1="0%" x2="100%" y2="0%">"##,
            r##"<stop offset="0%" stop-color="#0ea5e9"/><stop offset="50%" stop-color="#6366f1"/>"##,
            r##"<stop offset="100%" stop-color="#8b5cf6"/></linearGradient></defs>"##,
        ));
        let _ = write!(svg, r#"<g transform="translate({:.2},{:.2})">"#, self.offset.0, self.offset.1);

        svg.push_str(r#"<g class="grid" stroke-dasharray="2,2">"#);
        for y in &self.grid {
            let _ = write!(
                svg,
                r#"<line x1="0" x2="{w:.2}" y1="{y:.2}" y2="{y:.2}" stroke="{COLOR_GRID}"/>"#
            );
        }
        svg.push_str("</g>");

        if let Some(area) = &self.area_path {
            let _ = write!(
                svg,
                r#"<path class="area" d="{area}" fill="url(#line-gradient)" fill-opacity="0.1"/>"#
            );
        }
        if let Some(line) = &self.line_path {
            let _ = write!(
                svg,
                r#"<path class="line" d="{line}" fill="none" stroke="url(#line-gradient)" stroke-width="3"/>"#
            );
        }

        for m in &self.markers {
            let _ = write!(svg, r#"<g class="dot" transform="translate({:.2},{:.2})">"#, m.x, m.y);
            if m.glow_radius > 0.0 {
                let _ = write!(
                    svg,
                    r##"<circle class="glow" r="{:.0}" fill="#6366f1" fill-opacity="0.3"/>"##,
                    m.glow_radius
                );
            }
            let _ = write!(
                svg,
                r##"<circle r="{:.0}" fill="{}" stroke="#0f172a" stroke-width="2">"##,
                m.radius,
                m.emphasis.color()
            );
            if let Some(panel) = self.hover(m.index) {
                let _ = write!(svg, "<title>{}</title>", escape_xml(&panel_title(&panel)));
            }
            svg.push_str("</circle></g>");
        }

        // Axes are drawn even when there is no data.
        let _ = write!(
            svg,
            r#"<g class="x-axis" transform="translate(0,{h:.2})" color="{COLOR_AXIS}"><path d="M0,0H{w:.2}" stroke="{COLOR_GRID}"/>"#
        );
        for t in &self.x_ticks {
            let _ = write!(
                svg,
                r#"<g class="tick" transform="translate({:.2},0)"><line y2="6" stroke="{COLOR_GRID}"/><text y="18" text-anchor="middle" fill="currentColor">{}</text></g>"#,
                t.position,
                escape_xml(&t.label)
            );
        }
        svg.push_str("</g>");
        let _ = write!(
            svg,
            r#"<g class="y-axis" color="{COLOR_AXIS}"><path d="M0,0V{h:.2}" stroke="{COLOR_GRID}"/>"#
        );
        for t in &self.y_ticks {
            let _ = write!(
                svg,
                r#"<g class="tick" transform="translate(0,{:.2})"><line x2="-6" stroke="{COLOR_GRID}"/><text x="-9" dy="0.32em" text-anchor="end" fill="currentColor">{}</text></g>"#,
                t.position,
                escape_xml(&t.label)
            );
        }
        svg.push_str("</g></g></svg>");
        svg
    }
}

fn panel_title(panel: &HoverPanel) -> String {
    let mut title = format!("{} · {}", panel.timestamp.format("%I:%M %p"), panel.formatted_value);
    if let Some(sharp) = panel.sharp_action {
        let _ = write!(title, " · sharp {sharp}");
    }
    if let Some(pct) = panel.public_action {
        let _ = write!(title, " · public {pct}%");
    }
    if let Some(note) = &panel.note {
        let _ = write!(title, " · {note}");
    }
    title
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Sparkline: axis-less mini graph for cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sparkline {
    pub points: Vec<Point>,
    pub path: String,
    pub direction: Direction,
}

impl Sparkline {
    /// Samples are spaced evenly; y spans exactly data min..max.
    pub fn build(series: &[OddsSample], field: MarketField, width: f64, height: f64) -> Self {
        let values: Vec<f64> = series.iter().map(|s| s.value(field)).collect();
        let (lo, hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let step = if values.len() > 1 { width / (values.len() - 1) as f64 } else { 0.0 };
        let points: Vec<Point> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let y = if hi > lo { height - (v - lo) / (hi - lo) * height } else { height / 2.0 };
                (i as f64 * step, y)
            })
            .collect();
        Sparkline {
            path: line_path(&points),
            points,
            direction: direction(series, field),
        }
    }

    pub fn stroke(&self) -> &'static str {
        match self.direction {
            Direction::Up => COLOR_UP,
            Direction::Down => COLOR_DOWN,
            Direction::Flat => COLOR_AXIS,
        }
    }
}
