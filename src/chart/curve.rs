//! Centripetal Catmull-Rom interpolation expressed as cubic Béziers, so the
//! smoothed line can be emitted as plain SVG path data.

use std::fmt::Write;

pub type Point = (f64, f64);

/// Centripetal parameterisation.
pub const ALPHA: f64 = 0.5;

const EPSILON: f64 = 1e-12;

/// One cubic segment ending at `to`; the start is the previous segment's end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bezier {
    pub c1: Point,
    pub c2: Point,
    pub to: Point,
}

/// Segments joining consecutive points. The endpoints are duplicated as their own
/// outer neighbours, so the curve starts and ends exactly on the data.
pub fn catmull_rom(points: &[Point], alpha: f64) -> Vec<Bezier> {
    if points.len() < 2 {
        return Vec::new();
    }
    let n = points.len();
    (0..n - 1)
        .map(|i| {
            let p0 = points[i.saturating_sub(1)];
            let p1 = points[i];
            let p2 = points[i + 1];
            let p3 = points[(i + 2).min(n - 1)];
            segment(p0, p1, p2, p3, alpha)
        })
        .collect()
}

fn segment(p0: Point, p1: Point, p2: Point, p3: Point, alpha: f64) -> Bezier {
    let d01 = distance(p0, p1);
    let d12 = distance(p1, p2);
    let d23 = distance(p2, p3);
    let (l01_a, l01_2a) = (d01.powf(alpha), d01.powf(2.0 * alpha));
    let (l12_a, l12_2a) = (d12.powf(alpha), d12.powf(2.0 * alpha));
    let (l23_a, l23_2a) = (d23.powf(alpha), d23.powf(2.0 * alpha));

    let mut c1 = p1;
    if l01_a > EPSILON {
        let a = 2.0 * l01_2a + 3.0 * l01_a * l12_a + l12_2a;
        let n = 3.0 * l01_a * (l01_a + l12_a);
        c1 = (
            (p1.0 * a - p0.0 * l12_2a + p2.0 * l01_2a) / n,
            (p1.1 * a - p0.1 * l12_2a + p2.1 * l01_2a) / n,
        );
    }

    let mut c2 = p2;
    if l23_a > EPSILON {
        let b = 2.0 * l23_2a + 3.0 * l23_a * l12_a + l12_2a;
        let m = 3.0 * l23_a * (l23_a + l12_a);
        c2 = (
            (p2.0 * b + p1.0 * l23_2a - p3.0 * l12_2a) / m,
            (p2.1 * b + p1.1 * l23_2a - p3.1 * l12_2a) / m,
        );
    }

    Bezier { c1, c2, to: p2 }
}

fn distance(a: Point, b: Point) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// SVG path data for the smoothed line through `points`. Empty for no points.
pub fn line_path(points: &[Point]) -> String {
    let Some(&(x0, y0)) = points.first() else {
        return String::new();
    };
    let mut d = format!("M{x0:.2},{y0:.2}");
    for b in catmull_rom(points, ALPHA) {
        let _ = write!(
            d,
            "C{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
            b.c1.0, b.c1.1, b.c2.0, b.c2.1, b.to.0, b.to.1
        );
    }
    d
}

/// The line path closed down to `baseline`, for the filled area.
pub fn area_path(points: &[Point], baseline: f64) -> String {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return String::new();
    };
    let mut d = line_path(points);
    let _ = write!(d, "L{:.2},{baseline:.2}L{:.2},{baseline:.2}Z", last.0, first.0);
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_passes_through_every_point() {
        let points = [(0.0, 10.0), (50.0, 40.0), (120.0, 5.0), (200.0, 30.0)];
        let segments = catmull_rom(&points, ALPHA);
        assert_eq!(segments.len(), 3);
        for (seg, p) in segments.iter().zip(points.iter().skip(1)) {
            assert_eq!(seg.to, *p);
        }
    }

    #[test]
    fn two_points_make_a_straight_segment() {
        let segments = catmull_rom(&[(0.0, 0.0), (10.0, 10.0)], ALPHA);
        assert_eq!(segments, vec![Bezier { c1: (0.0, 0.0), c2: (10.0, 10.0), to: (10.0, 10.0) }]);
    }

    #[test]
    fn collinear_points_keep_controls_on_the_line() {
        let segments = catmull_rom(&[(0.0, 0.0), (10.0, 10.0), (20.0, 20.0)], ALPHA);
        for seg in segments {
            assert!((seg.c1.0 - seg.c1.1).abs() < 1e-9);
            assert!((seg.c2.0 - seg.c2.1).abs() < 1e-9);
        }
    }

    #[test]
    fn paths_for_degenerate_inputs() {
        assert_eq!(line_path(&[]), "");
        assert_eq!(area_path(&[], 100.0), "");
        assert_eq!(line_path(&[(1.0, 2.0)]), "M1.00,2.00");
        assert_eq!(area_path(&[(1.0, 2.0)], 100.0), "M1.00,2.00L1.00,100.00L1.00,100.00Z");
    }
}
