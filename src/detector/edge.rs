//! Edge tracking: black/white transitions grown into straight edges over a row and a column pass
use std::collections::BTreeMap;
use std::f32::consts::{PI, TAU};

use crate::models::{BitMatrix, Point};

/// Minimum Sobel magnitude for a transition to count
const GRADIENT_THRESHOLD: f32 = 2.0;
/// Largest sideways step between consecutive points of one edge, in pixels
const LATERAL_TOLERANCE: f32 = 3.0;
/// Largest gradient angle change between a point and its edge, in radians
const ANGLE_TOLERANCE: f32 = 0.8;
/// Scan lines an edge may go without a new point before it is closed
const FRONTIER_GAP: usize = 3;

/// Scan direction of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Walk each row left to right; finds edges that run mostly vertically
    Rows,
    /// Walk each column top to bottom; finds edges that run mostly horizontally
    Columns,
}

/// A closed, straight black/white edge
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// First end, in scan order
    pub start: Point,
    /// Last end, in scan order
    pub end: Point,
    /// Point on the fitted line
    pub centroid: Point,
    /// Unit direction of the fitted line, from `start` towards `end`
    pub direction: Point,
    /// Circular mean of the gradient angle (points towards the dark side)
    pub angle: f32,
    /// True when the scan entered black at this edge
    pub dark_after: bool,
    /// Transition points that built the edge
    pub points: usize,
}

impl Edge {
    /// Distance between the two ends
    pub fn length(&self) -> f32 {
        self.start.distance(&self.end)
    }

    /// Intersection of the two fitted lines; `None` when they are parallel
    pub fn intersect(&self, other: &Edge) -> Option<Point> {
        let denom = self.direction.cross(&other.direction);
        if denom.abs() < 1e-4 {
            return None;
        }
        let t = other.centroid.sub(&self.centroid).cross(&other.direction) / denom;
        Some(self.centroid.add(&self.direction.scale(t)))
    }
}

#[derive(Debug, Clone)]
struct OpenEdge {
    first: Point,
    last: Point,
    last_line: usize,
    dark_after: bool,
    n: f64,
    sx: f64,
    sy: f64,
    sxx: f64,
    sxy: f64,
    syy: f64,
    cos_sum: f32,
    sin_sum: f32,
}

impl OpenEdge {
    fn new(point: Point, line: usize, angle: f32, dark_after: bool) -> Self {
        let mut edge = Self {
            first: point,
            last: point,
            last_line: line,
            dark_after,
            n: 0.0,
            sx: 0.0,
            sy: 0.0,
            sxx: 0.0,
            sxy: 0.0,
            syy: 0.0,
            cos_sum: 0.0,
            sin_sum: 0.0,
        };
        edge.push(point, line, angle);
        edge
    }

    fn push(&mut self, point: Point, line: usize, angle: f32) {
        self.last = point;
        self.last_line = line;
        let (x, y) = (point.x as f64, point.y as f64);
        self.n += 1.0;
        self.sx += x;
        self.sy += y;
        self.sxx += x * x;
        self.sxy += x * y;
        self.syy += y * y;
        self.cos_sum += angle.cos();
        self.sin_sum += angle.sin();
    }

    fn mean_angle(&self) -> f32 {
        self.sin_sum.atan2(self.cos_sum)
    }

    fn close(&self) -> Option<Edge> {
        if self.n < 2.0 {
            return None;
        }
        let (cx, cy) = (self.sx / self.n, self.sy / self.n);
        let vxx = self.sxx / self.n - cx * cx;
        let vyy = self.syy / self.n - cy * cy;
        let vxy = self.sxy / self.n - cx * cy;
        let theta = 0.5 * (2.0 * vxy).atan2(vxx - vyy);
        let centroid = Point::new(cx as f32, cy as f32);
        let mut direction = Point::new(theta.cos() as f32, theta.sin() as f32);
        if self.last.sub(&self.first).dot(&direction) < 0.0 {
            direction = direction.scale(-1.0);
        }

        // Each transition point stands for one pixel of boundary
        let project = |p: &Point| centroid.add(&direction.scale(p.sub(&centroid).dot(&direction)));
        let start = project(&self.first).add(&direction.scale(-0.5));
        let end = project(&self.last).add(&direction.scale(0.5));

        Some(Edge {
            start,
            end,
            centroid,
            direction,
            angle: self.mean_angle(),
            dark_after: self.dark_after,
            points: self.n as usize,
        })
    }
}

fn angle_difference(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(TAU);
    if d > PI { TAU - d } else { d }
}

/// Closed edges keyed by rounded length
#[derive(Debug, Default, Clone)]
pub struct EdgeBuckets {
    buckets: BTreeMap<u32, Vec<Edge>>,
}

impl EdgeBuckets {
    /// Empty bucket set
    pub fn new() -> Self {
        Self::default()
    }

    /// File a closed edge under its rounded length
    pub fn insert(&mut self, edge: Edge) {
        let key = edge.length().round() as u32;
        self.buckets.entry(key).or_default().push(edge);
    }

    /// Number of edges across all buckets
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// True when no edge has been filed
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// All edges, longest first
    pub fn longest_first(&self) -> impl Iterator<Item = &Edge> {
        self.buckets.values().rev().flatten()
    }

    /// Edges whose rounded length lies in `[min, max]`
    pub fn in_length_range(&self, min: f32, max: f32) -> impl Iterator<Item = &Edge> {
        let lo = min.floor().max(0.0) as u32;
        let hi = max.ceil().max(0.0) as u32;
        self.buckets.range(lo..=hi.max(lo)).flat_map(|(_, v)| v.iter())
    }
}

/// Length limits applied when an edge closes
#[derive(Debug, Clone, Copy)]
pub struct EdgeFilter {
    /// Shortest accepted edge in pixels
    pub min_length: f32,
    /// Longest accepted edge in pixels
    pub max_length: f32,
}

impl EdgeFilter {
    fn accepts(&self, edge: &Edge) -> bool {
        let len = edge.length();
        len >= self.min_length && len <= self.max_length
    }
}

fn darkness(bitmap: &BitMatrix, x: isize, y: isize) -> f32 {
    if bitmap.get_signed(x, y) { 1.0 } else { 0.0 }
}

/// Sobel-style gradient across the boundary between two neighbouring pixels.
///
/// `(x, y)` is the pixel after the transition in scan order; the previous,
/// current and next scan lines contribute.
fn boundary_gradient(bitmap: &BitMatrix, pass: Pass, x: isize, y: isize) -> (f32, f32) {
    let d = |dx: isize, dy: isize| darkness(bitmap, x + dx, y + dy);
    match pass {
        Pass::Rows => {
            let gx = (d(0, -1) + 2.0 * d(0, 0) + d(0, 1)) - (d(-1, -1) + 2.0 * d(-1, 0) + d(-1, 1));
            let gy = (d(-1, 1) + d(0, 1)) - (d(-1, -1) + d(0, -1));
            (gx, gy)
        }
        Pass::Columns => {
            let gy = (d(-1, 0) + 2.0 * d(0, 0) + d(1, 0)) - (d(-1, -1) + 2.0 * d(0, -1) + d(1, -1));
            let gx = (d(1, -1) + d(1, 0)) - (d(-1, -1) + d(-1, 0));
            (gx, gy)
        }
    }
}

/// Run one pass over `bitmap` and file every closed edge that passes `filter`
pub fn track_edges(bitmap: &BitMatrix, pass: Pass, filter: &EdgeFilter, out: &mut EdgeBuckets) {
    let (lines, along) = match pass {
        Pass::Rows => (bitmap.height(), bitmap.width()),
        Pass::Columns => (bitmap.width(), bitmap.height()),
    };
    let pixel = |line: usize, pos: usize| match pass {
        Pass::Rows => bitmap.get(pos, line),
        Pass::Columns => bitmap.get(line, pos),
    };

    let mut open: Vec<OpenEdge> = Vec::new();
    let mut found = 0usize;

    for line in 0..lines {
        let mut previous = pixel(line, 0);
        for pos in 1..along {
            let current = pixel(line, pos);
            if current == previous {
                continue;
            }
            previous = current;

            let (px, py, point) = match pass {
                Pass::Rows => (pos, line, Point::new(pos as f32, line as f32 + 0.5)),
                Pass::Columns => (line, pos, Point::new(line as f32 + 0.5, pos as f32)),
            };
            let (gx, gy) = boundary_gradient(bitmap, pass, px as isize, py as isize);
            if gx.hypot(gy) < GRADIENT_THRESHOLD {
                continue;
            }
            let angle = gy.atan2(gx);
            let lateral_of = |p: &Point| match pass {
                Pass::Rows => (p.x - point.x).abs(),
                Pass::Columns => (p.y - point.y).abs(),
            };

            let best = open
                .iter()
                .enumerate()
                .filter(|(_, e)| {
                    e.last_line < line
                        && e.dark_after == current
                        && lateral_of(&e.last) <= LATERAL_TOLERANCE
                        && angle_difference(e.mean_angle(), angle) < ANGLE_TOLERANCE
                })
                .min_by(|(_, a), (_, b)| lateral_of(&a.last).total_cmp(&lateral_of(&b.last)))
                .map(|(i, _)| i);

            match best {
                Some(i) => open[i].push(point, line, angle),
                None => open.push(OpenEdge::new(point, line, angle, current)),
            }
        }

        let mut i = 0;
        while i < open.len() {
            if line - open[i].last_line > FRONTIER_GAP {
                let closed = open.swap_remove(i);
                if let Some(edge) = closed.close().filter(|e| filter.accepts(e)) {
                    out.insert(edge);
                    found += 1;
                }
            } else {
                i += 1;
            }
        }
    }

    for edge in open.iter().filter_map(OpenEdge::close) {
        if filter.accepts(&edge) {
            out.insert(edge);
            found += 1;
        }
    }
    tracing::debug!(?pass, edges = found, "edge pass complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_rect(width: usize, height: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> BitMatrix {
        BitMatrix::from_fn(width, height, |x, y| x >= x0 && x < x1 && y >= y0 && y < y1)
    }

    fn wide_filter() -> EdgeFilter {
        EdgeFilter {
            min_length: 5.0,
            max_length: 1000.0,
        }
    }

    #[test]
    fn test_rectangle_row_pass_finds_vertical_sides() {
        let bitmap = filled_rect(60, 60, 10, 15, 40, 45);
        let mut buckets = EdgeBuckets::new();
        track_edges(&bitmap, Pass::Rows, &wide_filter(), &mut buckets);

        assert_eq!(buckets.len(), 2);
        for edge in buckets.longest_first() {
            assert!((edge.length() - 30.0).abs() < 0.6, "{edge:?}");
            assert!(edge.direction.x.abs() < 0.01);
            assert!(edge.start.y < 15.6 && edge.end.y > 44.4);
        }
        let xs: Vec<f32> = buckets.longest_first().map(|e| e.centroid.x).collect();
        assert!(xs.iter().any(|x| (x - 10.0).abs() < 0.01));
        assert!(xs.iter().any(|x| (x - 40.0).abs() < 0.01));
    }

    #[test]
    fn test_column_pass_polarity() {
        let bitmap = filled_rect(50, 50, 5, 10, 45, 30);
        let mut buckets = EdgeBuckets::new();
        track_edges(&bitmap, Pass::Columns, &wide_filter(), &mut buckets);
        assert_eq!(buckets.len(), 2);
        let top = buckets
            .longest_first()
            .find(|e| (e.centroid.y - 10.0).abs() < 0.01)
            .unwrap();
        assert!(top.dark_after);
        // Gradient points down into the dark rectangle
        assert!((top.angle - PI / 2.0).abs() < 0.1);
    }

    #[test]
    fn test_filter_drops_short_edges() {
        let bitmap = filled_rect(40, 40, 10, 10, 14, 14);
        let mut buckets = EdgeBuckets::new();
        track_edges(&bitmap, Pass::Rows, &wide_filter(), &mut buckets);
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_line_intersection() {
        let bitmap = filled_rect(60, 60, 10, 10, 50, 50);
        let mut rows = EdgeBuckets::new();
        let mut cols = EdgeBuckets::new();
        track_edges(&bitmap, Pass::Rows, &wide_filter(), &mut rows);
        track_edges(&bitmap, Pass::Columns, &wide_filter(), &mut cols);
        let left = rows.longest_first().find(|e| e.centroid.x < 20.0).unwrap();
        let bottom = cols.longest_first().find(|e| e.centroid.y > 40.0).unwrap();
        let corner = left.intersect(bottom).unwrap();
        assert!(corner.distance(&Point::new(10.0, 50.0)) < 0.05);
    }

    #[test]
    fn test_angle_difference_wraps() {
        assert!((angle_difference(3.1, -3.1) - (TAU - 6.2)).abs() < 1e-4);
        assert!(angle_difference(0.0, PI) > 3.0);
    }

    #[test]
    fn test_bucket_range() {
        let mut buckets = EdgeBuckets::new();
        let bitmap = filled_rect(80, 80, 10, 10, 30, 60);
        track_edges(&bitmap, Pass::Rows, &wide_filter(), &mut buckets);
        track_edges(&bitmap, Pass::Columns, &wide_filter(), &mut buckets);
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets.in_length_range(45.0, 55.0).count(), 2);
        assert_eq!(buckets.longest_first().next().map(|e| e.length().round()), Some(50.0));
    }
}
