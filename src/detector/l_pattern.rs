//! L-pattern matching: pairs of closed edges that meet at a right angle
use std::time::Instant;

use crate::config::ScanOptions;
use crate::detector::edge::{Edge, EdgeBuckets};
use crate::error::ScanError;
use crate::models::{BitMatrix, Point, data_matrix::quad_contains};

/// Black fraction range accepted on the diagonal between the far corners
const DIAGONAL_MIN_DARK: f32 = 0.20;
const DIAGONAL_MAX_DARK: f32 = 0.90;

/// Candidates closer than this at all three corners are the same L
const DUPLICATE_DISTANCE: f32 = 2.0;

/// Three measured corners of a prospective symbol.
///
/// `corner` is where the solid legs meet (bottom-left in symbol
/// orientation), `top_left` ends the leg that runs along the first module
/// column and `bottom_right` ends the leg along the last module row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LCandidate {
    /// Shared corner of the two solid legs
    pub corner: Point,
    /// Far end of the vertical (in symbol space) leg
    pub top_left: Point,
    /// Far end of the horizontal (in symbol space) leg
    pub bottom_right: Point,
}

impl LCandidate {
    /// Parallelogram completion of the three measured corners
    pub fn fourth_corner(&self) -> Point {
        self.top_left.add(&self.bottom_right).sub(&self.corner)
    }

    /// Corners in result order: top-left, top-right, bottom-right, bottom-left
    pub fn quad(&self) -> [Point; 4] {
        [
            self.top_left,
            self.fourth_corner(),
            self.bottom_right,
            self.corner,
        ]
    }

    /// Centre of the completed parallelogram
    pub fn center(&self) -> Point {
        self.top_left.add(&self.bottom_right).scale(0.5)
    }

    fn same_as(&self, other: &LCandidate) -> bool {
        self.corner.distance(&other.corner) < DUPLICATE_DISTANCE
            && self.top_left.distance(&other.top_left) < DUPLICATE_DISTANCE
            && self.bottom_right.distance(&other.bottom_right) < DUPLICATE_DISTANCE
    }
}

/// Geometric limits for pairing edges
#[derive(Debug, Clone, Copy)]
pub struct MatchParams {
    /// Lower bound of the leg length ratio
    pub min_aspect: f32,
    /// Upper bound of the leg length ratio
    pub max_aspect: f32,
    /// Largest |cos| between leg directions
    pub max_cos: f32,
    /// Largest gap between the two leg ends at the corner
    pub corner_max_distance: f32,
    /// Sample the diagonal between the far ends
    pub diagonal_check: bool,
}

impl From<&ScanOptions> for MatchParams {
    fn from(options: &ScanOptions) -> Self {
        Self {
            min_aspect: options.min_aspect_ratio,
            max_aspect: options.max_aspect_ratio,
            max_cos: options.angle_tolerance_deg.to_radians().sin(),
            corner_max_distance: options.corner_max_distance,
            diagonal_check: options.diagonal_check,
        }
    }
}

impl MatchParams {
    fn ratio_ok(&self, a: f32, b: f32) -> bool {
        let in_range = |r: f32| r >= self.min_aspect && r <= self.max_aspect;
        in_range(b / a) || in_range(a / b)
    }
}

fn gradient(edge: &Edge) -> Point {
    Point::new(edge.angle.cos(), edge.angle.sin())
}

/// Try to form an L from two edges
pub fn pair_edges(a: &Edge, b: &Edge, bitmap: &BitMatrix, params: &MatchParams) -> Option<LCandidate> {
    if a.direction.dot(&b.direction).abs() >= params.max_cos {
        return None;
    }

    let ends_a = [(a.start, a.end), (a.end, a.start)];
    let ends_b = [(b.start, b.end), (b.end, b.start)];
    let ((near_a, far_a), (near_b, far_b)) = ends_a
        .iter()
        .flat_map(|ea| ends_b.iter().map(move |eb| (*ea, *eb)))
        .min_by(|x, y| {
            x.0.0
                .distance_squared(&x.1.0)
                .total_cmp(&y.0.0.distance_squared(&y.1.0))
        })?;
    if near_a.distance(&near_b) > params.corner_max_distance {
        return None;
    }

    let corner = a.intersect(b).unwrap_or_else(|| near_a.lerp(&near_b, 0.5));
    if corner.distance(&near_a) > params.corner_max_distance
        || corner.distance(&near_b) > params.corner_max_distance
    {
        return None;
    }

    // Both outer edges of the L have the symbol on their dark side
    if gradient(a).dot(&far_b.sub(&corner)) <= 0.0 || gradient(b).dot(&far_a.sub(&corner)) <= 0.0 {
        return None;
    }

    let (mut top_left, mut bottom_right) = (far_a, far_b);
    if top_left.sub(&corner).cross(&bottom_right.sub(&corner)) < 0.0 {
        std::mem::swap(&mut top_left, &mut bottom_right);
    }

    let candidate = LCandidate {
        corner,
        top_left,
        bottom_right,
    };
    if params.diagonal_check && !diagonal_plausible(bitmap, &top_left, &bottom_right) {
        tracing::trace!(?corner, "diagonal check rejected L");
        return None;
    }
    Some(candidate)
}

fn diagonal_plausible(bitmap: &BitMatrix, from: &Point, to: &Point) -> bool {
    let samples = (from.distance(to).ceil() as usize).max(16);
    let dark = (0..samples)
        .filter(|&i| {
            let p = from.lerp(to, (i as f32 + 0.5) / samples as f32);
            bitmap.sample_nearest(p.x, p.y)
        })
        .count();
    let fraction = dark as f32 / samples as f32;
    fraction > DIAGONAL_MIN_DARK && fraction < DIAGONAL_MAX_DARK
}

/// Pair bucketed edges into L candidates, longest legs first.
///
/// Each unordered pair is tried once. The deadline is checked before every
/// new first leg.
pub fn match_l_patterns(
    edges: &EdgeBuckets,
    bitmap: &BitMatrix,
    params: &MatchParams,
    deadline: Option<Instant>,
) -> Result<Vec<LCandidate>, ScanError> {
    let all: Vec<&Edge> = edges.longest_first().collect();
    let mut candidates: Vec<LCandidate> = Vec::new();
    let shortest_ratio = params.min_aspect.min(1.0 / params.max_aspect);

    for (i, a) in all.iter().enumerate() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ScanError::Timeout);
        }
        let len_a = a.length();
        if len_a <= 0.0 {
            continue;
        }

        // Partners are never longer than `a`: longer ones already had their turn
        for b in all[i + 1..].iter() {
            let len_b = b.length();
            if len_b < len_a * shortest_ratio {
                break;
            }
            if !params.ratio_ok(len_a, len_b) {
                continue;
            }
            let Some(candidate) = pair_edges(a, b, bitmap, params) else {
                continue;
            };
            if candidates.iter().any(|c| c.same_as(&candidate)) {
                continue;
            }
            candidates.push(candidate);
        }
    }

    tracing::debug!(edges = all.len(), candidates = candidates.len(), "l-pattern matching done");
    Ok(candidates)
}

/// True if `candidate` overlaps an already accepted symbol
pub fn overlaps_accepted(candidate: &LCandidate, accepted: &[[Point; 4]]) -> bool {
    let center = candidate.center();
    let quad = candidate.quad();
    accepted.iter().any(|corners| {
        let other_center = corners
            .iter()
            .fold(Point::default(), |acc, p| acc.add(p))
            .scale(0.25);
        quad_contains(corners, &candidate.corner)
            || quad_contains(corners, &center)
            || quad_contains(&quad, &other_center)
    })
}
