//! Geometry refinement and module counting
//!
//! Starting from an L candidate, the fourth corner is completed and pushed
//! outward until the quiet zone is reached. The module size comes from the
//! thickness of the solid legs; the module counts come from the run widths
//! of the two clock tracks.

use crate::decoder::tables::SymbolKind;
use crate::detector::l_pattern::LCandidate;
use crate::detector::sampler::{SymbolQuad, module_is_dark};
use crate::models::{BitMatrix, DarknessSampler, Point};

/// Distance of the quiet-zone probe strip outside a side, in pixels
const QUIET_ZONE_OFFSET: f32 = 1.5;
/// White fraction the probe strip needs
const QUIET_ZONE_WHITE: f32 = 0.85;
/// Step used when pushing the fourth corner outward, in pixels
const NUDGE_STEP: f32 = 0.5;
/// Step along a clock track, in pixels
const TRACK_STEP: f32 = 0.25;
/// Offset passes along each clock track
const TRACK_PASSES: usize = 10;
/// Passes that must read a regular track
const MIN_USABLE_PASSES: usize = 4;
/// Share of runs that must sit near the mode for a pass to be regular
const REGULAR_SHARE: f32 = 0.6;
/// Leg positions probed for the module size
const LEG_PROBES: [f32; 7] = [0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];

/// Measured outline and module counts of a candidate symbol
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolGeometry {
    /// Refined outline
    pub quad: SymbolQuad,
    /// Thickness of one module, in pixels
    pub module_size: f32,
    /// Estimated module rows
    pub rows: f32,
    /// Estimated module columns
    pub cols: f32,
}

impl SymbolGeometry {
    /// Counts rounded to whole modules
    pub fn rounded(&self) -> (usize, usize) {
        (self.rows.round() as usize, self.cols.round() as usize)
    }
}

fn white_fraction(bitmap: &BitMatrix, from: &Point, to: &Point, outward: &Point) -> f32 {
    let shift = outward.scale(QUIET_ZONE_OFFSET);
    let (a, b) = (from.add(&shift), to.add(&shift));
    let samples = (a.distance(&b).ceil() as usize).max(8);
    let white = (0..samples)
        .filter(|&i| {
            let p = a.lerp(&b, (i as f32 + 0.5) / samples as f32);
            !bitmap.sample_nearest(p.x, p.y)
        })
        .count();
    white as f32 / samples as f32
}

fn push_outward(bitmap: &BitMatrix, anchor: &Point, corner: Point, outward: &Point, limit: f32) -> Point {
    let mut offset = 0.0;
    while offset <= limit {
        let moved = corner.add(&outward.scale(offset));
        if white_fraction(bitmap, anchor, &moved, outward) >= QUIET_ZONE_WHITE {
            return moved;
        }
        offset += NUDGE_STEP;
    }
    corner
}

/// Complete the parallelogram and push the fourth corner out to the quiet zone.
///
/// The corner moves at most `fraction` of the leg length along each side
/// normal; when no white strip is found it stays where completion put it.
pub fn refine_fourth_corner(bitmap: &BitMatrix, candidate: &LCandidate, fraction: f32) -> SymbolQuad {
    let p = candidate.corner;
    let pa = candidate.top_left;
    let pb = candidate.bottom_right;
    let mut d = candidate.fourth_corner();

    if let (Some(right), Some(up)) = (pb.sub(&p).normalized(), pa.sub(&p).normalized()) {
        d = push_outward(bitmap, &pb, d, &right, fraction * p.distance(&pb));
        d = push_outward(bitmap, &pa, d, &up, fraction * p.distance(&pa));
    }

    SymbolQuad {
        top_left: pa,
        top_right: d,
        bottom_right: pb,
        bottom_left: p,
    }
}

fn dark_run_from(bitmap: &BitMatrix, start: &Point, inward: &Point, limit: f32) -> Option<f32> {
    let mut t = 0.0;
    // The fitted edge can sit slightly outside the bar
    while t < 1.5 {
        let p = start.add(&inward.scale(t));
        if bitmap.sample_nearest(p.x, p.y) {
            break;
        }
        t += TRACK_STEP;
    }
    let begin = t;
    while t < limit {
        let p = start.add(&inward.scale(t));
        if !bitmap.sample_nearest(p.x, p.y) {
            return (t > begin).then_some(t - begin);
        }
        t += TRACK_STEP;
    }
    None
}

/// Module size from the thinnest dark run across either solid leg
pub fn module_size(bitmap: &BitMatrix, candidate: &LCandidate) -> Option<f32> {
    let p = candidate.corner;
    let pa = candidate.top_left;
    let pb = candidate.bottom_right;
    let up = pa.sub(&p).normalized()?;
    let right = pb.sub(&p).normalized()?;
    let limit = p.distance(&pa).min(p.distance(&pb)) * 0.5;

    let legs = [(&pb, &up), (&pa, &right)];
    let size = legs
        .iter()
        .flat_map(|&(far, inward)| {
            LEG_PROBES
                .iter()
                .filter_map(move |&t| dark_run_from(bitmap, &p.lerp(far, t), inward, limit))
        })
        .min_by(f32::total_cmp)?;
    (size >= 1.0).then_some(size)
}

/// Runs along one scan line, as `(start, length)` in pixels.
///
/// Samples sit in the middle of each step; a transition is placed halfway
/// between the two samples that disagree. The first and last runs are cut
/// by the line ends and are dropped.
fn interior_runs(bitmap: &BitMatrix, from: &Point, to: &Point) -> Vec<(f32, f32)> {
    let length = from.distance(to);
    let steps = (length / TRACK_STEP).floor() as usize;
    if steps < 2 {
        return Vec::new();
    }
    let sample = |i: usize| {
        let p = from.lerp(to, (i as f32 + 0.5) * TRACK_STEP / length);
        bitmap.sample_nearest(p.x, p.y)
    };

    let mut runs = Vec::new();
    let mut run_start = 0.0f32;
    let mut previous = sample(0);
    for i in 1..steps {
        let current = sample(i);
        if current != previous {
            let t = i as f32 * TRACK_STEP;
            runs.push((run_start, t - run_start));
            run_start = t;
            previous = current;
        }
    }
    if !runs.is_empty() {
        runs.remove(0);
    }
    runs
}

/// Weighted mode of the run lengths: the busiest 1 px bin averaged with its neighbours
fn weighted_mode(runs: &[f32]) -> Option<f32> {
    let max_bin = runs.iter().map(|r| r.round() as usize).max()?;
    let mut histogram = vec![0usize; max_bin + 2];
    for r in runs {
        histogram[r.round() as usize] += 1;
    }
    let (mode, _) = histogram
        .iter()
        .enumerate()
        .skip(1)
        .max_by_key(|&(bin, count)| (*count, std::cmp::Reverse(bin)))?;

    let (mut weight, mut sum) = (0usize, 0usize);
    for bin in mode.saturating_sub(1)..=mode + 1 {
        let count = histogram.get(bin).copied().unwrap_or(0);
        weight += count;
        sum += count * bin;
    }
    (weight > 0).then(|| sum as f32 / weight as f32)
}

/// Reading of one offset pass along a clock track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackReading {
    /// Estimated modules along the track
    pub count: f32,
    /// Interior module boundaries, as fractions of the track length
    pub boundaries: Vec<f32>,
}

/// Read one pass along a clock track; `None` if the pass is not regular
pub fn read_track(bitmap: &BitMatrix, from: &Point, to: &Point) -> Option<TrackReading> {
    let length = from.distance(to);
    let runs = interior_runs(bitmap, from, to);
    if runs.len() < 3 {
        return None;
    }
    let widths: Vec<f32> = runs.iter().map(|&(_, w)| w).collect();
    let mode = weighted_mode(&widths)?;
    let tolerance = (mode * 0.25).max(1.0);
    let regular: Vec<f32> = widths
        .iter()
        .copied()
        .filter(|w| (w - mode).abs() <= tolerance)
        .collect();
    if (regular.len() as f32) < REGULAR_SHARE * widths.len() as f32 {
        return None;
    }

    let mean = regular.iter().sum::<f32>() / regular.len() as f32;
    let mut boundaries: Vec<f32> = runs.iter().map(|&(start, _)| start / length).collect();
    if let Some(&(start, width)) = runs.last() {
        boundaries.push((start + width) / length);
    }
    Some(TrackReading {
        count: length / mean,
        boundaries,
    })
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f32::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) * 0.5
    } else {
        values[mid]
    })
}

/// Passes across the first module of a clock track, from `from` to `to`
fn track_passes<'a>(
    bitmap: &'a BitMatrix,
    from: Point,
    to: Point,
    inward: Point,
    module_size: f32,
) -> impl Iterator<Item = TrackReading> + 'a {
    (0..TRACK_PASSES).filter_map(move |i| {
        let offset = module_size * (0.2 + 0.6 * i as f32 / (TRACK_PASSES - 1) as f32);
        let shift = inward.scale(offset);
        read_track(bitmap, &from.add(&shift), &to.add(&shift))
    })
}

fn count_track(bitmap: &BitMatrix, from: Point, to: Point, inward: Point, module_size: f32) -> Option<f32> {
    let mut counts: Vec<f32> = track_passes(bitmap, from, to, inward, module_size)
        .map(|r| r.count)
        .collect();
    if counts.len() < MIN_USABLE_PASSES {
        tracing::trace!(usable = counts.len(), "clock track unreadable");
        return None;
    }
    median(&mut counts)
}

/// Estimate `(rows, cols)` from the two clock tracks.
///
/// Counts within one module of each other are averaged and made equal.
pub fn count_modules(bitmap: &BitMatrix, quad: &SymbolQuad, module_size: f32) -> Option<(f32, f32)> {
    let down = quad.bottom_left.sub(&quad.top_left).normalized()?;
    let left = quad.bottom_left.sub(&quad.bottom_right).normalized()?;
    let cols = count_track(bitmap, quad.top_left, quad.top_right, down, module_size)?;
    let rows = count_track(bitmap, quad.bottom_right, quad.top_right, left, module_size)?;

    if (rows - cols).abs() <= 1.0 {
        let both = (rows + cols) * 0.5;
        return Some((both, both));
    }
    Some((rows, cols))
}

/// Interior module boundaries of both clock tracks, `(rows top to bottom, cols left to right)`.
///
/// Uses the pass through the middle of the track module.
pub fn clock_boundaries(bitmap: &BitMatrix, quad: &SymbolQuad, module_size: f32) -> Option<(Vec<f32>, Vec<f32>)> {
    let down = quad.bottom_left.sub(&quad.top_left).normalized()?;
    let left = quad.bottom_left.sub(&quad.bottom_right).normalized()?;
    let middle = |from: Point, to: Point, inward: Point| {
        let shift = inward.scale(module_size * 0.5);
        read_track(bitmap, &from.add(&shift), &to.add(&shift))
    };
    let cols = middle(quad.top_left, quad.top_right, down)?.boundaries;
    let rows_bottom_up = middle(quad.bottom_right, quad.top_right, left)?.boundaries;
    let rows = rows_bottom_up.iter().rev().map(|f| 1.0 - f).collect();
    Some((rows, cols))
}

/// ECC200 leaves the module between the clock tracks light; legacy symbols darken it
pub fn probe_symbol_kind<S: DarknessSampler + ?Sized>(
    sampler: &S,
    quad: &SymbolQuad,
    rows: usize,
    cols: usize,
) -> SymbolKind {
    if rows == 0 || cols == 0 {
        return SymbolKind::Ecc200;
    }
    if module_is_dark(sampler, quad, rows, cols, 0, cols - 1) {
        SymbolKind::Legacy
    } else {
        SymbolKind::Ecc200
    }
}

/// Refine a candidate and estimate its module counts
pub fn measure(bitmap: &BitMatrix, candidate: &LCandidate, refine_fraction: f32) -> Option<SymbolGeometry> {
    let module_size = module_size(bitmap, candidate)?;
    let quad = refine_fourth_corner(bitmap, candidate, refine_fraction);
    let (rows, cols) = count_modules(bitmap, &quad, module_size)?;
    tracing::trace!(module_size, rows, cols, "symbol geometry measured");
    Some(SymbolGeometry {
        quad,
        module_size,
        rows,
        cols,
    })
}
