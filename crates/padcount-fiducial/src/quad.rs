//! Polygon approximation and sub-pixel corner refinement for closed contours.
//!
//! Contour points are pixel centres of the boundary pixels of a dark region.

use nalgebra::{Point2, Vector2};

/// Closed-contour Douglas–Peucker simplification.
///
/// Returns indices into `contour` of the kept vertices, in contour order.
pub(crate) fn approx_polygon(contour: &[Point2<f32>], epsilon: f32) -> Vec<usize> {
    let n = contour.len();
    if n < 3 {
        return (0..n).collect();
    }

    // Anchor on two extreme points so neither sits in the middle of a side.
    let a = farthest_from(contour, contour[0]);
    let b = farthest_from(contour, contour[a]);

    let mut keep = vec![false; n];
    keep[a] = true;
    keep[b] = true;

    let forward: Vec<usize> = cyclic_range(a, b, n).collect();
    let backward: Vec<usize> = cyclic_range(b, a, n).collect();
    simplify_chain(contour, &forward, epsilon, &mut keep);
    simplify_chain(contour, &backward, epsilon, &mut keep);

    let mut vertices: Vec<usize> = (0..n).filter(|&i| keep[i]).collect();
    drop_collinear(contour, &mut vertices, epsilon);
    vertices
}

fn farthest_from(points: &[Point2<f32>], p: Point2<f32>) -> usize {
    let mut best = 0;
    let mut best_d = -1.0f32;
    for (i, q) in points.iter().enumerate() {
        let d = (q - p).norm_squared();
        if d > best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Indices `from, from+1, ..., to` modulo `n` (inclusive on both ends).
fn cyclic_range(from: usize, to: usize, n: usize) -> impl Iterator<Item = usize> {
    let len = (to + n - from) % n + 1;
    (0..len).map(move |k| (from + k) % n)
}

fn simplify_chain(points: &[Point2<f32>], chain: &[usize], epsilon: f32, keep: &mut [bool]) {
    if chain.len() < 3 {
        return;
    }
    let mut stack = vec![(0usize, chain.len() - 1)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let pa = points[chain[lo]];
        let pb = points[chain[hi]];
        let mut far = lo;
        let mut far_d = 0.0f32;
        for (k, &idx) in chain.iter().enumerate().take(hi).skip(lo + 1) {
            let d = distance_to_segment(points[idx], pa, pb);
            if d > far_d {
                far_d = d;
                far = k;
            }
        }
        if far_d > epsilon {
            keep[chain[far]] = true;
            stack.push((lo, far));
            stack.push((far, hi));
        }
    }
}

fn drop_collinear(points: &[Point2<f32>], vertices: &mut Vec<usize>, epsilon: f32) {
    loop {
        let m = vertices.len();
        if m <= 3 {
            return;
        }
        let removable = (0..m).find(|&k| {
            let prev = points[vertices[(k + m - 1) % m]];
            let next = points[vertices[(k + 1) % m]];
            distance_to_segment(points[vertices[k]], prev, next) <= epsilon
        });
        match removable {
            Some(k) => {
                vertices.remove(k);
            }
            None => return,
        }
    }
}

fn distance_to_segment(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < 1e-12 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Signed shoelace area; positive for clockwise winding in image (y-down) coordinates.
pub(crate) fn signed_area(poly: &[Point2<f32>]) -> f32 {
    let n = poly.len();
    let mut acc = 0.0f32;
    for i in 0..n {
        let p = poly[i];
        let q = poly[(i + 1) % n];
        acc += p.x * q.y - q.x * p.y;
    }
    0.5 * acc
}

pub(crate) fn is_convex(quad: &[Point2<f32>; 4]) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        let c = quad[(i + 2) % 4];
        let cross = (b - a).perp(&(c - b));
        if cross.abs() < 1e-6 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Line `n · p = d` with unit normal `n`.
#[derive(Clone, Copy, Debug)]
struct Line {
    n: Vector2<f32>,
    d: f32,
}

fn fit_line(points: &[Point2<f32>]) -> Option<Line> {
    if points.len() < 2 {
        return None;
    }
    let inv = 1.0 / points.len() as f32;
    let mx = points.iter().map(|p| p.x).sum::<f32>() * inv;
    let my = points.iter().map(|p| p.y).sum::<f32>() * inv;
    let (mut sxx, mut sxy, mut syy) = (0.0f32, 0.0f32, 0.0f32);
    for p in points {
        let dx = p.x - mx;
        let dy = p.y - my;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx + syy < 1e-6 {
        return None;
    }
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let n = Vector2::new(-theta.sin(), theta.cos());
    Some(Line {
        n,
        d: n.x * mx + n.y * my,
    })
}

fn intersect(a: Line, b: Line) -> Option<Point2<f32>> {
    let det = a.n.x * b.n.y - a.n.y * b.n.x;
    if det.abs() < 1e-6 {
        return None;
    }
    Some(Point2::new(
        (a.d * b.n.y - b.d * a.n.y) / det,
        (a.n.x * b.d - b.n.x * a.d) / det,
    ))
}

/// Refine four polygon vertices by fitting a line to each side's contour
/// points and intersecting neighbouring sides.
///
/// Each side line is pushed half a pixel outward so the corners land on the
/// region's outer pixel edges rather than on its boundary pixel centres.
/// Falls back to the raw vertex when a side cannot be fitted or the refined
/// corner strays too far.
pub(crate) fn refine_quad(contour: &[Point2<f32>], vertices: [usize; 4]) -> [Point2<f32>; 4] {
    let n = contour.len();
    let raw = vertices.map(|i| contour[i]);
    let centroid = Point2::from(raw.iter().map(|p| p.coords).sum::<Vector2<f32>>() / 4.0);

    let mut lines = [None; 4];
    for (k, line) in lines.iter_mut().enumerate() {
        let side: Vec<Point2<f32>> = cyclic_range(vertices[k], vertices[(k + 1) % 4], n)
            .map(|i| contour[i])
            .collect();
        let trim = (side.len() / 10).max(1);
        if side.len() <= 2 * trim + 1 {
            continue;
        }
        *line = fit_line(&side[trim..side.len() - trim]).map(|mut l| {
            if l.n.dot(&centroid.coords) > l.d {
                l.n = -l.n;
                l.d = -l.d;
            }
            l.d += 0.5;
            l
        });
    }

    let side_len = (signed_area(&raw).abs()).sqrt();
    let tolerance = 3.0 + 0.1 * side_len;

    let mut out = raw;
    for k in 0..4 {
        // corner k joins side k-1 (ending at vertex k) and side k (starting there)
        let (Some(prev), Some(next)) = (lines[(k + 3) % 4], lines[k]) else {
            continue;
        };
        if let Some(p) = intersect(prev, next) {
            if (p - raw[k]).norm() <= tolerance {
                out[k] = p;
            }
        }
    }
    out
}
