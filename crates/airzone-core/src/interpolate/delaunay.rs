//! Delaunay triangulation of scattered points, indexed for point location.
//!
//! The triangulation itself comes from geo's spade integration; this module
//! maps the resulting triangles back onto point indices. Output triangles are
//! counter-clockwise and `neighbors[t][k]` is the triangle across the edge
//! opposite vertex `k` (None on the convex hull).
use std::collections::{BTreeSet, HashMap};

use geo::{LineString, TriangulateSpade};
use rstar::{RTree, RTreeObject, AABB};

use crate::error::{Result, ZoneError};

/// Barycentric slack when locating points on shared edges and hull edges.
const LOCATE_EPS: f64 = 1e-10;
/// Triangles with smaller doubled area (normalised units) are slivers from
/// near-collinear hull points and are discarded.
const MIN_DOUBLE_AREA: f64 = 1e-14;

#[derive(Debug, Clone)]
pub struct Triangulation {
    pub points: Vec<[f64; 2]>,
    pub triangles: Vec<[usize; 3]>,
    pub neighbors: Vec<[Option<usize>; 3]>,
    index: RTree<TriangleEntry>,
}

#[derive(Debug, Clone)]
struct TriangleEntry {
    triangle: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for TriangleEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

#[inline]
fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

#[inline]
fn coord_key(p: [f64; 2]) -> (u64, u64) {
    (p[0].to_bits(), p[1].to_bits())
}

impl Triangulation {
    /// Triangulate `points`. Fails with `DegenerateGeometry` when no
    /// non-degenerate triangle exists (all points collinear) or a coordinate
    /// cannot be inserted.
    pub fn build(points: Vec<[f64; 2]>) -> Result<Self> {
        if points.len() < 3 {
            return Err(ZoneError::DegenerateGeometry);
        }

        // Only the vertices of the line string take part in an unconstrained triangulation.
        let cloud = LineString::from(points.clone());
        let faces = cloud.unconstrained_triangulation().map_err(|e| {
            tracing::debug!(error = %e, "delaunay insertion failed");
            ZoneError::DegenerateGeometry
        })?;

        let mut slot: HashMap<(u64, u64), usize> = HashMap::with_capacity(points.len());
        for (i, &p) in points.iter().enumerate() {
            slot.entry(coord_key(p)).or_insert(i);
        }

        let mut triangles = Vec::with_capacity(faces.len());
        for face in &faces {
            let mut t = [0usize; 3];
            for (k, c) in face.to_array().iter().enumerate() {
                t[k] = *slot.get(&coord_key([c.x, c.y])).ok_or(ZoneError::DegenerateGeometry)?;
            }
            let area2 = orient(points[t[0]], points[t[1]], points[t[2]]);
            if area2.abs() <= MIN_DOUBLE_AREA {
                continue;
            }
            if area2 < 0.0 {
                t.swap(1, 2);
            }
            triangles.push(t);
        }

        if triangles.is_empty() {
            return Err(ZoneError::DegenerateGeometry);
        }

        let neighbors = compute_neighbors(&triangles);
        let entries = triangles
            .iter()
            .enumerate()
            .map(|(ti, t)| {
                let xs = t.map(|v| points[v][0]);
                let ys = t.map(|v| points[v][1]);
                TriangleEntry {
                    triangle: ti,
                    envelope: AABB::from_corners(
                        [xs.iter().cloned().fold(f64::INFINITY, f64::min), ys.iter().cloned().fold(f64::INFINITY, f64::min)],
                        [xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max), ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max)],
                    ),
                }
            })
            .collect();

        Ok(Self { points, triangles, neighbors, index: RTree::bulk_load(entries) })
    }

    /// Barycentric coordinates of `p` with respect to triangle `t`.
    pub fn barycentric(&self, t: usize, p: [f64; 2]) -> [f64; 3] {
        let [a, b, c] = self.triangles[t].map(|v| self.points[v]);
        let det = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);
        let l0 = ((b[1] - c[1]) * (p[0] - c[0]) + (c[0] - b[0]) * (p[1] - c[1])) / det;
        let l1 = ((c[1] - a[1]) * (p[0] - c[0]) + (a[0] - c[0]) * (p[1] - c[1])) / det;
        [l0, l1, 1.0 - l0 - l1]
    }

    /// Triangle containing `p` and its barycentric coordinates, or None
    /// outside the convex hull. Points on shared edges resolve to the
    /// candidate they are most inside, lowest index first.
    pub fn locate(&self, p: [f64; 2]) -> Option<(usize, [f64; 3])> {
        let query = AABB::from_point(p);
        let mut best: Option<(usize, [f64; 3], f64)> = None;
        for entry in self.index.locate_in_envelope_intersecting(&query) {
            let bary = self.barycentric(entry.triangle, p);
            let inside = bary.iter().cloned().fold(f64::INFINITY, f64::min);
            if inside < -LOCATE_EPS {
                continue;
            }
            let better = match best {
                None => true,
                Some((bt, _, bi)) => inside > bi || (inside == bi && entry.triangle < bt),
            };
            if better {
                best = Some((entry.triangle, bary, inside));
            }
        }
        best.map(|(t, bary, _)| (t, bary))
    }

    /// Sorted adjacency list: for each vertex, the vertices sharing an edge with it.
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut sets = vec![BTreeSet::new(); self.points.len()];
        for t in &self.triangles {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                sets[a].insert(b);
                sets[b].insert(a);
            }
        }
        sets.into_iter().map(|s| s.into_iter().collect()).collect()
    }
}

fn compute_neighbors(triangles: &[[usize; 3]]) -> Vec<[Option<usize>; 3]> {
    let mut owner: HashMap<(usize, usize), usize> = HashMap::with_capacity(triangles.len() * 3);
    for (ti, t) in triangles.iter().enumerate() {
        for k in 0..3 {
            owner.insert((t[k], t[(k + 1) % 3]), ti);
        }
    }
    triangles
        .iter()
        .map(|t| {
            let across = |a: usize, b: usize| owner.get(&(b, a)).copied();
            [across(t[1], t[2]), across(t[2], t[0]), across(t[0], t[1])]
        })
        .collect()
}
