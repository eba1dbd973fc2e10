//! Contour extractor: lattice → iso-value polygons.
//!
//! Levels are spaced evenly from the smallest to the largest defined value
//! (both inclusive). For each level the boundary loops of `{v >= level}` are
//! traced; every loop with enough vertices becomes one [`IsoPolygon`]
//! tagged with that level. Hole loops are emitted as polygons of their own,
//! so a zone enclosed by a lower-valued region still intersects boundaries
//! that touch its rim.

mod march;

use geo::{Coord, LineString, Polygon};
use serde::Serialize;

use crate::lattice::Lattice;

use march::PaddedGrid;

/// One closed iso-value loop as a simple polygon in lon/lat space.
#[derive(Debug, Clone, PartialEq)]
pub struct IsoPolygon {
    /// Contour level this loop was traced at (µg/m³).
    pub value: f64,
    pub geometry: Polygon<f64>,
}

impl IsoPolygon {
    /// Ring length including the repeated closing vertex.
    pub fn vertex_count(&self) -> usize {
        self.geometry.exterior().0.len()
    }
}

/// Bookkeeping of one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContourStats {
    pub levels: usize,
    /// Loops traced across all levels, kept or not.
    pub loops: usize,
    /// Loops below the vertex minimum after collapsing repeated points.
    pub dropped_degenerate: usize,
    /// Loops with a non-finite coordinate.
    pub dropped_malformed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ContourSet {
    pub polygons: Vec<IsoPolygon>,
    pub levels: Vec<f64>,
    pub stats: ContourStats,
}

/// `n` evenly spaced levels from `min` to `max` inclusive. A zero range
/// (or `n == 1`) yields the single level `min`.
pub fn generate_contour_levels(min: f64, max: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 || max <= min {
        return vec![min];
    }
    let step = (max - min) / (n - 1) as f64;
    (0..n)
        .map(|k| if k == n - 1 { max } else { min + k as f64 * step })
        .collect()
}

/// Extract iso-polygons at `n_levels` levels. Loops whose closed ring has
/// fewer than `min_vertices` vertices are dropped.
pub fn extract_contours(lattice: &Lattice, n_levels: usize, min_vertices: usize) -> ContourSet {
    let (Some(lo), Some(hi)) = (lattice.min_defined(), lattice.max_defined()) else {
        tracing::warn!(rows = lattice.rows, cols = lattice.cols, "lattice has no defined cells; no contours");
        return ContourSet::default();
    };

    let levels = generate_contour_levels(lo, hi, n_levels);
    let grid = PaddedGrid::new(lattice);
    let mut polygons = Vec::new();
    let mut stats = ContourStats { levels: levels.len(), ..ContourStats::default() };

    for &level in &levels {
        for ring in grid.march_squares(level) {
            stats.loops += 1;
            let coords: Vec<Coord<f64>> = ring
                .iter()
                .map(|&[row, col]| {
                    let (x, y) = lattice.index_to_lonlat(row, col);
                    Coord { x, y }
                })
                .collect();

            if coords.iter().any(|c| !(c.x.is_finite() && c.y.is_finite())) {
                stats.dropped_malformed += 1;
                tracing::warn!(level, "dropping contour loop with non-finite coordinates");
                continue;
            }
            let closed = close_ring(coords);
            if closed.len() < min_vertices {
                stats.dropped_degenerate += 1;
                continue;
            }
            polygons.push(IsoPolygon {
                value: level,
                geometry: Polygon::new(LineString::from(closed), vec![]),
            });
        }
    }

    tracing::debug!(
        levels = stats.levels,
        loops = stats.loops,
        kept = polygons.len(),
        dropped_degenerate = stats.dropped_degenerate,
        dropped_malformed = stats.dropped_malformed,
        "extracted contours"
    );
    ContourSet { polygons, levels, stats }
}

/// Collapse consecutive repeats (snapped crossings) and append the closing vertex.
fn close_ring(points: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    let mut ring: Vec<Coord<f64>> = Vec::with_capacity(points.len() + 1);
    for p in points {
        if ring.last() != Some(&p) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if let Some(&first) = ring.first() {
        ring.push(first);
    }
    ring
}
