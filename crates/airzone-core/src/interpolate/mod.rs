//! Field interpolator: scattered samples → regular lattice.
//!
//! Pipeline: dedupe positions → normalise to a unit frame (uniform scale, so
//! the Delaunay property is preserved) → triangulate → estimate gradients →
//! evaluate one Clough–Tocher patch per lattice node. Nodes outside the
//! convex hull of the samples stay undefined; nothing is extrapolated.

pub mod clough_tocher;
pub mod delaunay;

use std::collections::HashSet;

use crate::config::CubicConfig;
use crate::coords::GeoBounds;
use crate::error::{Result, ZoneError};
use crate::lattice::Lattice;
use crate::sampler::Sample;

use delaunay::Triangulation;

/// Minimum number of distinct sample positions for cubic interpolation.
pub const MIN_SAMPLES: usize = 4;

/// A fitted cubic interpolant over a set of samples.
#[derive(Debug, Clone)]
pub struct CubicField {
    tri: Triangulation,
    values: Vec<f64>,
    gradients: Vec<[f64; 2]>,
    bounds: GeoBounds,
    /// Degrees per normalised unit (shared by both axes).
    scale: f64,
}

impl CubicField {
    /// Fit the interpolant. Exact duplicate positions keep the first sample.
    pub fn fit(samples: &[Sample], cfg: &CubicConfig) -> Result<Self> {
        if samples.len() < MIN_SAMPLES {
            return Err(ZoneError::InsufficientSamples { count: samples.len() });
        }

        let mut seen = HashSet::with_capacity(samples.len());
        let unique: Vec<Sample> = samples
            .iter()
            .copied()
            .filter(|s| seen.insert((s.lat.to_bits(), s.lon.to_bits())))
            .collect();
        if unique.len() < samples.len() {
            tracing::debug!(duplicates = samples.len() - unique.len(), "dropped duplicate sample positions");
        }
        if unique.len() < MIN_SAMPLES {
            return Err(ZoneError::InsufficientSamples { count: unique.len() });
        }

        let bounds = GeoBounds::enclosing(unique.iter().map(|s| (s.lat, s.lon)))
            .ok_or(ZoneError::InsufficientSamples { count: 0 })?;
        let scale = bounds.lon_span().max(bounds.lat_span());
        if scale <= 0.0 {
            return Err(ZoneError::DegenerateGeometry);
        }

        let points: Vec<[f64; 2]> = unique
            .iter()
            .map(|s| [(s.lon - bounds.min_lon) / scale, (s.lat - bounds.min_lat) / scale])
            .collect();
        if all_collinear(&points) {
            return Err(ZoneError::DegenerateGeometry);
        }

        let tri = Triangulation::build(points)?;
        let values: Vec<f64> = unique.iter().map(|s| s.value).collect();
        let (gradients, sweeps) = clough_tocher::estimate_gradients(&tri, &values, cfg);
        if sweeps >= cfg.max_iterations {
            tracing::warn!(sweeps, "gradient estimation hit the iteration cap before converging");
        }
        tracing::debug!(
            points = values.len(),
            triangles = tri.triangles.len(),
            sweeps,
            "fitted cubic interpolant"
        );

        Ok(Self { tri, values, gradients, bounds, scale })
    }

    /// Interpolated value at (lat, lon), None outside the sample hull.
    pub fn value_at(&self, lat: f64, lon: f64) -> Option<f64> {
        let p = [(lon - self.bounds.min_lon) / self.scale, (lat - self.bounds.min_lat) / self.scale];
        self.tri
            .locate(p)
            .map(|(t, b)| clough_tocher::evaluate(&self.tri, &self.values, &self.gradients, t, b))
    }

    /// Resample onto a `rows × cols` lattice spanning the sample bounding box.
    pub fn to_lattice(&self, rows: usize, cols: usize) -> Lattice {
        let mut lattice = Lattice::undefined(rows, cols, self.bounds);
        for r in 0..rows {
            let lat = lattice.lat(r);
            for c in 0..cols {
                let lon = lattice.lon(c);
                if let Some(v) = self.value_at(lat, lon) {
                    lattice.set(r, c, v);
                }
            }
        }
        lattice
    }
}

/// Interpolate `samples` onto a `rows × cols` lattice.
pub fn interpolate_field(samples: &[Sample], rows: usize, cols: usize, cfg: &CubicConfig) -> Result<Lattice> {
    let field = CubicField::fit(samples, cfg)?;
    let lattice = field.to_lattice(rows, cols);
    tracing::debug!(
        rows,
        cols,
        defined = lattice.defined_count(),
        "interpolated lattice"
    );
    Ok(lattice)
}

fn all_collinear(points: &[[f64; 2]]) -> bool {
    let p0 = points[0];
    let far = points
        .iter()
        .copied()
        .max_by(|a, b| {
            let da = (a[0] - p0[0]).powi(2) + (a[1] - p0[1]).powi(2);
            let db = (b[0] - p0[0]).powi(2) + (b[1] - p0[1]).powi(2);
            da.total_cmp(&db)
        })
        .unwrap_or(p0);
    let (dx, dy) = (far[0] - p0[0], far[1] - p0[1]);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return true;
    }
    points
        .iter()
        .all(|p| ((p[0] - p0[0]) * dy - (p[1] - p0[1]) * dx).abs() / len < 1e-12)
}
