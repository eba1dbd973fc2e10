use serde::{Deserialize, Serialize};

use crate::coords::GeoBounds;

/// A regular 2D lattice of interpolated concentrations (µg/m³), row-major.
/// Row 0 is the minimum latitude, column 0 the minimum longitude. Nodes are
/// spaced like `linspace`: the first and last rows/columns sit exactly on the
/// bounds. `NaN` marks an undefined node (outside the sample hull); any
/// other non-finite value is treated the same way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lattice {
    /// Row-major values; `NaN` where undefined.
    pub data: Vec<f64>,
    pub rows: usize,
    pub cols: usize,
    pub bounds: GeoBounds,
}

impl Lattice {
    /// Create a lattice with every node undefined.
    pub fn undefined(rows: usize, cols: usize, bounds: GeoBounds) -> Self {
        Self { data: vec![f64::NAN; rows * cols], rows, cols, bounds }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f64) {
        self.data[row * self.cols + col] = val;
    }

    /// Latitude of lattice row `row`.
    #[inline]
    pub fn lat(&self, row: usize) -> f64 {
        axis_coord(self.bounds.min_lat, self.bounds.max_lat, self.rows, row as f64)
    }

    /// Longitude of lattice column `col`.
    #[inline]
    pub fn lon(&self, col: usize) -> f64 {
        axis_coord(self.bounds.min_lon, self.bounds.max_lon, self.cols, col as f64)
    }

    /// Map fractional (row, col) index coordinates to (lon, lat).
    #[inline]
    pub fn index_to_lonlat(&self, row: f64, col: f64) -> (f64, f64) {
        (
            axis_coord(self.bounds.min_lon, self.bounds.max_lon, self.cols, col),
            axis_coord(self.bounds.min_lat, self.bounds.max_lat, self.rows, row),
        )
    }

    pub fn is_defined(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_finite()
    }

    pub fn defined_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_finite()).count()
    }

    /// Smallest defined value, or None when every node is undefined.
    pub fn min_defined(&self) -> Option<f64> {
        self.data.iter().copied().filter(|v| v.is_finite()).reduce(f64::min)
    }

    /// Largest defined value, or None when every node is undefined.
    pub fn max_defined(&self) -> Option<f64> {
        self.data.iter().copied().filter(|v| v.is_finite()).reduce(f64::max)
    }
}

fn axis_coord(min: f64, max: f64, n: usize, index: f64) -> f64 {
    if n < 2 {
        return min;
    }
    min + index * (max - min) / (n - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_bounds() -> GeoBounds {
        GeoBounds { min_lat: 0.0, max_lat: 1.0, min_lon: 0.0, max_lon: 2.0 }
    }

    #[test]
    fn node_coordinates_follow_linspace() {
        let lat = Lattice::undefined(3, 5, unit_bounds());
        assert_eq!(lat.lat(0), 0.0);
        assert_eq!(lat.lat(2), 1.0);
        assert_eq!(lat.lon(0), 0.0);
        assert_eq!(lat.lon(4), 2.0);
        assert!((lat.lon(1) - 0.5).abs() < 1e-12);
        let (x, y) = lat.index_to_lonlat(1.0, 2.0);
        assert!((x - 1.0).abs() < 1e-12);
        assert!((y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn defined_range_ignores_nan() {
        let mut lat = Lattice::undefined(2, 2, unit_bounds());
        assert_eq!(lat.min_defined(), None);
        assert_eq!(lat.defined_count(), 0);
        lat.set(0, 1, 7.0);
        lat.set(1, 0, -2.0);
        assert_eq!(lat.min_defined(), Some(-2.0));
        assert_eq!(lat.max_defined(), Some(7.0));
        assert_eq!(lat.defined_count(), 2);
        assert!(!lat.is_defined(0, 0));
    }
}
