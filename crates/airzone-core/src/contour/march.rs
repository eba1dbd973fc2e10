//! Marching squares over a lattice padded with one ring of undefined nodes.
//!
//! The padding guarantees that every super-level loop closes, including
//! regions touching the lattice border or the hull of defined nodes.
//! Positions are returned in fractional lattice index space `[row, col]`.

use std::collections::HashMap;

use crate::lattice::Lattice;

/// A lattice edge in padded index space. `H(i, j)` joins nodes (i, j) and
/// (i, j + 1); `V(i, j)` joins (i, j) and (i + 1, j).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Edge {
    H(usize, usize),
    V(usize, usize),
}

/// Oriented segment inside one cell: the super-level region lies on its left.
type Segment = (Edge, Edge);

pub(crate) struct PaddedGrid {
    values: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl PaddedGrid {
    pub fn new(lattice: &Lattice) -> Self {
        let rows = lattice.rows + 2;
        let cols = lattice.cols + 2;
        let mut values = vec![f64::NAN; rows * cols];
        for r in 0..lattice.rows {
            for c in 0..lattice.cols {
                values[(r + 1) * cols + c + 1] = lattice.get(r, c);
            }
        }
        Self { values, rows, cols }
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.cols + j]
    }

    #[inline]
    fn above(&self, i: usize, j: usize, level: f64) -> bool {
        let v = self.at(i, j);
        v.is_finite() && v >= level
    }

    /// Closed loops of the boundary of `{v >= level}`, each as a list of
    /// crossing points without the repeated closing point.
    pub fn march_squares(&self, level: f64) -> Vec<Vec<[f64; 2]>> {
        let segments = self.cell_segments(level);
        connect_segments(&segments)
            .into_iter()
            .map(|chain| chain.into_iter().map(|e| self.crossing(e, level)).collect())
            .collect()
    }

    fn cell_segments(&self, level: f64) -> Vec<Segment> {
        let mut out = Vec::new();
        for i in 0..self.rows - 1 {
            for j in 0..self.cols - 1 {
                let bl = self.above(i, j, level);
                let br = self.above(i, j + 1, level);
                let tr = self.above(i + 1, j + 1, level);
                let tl = self.above(i + 1, j, level);
                let case = bl as u8 | (br as u8) << 1 | (tr as u8) << 2 | (tl as u8) << 3;

                let bottom = Edge::H(i, j);
                let top = Edge::H(i + 1, j);
                let left = Edge::V(i, j);
                let right = Edge::V(i, j + 1);

                match case {
                    1 => out.push((bottom, left)),
                    2 => out.push((right, bottom)),
                    3 => out.push((right, left)),
                    4 => out.push((top, right)),
                    5 => {
                        if self.centre_above(i, j, level) {
                            out.push((bottom, right));
                            out.push((top, left));
                        } else {
                            out.push((bottom, left));
                            out.push((top, right));
                        }
                    }
                    6 => out.push((top, bottom)),
                    7 => out.push((top, left)),
                    8 => out.push((left, top)),
                    9 => out.push((bottom, top)),
                    10 => {
                        if self.centre_above(i, j, level) {
                            out.push((left, bottom));
                            out.push((right, top));
                        } else {
                            out.push((right, bottom));
                            out.push((left, top));
                        }
                    }
                    11 => out.push((right, top)),
                    12 => out.push((left, right)),
                    13 => out.push((bottom, right)),
                    14 => out.push((left, bottom)),
                    // 0 and 15: cell entirely below or above
                    _ => {}
                }
            }
        }
        out
    }

    /// Saddle disambiguation by the cell-centre average. A cell with an
    /// undefined corner counts as below.
    fn centre_above(&self, i: usize, j: usize, level: f64) -> bool {
        let sum = self.at(i, j) + self.at(i, j + 1) + self.at(i + 1, j + 1) + self.at(i + 1, j);
        sum.is_finite() && sum / 4.0 >= level
    }

    /// Crossing position on `edge` in unpadded index space.
    fn crossing(&self, edge: Edge, level: f64) -> [f64; 2] {
        let ((i0, j0), (i1, j1)) = match edge {
            Edge::H(i, j) => ((i, j), (i, j + 1)),
            Edge::V(i, j) => ((i, j), (i + 1, j)),
        };
        let (a, b) = (self.at(i0, j0), self.at(i1, j1));
        // Next to an undefined node the crossing snaps onto the defined one.
        let t = match (a.is_finite(), b.is_finite()) {
            (true, true) => (level - a) / (b - a),
            (true, false) => 0.0,
            _ => 1.0,
        };
        [
            i0 as f64 + t * (i1 as f64 - i0 as f64) - 1.0,
            j0 as f64 + t * (j1 as f64 - j0 as f64) - 1.0,
        ]
    }
}

/// Chain oriented segments into loops by shared edges. Each crossed edge is
/// the exit of exactly one segment and the entry of exactly one other.
fn connect_segments(segments: &[Segment]) -> Vec<Vec<Edge>> {
    let by_entry: HashMap<Edge, usize> = segments.iter().enumerate().map(|(k, s)| (s.0, k)).collect();
    let mut used = vec![false; segments.len()];
    let mut loops = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        let mut chain = Vec::new();
        let mut k = start;
        loop {
            used[k] = true;
            chain.push(segments[k].0);
            match by_entry.get(&segments[k].1) {
                Some(&next) if !used[next] => k = next,
                _ => break,
            }
        }
        loops.push(chain);
    }
    loops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::GeoBounds;

    fn lattice(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Lattice {
        let bounds = GeoBounds { min_lat: 0.0, max_lat: (rows - 1) as f64, min_lon: 0.0, max_lon: (cols - 1) as f64 };
        let mut l = Lattice::undefined(rows, cols, bounds);
        for r in 0..rows {
            for c in 0..cols {
                l.set(r, c, f(r, c));
            }
        }
        l
    }

    #[test]
    fn single_peak_gives_diamond() {
        let l = lattice(3, 3, |r, c| if (r, c) == (1, 1) { 10.0 } else { 0.0 });
        let loops = PaddedGrid::new(&l).march_squares(5.0);
        assert_eq!(loops.len(), 1);
        let ring = &loops[0];
        assert_eq!(ring.len(), 4);
        for p in ring {
            let d = (p[0] - 1.0).abs() + (p[1] - 1.0).abs();
            assert!((d - 0.5).abs() < 1e-12, "{p:?} not on the half-cell diamond");
        }
    }

    #[test]
    fn loops_close_along_the_lattice_border() {
        let l = lattice(4, 4, |_, _| 1.0);
        let loops = PaddedGrid::new(&l).march_squares(1.0);
        assert_eq!(loops.len(), 1);
        // Snapped crossings stay on the defined border nodes.
        for p in &loops[0] {
            assert!(p[0] >= 0.0 && p[0] <= 3.0 && p[1] >= 0.0 && p[1] <= 3.0);
            assert!(p[0] == 0.0 || p[0] == 3.0 || p[1] == 0.0 || p[1] == 3.0);
        }
    }

    #[test]
    fn saddle_with_high_centre_stays_connected() {
        // bl and tr above, centre average above the level.
        let l = lattice(2, 2, |r, c| if r == c { 10.0 } else { 4.0 });
        let grid = PaddedGrid::new(&l);
        assert_eq!(grid.march_squares(6.0).len(), 1);
        assert_eq!(grid.march_squares(8.0).len(), 2);
    }
}
