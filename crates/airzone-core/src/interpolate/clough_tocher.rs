//! Clough–Tocher C1 cubic interpolation on a triangulation.
//!
//! Each triangle is split at its centroid into three cubic Bézier patches.
//! Vertex values and gradients fix the corner control points; the interior
//! control points make the normal derivative along every edge linear, which
//! gives C1 continuity across neighbouring triangles.
//!
//! Vertex gradients come from a global estimate minimising the second
//! derivative along every edge (Nielson's method), iterated Gauss–Seidel
//! style until the largest relative change falls below the tolerance.
use super::delaunay::Triangulation;
use crate::config::CubicConfig;

/// Estimate per-vertex gradients `[d/dx, d/dy]`.
/// Returns the gradients and the number of sweeps used.
pub fn estimate_gradients(tri: &Triangulation, values: &[f64], cfg: &CubicConfig) -> (Vec<[f64; 2]>, usize) {
    let adjacency = tri.vertex_neighbors();
    let mut grad = vec![[0.0f64; 2]; tri.points.len()];

    for sweep in 0..cfg.max_iterations {
        let mut err = 0.0f64;
        for (i, neighbours) in adjacency.iter().enumerate() {
            let (mut q00, mut q01, mut q11) = (0.0, 0.0, 0.0);
            let (mut s0, mut s1) = (0.0, 0.0);
            let pi = tri.points[i];

            for &j in neighbours {
                let pj = tri.points[j];
                let ex = pj[0] - pi[0];
                let ey = pj[1] - pi[1];
                let l = (ex * ex + ey * ey).sqrt();
                let l3 = l * l * l;
                let df2 = -ex * grad[j][0] - ey * grad[j][1];
                let rhs = 6.0 * (values[i] - values[j]) - 2.0 * df2;

                q00 += 4.0 * ex * ex / l3;
                q01 += 4.0 * ex * ey / l3;
                q11 += 4.0 * ey * ey / l3;
                s0 += rhs * ex / l3;
                s1 += rhs * ey / l3;
            }

            let det = q00 * q11 - q01 * q01;
            if det == 0.0 || !det.is_finite() {
                continue;
            }
            let r0 = (q11 * s0 - q01 * s1) / det;
            let r1 = (-q01 * s0 + q00 * s1) / det;

            let change = (grad[i][0] + r0).abs().max((grad[i][1] + r1).abs());
            grad[i] = [-r0, -r1];
            err = err.max(change / 1.0f64.max(r0.abs().max(r1.abs())));
        }
        if err < cfg.tolerance {
            return (grad, sweep + 1);
        }
    }
    (grad, cfg.max_iterations)
}

/// Evaluate the Clough–Tocher patch of triangle `t` at barycentric `b`.
pub fn evaluate(tri: &Triangulation, values: &[f64], grad: &[[f64; 2]], t: usize, b: [f64; 3]) -> f64 {
    let [v0, v1, v2] = tri.triangles[t];
    let [p1, p2, p3] = [tri.points[v0], tri.points[v1], tri.points[v2]];
    let [g1, g2, g3] = [grad[v0], grad[v1], grad[v2]];
    let (f1, f2, f3) = (values[v0], values[v1], values[v2]);

    let e12 = [p2[0] - p1[0], p2[1] - p1[1]];
    let e23 = [p3[0] - p2[0], p3[1] - p2[1]];
    let e31 = [p1[0] - p3[0], p1[1] - p3[1]];
    let e14 = [(e12[0] - e31[0]) / 3.0, (e12[1] - e31[1]) / 3.0];
    let e24 = [(-e12[0] + e23[0]) / 3.0, (-e12[1] + e23[1]) / 3.0];
    let e34 = [(e31[0] - e23[0]) / 3.0, (e31[1] - e23[1]) / 3.0];

    let dot = |g: [f64; 2], e: [f64; 2]| g[0] * e[0] + g[1] * e[1];
    let df12 = dot(g1, e12);
    let df21 = -dot(g2, e12);
    let df23 = dot(g2, e23);
    let df32 = -dot(g3, e23);
    let df31 = dot(g3, e31);
    let df13 = -dot(g1, e31);
    let df14 = dot(g1, e14);
    let df24 = dot(g2, e24);
    let df34 = dot(g3, e34);

    let c3000 = f1;
    let c2100 = (df12 + 3.0 * c3000) / 3.0;
    let c2010 = (df13 + 3.0 * c3000) / 3.0;
    let c0300 = f2;
    let c1200 = (df21 + 3.0 * c0300) / 3.0;
    let c0210 = (df23 + 3.0 * c0300) / 3.0;
    let c0030 = f3;
    let c1020 = (df31 + 3.0 * c0030) / 3.0;
    let c0120 = (df32 + 3.0 * c0030) / 3.0;

    let c2001 = (df14 + 3.0 * c3000) / 3.0;
    let c0201 = (df24 + 3.0 * c0300) / 3.0;
    let c0021 = (df34 + 3.0 * c0030) / 3.0;

    // Edge-normal derivative linearity: weights from the neighbour's centroid,
    // -1/2 on hull edges.
    let mut g = [-0.5f64; 3];
    for (k, gk) in g.iter_mut().enumerate() {
        let Some(nt) = tri.neighbors[t][k] else { continue };
        let [a, b2, c] = tri.triangles[nt].map(|v| tri.points[v]);
        let centroid = [(a[0] + b2[0] + c[0]) / 3.0, (a[1] + b2[1] + c[1]) / 3.0];
        let cb = tri.barycentric(t, centroid);
        *gk = match k {
            0 => (2.0 * cb[2] + cb[1] - 1.0) / (2.0 - 3.0 * cb[2] - 3.0 * cb[1]),
            1 => (2.0 * cb[0] + cb[2] - 1.0) / (2.0 - 3.0 * cb[0] - 3.0 * cb[2]),
            _ => (2.0 * cb[1] + cb[0] - 1.0) / (2.0 - 3.0 * cb[1] - 3.0 * cb[0]),
        };
    }

    let c0111 = (g[0] * (-c0300 + 3.0 * c0210 - 3.0 * c0120 + c0030)
        + (-c0300 + 2.0 * c0210 - c0120 + c0021 + c0201))
        / 2.0;
    let c1011 = (g[1] * (-c0030 + 3.0 * c1020 - 3.0 * c2010 + c3000)
        + (-c0030 + 2.0 * c1020 - c2010 + c2001 + c0021))
        / 2.0;
    let c1101 = (g[2] * (-c3000 + 3.0 * c2100 - 3.0 * c1200 + c0300)
        + (-c3000 + 2.0 * c2100 - c1200 + c2001 + c0201))
        / 2.0;

    let c1002 = (c1101 + c1011 + c2001) / 3.0;
    let c0102 = (c1101 + c0111 + c0201) / 3.0;
    let c0012 = (c1011 + c0111 + c0021) / 3.0;
    let c0003 = (c1002 + c0102 + c0012) / 3.0;

    // Extended barycentric coordinates: the smallest one selects the
    // sub-triangle and becomes the centroid weight.
    let minval = b[0].min(b[1]).min(b[2]);
    let b1 = b[0] - minval;
    let b2 = b[1] - minval;
    let b3 = b[2] - minval;
    let b4 = 3.0 * minval;

    b1.powi(3) * c3000
        + 3.0 * b1 * b1 * b2 * c2100
        + 3.0 * b1 * b1 * b3 * c2010
        + 3.0 * b1 * b1 * b4 * c2001
        + 3.0 * b1 * b2 * b2 * c1200
        + 6.0 * b1 * b2 * b4 * c1101
        + 3.0 * b1 * b3 * b3 * c1020
        + 6.0 * b1 * b3 * b4 * c1011
        + 3.0 * b1 * b4 * b4 * c1002
        + b2.powi(3) * c0300
        + 3.0 * b2 * b2 * b3 * c0210
        + 3.0 * b2 * b2 * b4 * c0201
        + 3.0 * b2 * b3 * b3 * c0120
        + 6.0 * b2 * b3 * b4 * c0111
        + 3.0 * b2 * b4 * b4 * c0102
        + b3.powi(3) * c0030
        + 3.0 * b3 * b3 * b4 * c0021
        + 3.0 * b3 * b4 * b4 * c0012
        + b4.powi(3) * c0003
}
