//! Pipeline configuration.
//!
//! Defaults reproduce the operational dashboard: a 100×100 lattice, 200
//! contour levels, 0.001° output simplification and the kg/m³ → µg/m³ scale
//! of the CAMS PM2.5 product.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZoneError};

/// Tuning for the Clough–Tocher gradient estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CubicConfig {
    /// Maximum Gauss–Seidel sweeps over all vertices.
    pub max_iterations: usize,
    /// Stop once the largest relative gradient change drops below this.
    pub tolerance: f64,
}

impl Default for CubicConfig {
    fn default() -> Self {
        Self { max_iterations: 400, tolerance: 1e-6 }
    }
}

/// All knobs of one pipeline invocation. Partial JSON files are accepted;
/// missing fields take their default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Lattice rows (latitude axis).
    pub lattice_rows: usize,
    /// Lattice columns (longitude axis).
    pub lattice_cols: usize,
    /// Number of evenly spaced contour levels.
    pub contour_levels: usize,
    /// Closed-ring vertex count below which a loop is dropped.
    pub min_loop_vertices: usize,
    /// Ramer–Douglas–Peucker tolerance for exported geometry, in degrees.
    pub simplify_tolerance: f64,
    /// Multiplier from the snapshot's native unit to µg/m³.
    pub unit_scale: f64,
    pub cubic: CubicConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lattice_rows: 100,
            lattice_cols: 100,
            contour_levels: 200,
            min_loop_vertices: 4,
            simplify_tolerance: 0.001,
            unit_scale: 1e9,
            cubic: CubicConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lattice_rows < 2 || self.lattice_cols < 2 {
            return Err(ZoneError::InvalidConfig(format!(
                "lattice must be at least 2x2, got {}x{}",
                self.lattice_rows, self.lattice_cols
            )));
        }
        if self.contour_levels == 0 {
            return Err(ZoneError::InvalidConfig("contour_levels must be positive".into()));
        }
        if self.min_loop_vertices < 4 {
            // A closed ring needs three distinct corners plus the closing vertex.
            return Err(ZoneError::InvalidConfig(format!(
                "min_loop_vertices must be at least 4, got {}",
                self.min_loop_vertices
            )));
        }
        if !(self.simplify_tolerance >= 0.0 && self.simplify_tolerance.is_finite()) {
            return Err(ZoneError::InvalidConfig(format!(
                "simplify_tolerance must be a non-negative number, got {}",
                self.simplify_tolerance
            )));
        }
        if !(self.unit_scale.is_finite() && self.unit_scale > 0.0) {
            return Err(ZoneError::InvalidConfig(format!(
                "unit_scale must be positive, got {}",
                self.unit_scale
            )));
        }
        if self.cubic.max_iterations == 0 || !(self.cubic.tolerance > 0.0) {
            return Err(ZoneError::InvalidConfig(
                "cubic.max_iterations and cubic.tolerance must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.lattice_rows, 100);
        assert_eq!(cfg.contour_levels, 200);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = PipelineConfig::from_json(r#"{ "contour_levels": 50, "cubic": { "tolerance": 1e-4 } }"#)
            .unwrap();
        assert_eq!(cfg.contour_levels, 50);
        assert_eq!(cfg.lattice_cols, 100);
        assert_eq!(cfg.cubic.tolerance, 1e-4);
        assert_eq!(cfg.cubic.max_iterations, 400);
    }

    #[test]
    fn rejects_tiny_lattice_and_zero_levels() {
        let cfg = PipelineConfig { lattice_rows: 1, ..PipelineConfig::default() };
        assert!(matches!(cfg.validate(), Err(ZoneError::InvalidConfig(_))));
        assert!(PipelineConfig::from_json(r#"{ "contour_levels": 0 }"#).is_err());
        assert!(PipelineConfig::from_json(r#"{ "min_loop_vertices": 3 }"#).is_err());
    }
}
