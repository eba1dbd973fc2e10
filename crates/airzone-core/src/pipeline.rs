//! Pipeline orchestrator: runs the four stages for one forecast step.

use std::time::Instant;

use geojson::{FeatureCollection, JsonObject};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::contour::{extract_contours, ContourStats};
use crate::error::{Result, ZoneError};
use crate::interpolate::interpolate_field;
use crate::sampler::{sample_step, ForecastDate, ForecastSnapshot};
use crate::zones::{classify_boundaries, ReferenceContext, ZoneMap};

// ── Public structs ────────────────────────────────────────────────────────────

/// Per-run diagnostics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunStats {
    pub samples: usize,
    /// Grid nodes without a finite value.
    pub skipped_samples: usize,
    pub defined_nodes: usize,
    pub contours: ContourStats,
    pub elapsed_ms: u64,
}

/// Full output of one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub step: usize,
    pub forecast: ForecastDate,
    pub zones: ZoneMap,
    pub stats: RunStats,
}

impl PipelineOutput {
    /// Zone features plus `forecast_step`, `lead_time_hours` and
    /// `target_date` foreign members.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let mut fc = self.zones.to_feature_collection();
        let mut members = JsonObject::new();
        members.insert("forecast_step".into(), self.step.into());
        members.insert("lead_time_hours".into(), self.forecast.lead_time_hours.into());
        members.insert("target_date".into(), self.forecast.label().into());
        fc.foreign_members = Some(members);
        fc
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

/// Stateless apart from its configuration; one instance can serve any
/// number of invocations, concurrently included.
#[derive(Debug, Clone)]
pub struct ZonePipeline {
    config: PipelineConfig,
}

impl ZonePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Classify every boundary of `ctx` for forecast step `step`.
    ///
    /// Pipeline order:
    ///   1. Grid sampling
    ///   2. Cubic interpolation onto the lattice
    ///   3. Contour extraction
    ///   4. Spatial join and classification
    pub fn run<S>(&self, snapshot: &S, step: usize, ctx: &ReferenceContext) -> Result<PipelineOutput>
    where
        S: ForecastSnapshot + ?Sized,
    {
        let started = Instant::now();
        let cfg = &self.config;

        if ctx.crs() != snapshot.crs() {
            return Err(ZoneError::CrsMismatch { boundaries: ctx.crs(), grid: snapshot.crs() });
        }

        // ── 1. Grid sampling ────────────────────────────────────────────────
        let sampled = sample_step(snapshot, step, cfg.unit_scale)?;

        // ── 2. Field interpolation ──────────────────────────────────────────
        let lattice = interpolate_field(&sampled.samples, cfg.lattice_rows, cfg.lattice_cols, &cfg.cubic)?;

        // ── 3. Contour extraction ───────────────────────────────────────────
        let contours = extract_contours(&lattice, cfg.contour_levels, cfg.min_loop_vertices);

        // ── 4. Zone classification ──────────────────────────────────────────
        let zones = classify_boundaries(ctx, &contours.polygons, snapshot.crs(), cfg.simplify_tolerance)?;

        let stats = RunStats {
            samples: sampled.samples.len(),
            skipped_samples: sampled.skipped,
            defined_nodes: lattice.defined_count(),
            contours: contours.stats,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            step,
            target = %sampled.forecast.label(),
            zones = zones.len(),
            polygons = contours.polygons.len(),
            elapsed_ms = stats.elapsed_ms,
            "pipeline run complete"
        );

        Ok(PipelineOutput { step, forecast: sampled.forecast, zones, stats })
    }

    /// Run several steps as independent invocations, in parallel with the
    /// `threading` feature. Results keep the order of `steps`.
    pub fn run_steps<S>(&self, snapshot: &S, steps: &[usize], ctx: &ReferenceContext) -> Vec<Result<PipelineOutput>>
    where
        S: ForecastSnapshot + Sync + ?Sized,
    {
        #[cfg(feature = "threading")]
        {
            use rayon::prelude::*;
            steps.par_iter().map(|&step| self.run(snapshot, step, ctx)).collect()
        }
        #[cfg(not(feature = "threading"))]
        {
            steps.iter().map(|&step| self.run(snapshot, step, ctx)).collect()
        }
    }
}

impl Default for ZonePipeline {
    fn default() -> Self {
        Self { config: PipelineConfig::default() }
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Crs;
    use crate::sampler::{GridSnapshot, StepRecord};
    use crate::zones::{Boundary, Category};
    use chrono::NaiveDate;
    use geo::{polygon, MultiPolygon};

    /// Unit square with PM2.5 of 5, 20, 60 and 130 µg/m³ at its corners,
    /// stored in kg/m³.
    fn four_corner_snapshot() -> GridSnapshot {
        let step = |lead_time_hours| StepRecord {
            lead_time_hours,
            rows: 2,
            cols: 2,
            lats: vec![0.0, 0.0, 1.0, 1.0],
            lons: vec![0.0, 1.0, 0.0, 1.0],
            values: vec![5e-9, 20e-9, 60e-9, 130e-9],
        };
        GridSnapshot {
            base_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            crs: Crs::WGS84,
            steps: vec![step(0), step(36)],
        }
    }

    fn square_context(crs: Crs) -> ReferenceContext {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)];
        ReferenceContext::new(vec![Boundary::new("Square", MultiPolygon::new(vec![square]))], crs).unwrap()
    }

    fn small_pipeline() -> ZonePipeline {
        ZonePipeline::new(PipelineConfig {
            lattice_rows: 10,
            lattice_cols: 10,
            contour_levels: 50,
            ..PipelineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn four_corner_field_classifies_as_hazardous() {
        let pipeline = small_pipeline();
        let snapshot = four_corner_snapshot();
        let out = pipeline.run(&snapshot, 0, &square_context(Crs::WGS84)).unwrap();

        assert_eq!(out.zones.len(), 1);
        let zone = out.zones.get("Square").unwrap();
        assert_eq!(zone.category, Category::Hazardous);

        // Within one contour level step of the true maximum.
        let samples = sample_step(&snapshot, 0, 1e9).unwrap().samples;
        let lattice = interpolate_field(&samples, 10, 10, &pipeline.config().cubic).unwrap();
        let levels = extract_contours(&lattice, 50, 4).levels;
        let step = levels[1] - levels[0];
        assert!((zone.value - 130.0).abs() <= step + 1e-9, "value {} vs step {step}", zone.value);

        assert_eq!(out.stats.samples, 4);
        assert_eq!(out.stats.defined_nodes, 100);
        assert_eq!(out.forecast.label(), "10/05/2024");
    }

    #[test]
    fn repeated_runs_are_identical() {
        let pipeline = small_pipeline();
        let snapshot = four_corner_snapshot();
        let ctx = square_context(Crs::WGS84);
        let a = pipeline.run(&snapshot, 1, &ctx).unwrap();
        let b = pipeline.run(&snapshot, 1, &ctx).unwrap();
        assert_eq!(a.zones, b.zones);
        assert_eq!(a.forecast, b.forecast);
        assert_eq!(a.forecast.label(), "11/05/2024");
    }

    #[test]
    fn crs_mismatch_fails_before_sampling() {
        let err = small_pipeline()
            .run(&four_corner_snapshot(), 99, &square_context(Crs::epsg(4674)))
            .unwrap_err();
        assert!(matches!(err, ZoneError::CrsMismatch { .. }));
    }

    #[test]
    fn missing_step_is_reported() {
        let err = small_pipeline()
            .run(&four_corner_snapshot(), 2, &square_context(Crs::WGS84))
            .unwrap_err();
        assert!(matches!(err, ZoneError::InvalidStepIndex { index: 2, available: 2 }));
    }

    #[test]
    fn run_steps_keeps_step_order() {
        let outputs = small_pipeline().run_steps(&four_corner_snapshot(), &[1, 0, 7], &square_context(Crs::WGS84));
        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].as_ref().unwrap().step, 1);
        assert_eq!(outputs[1].as_ref().unwrap().step, 0);
        assert!(outputs[2].is_err());
    }

    #[test]
    fn export_carries_target_date() {
        let out = small_pipeline().run(&four_corner_snapshot(), 1, &square_context(Crs::WGS84)).unwrap();
        let fc = out.to_feature_collection();
        let members = fc.foreign_members.unwrap();
        assert_eq!(members["target_date"], "11/05/2024");
        assert_eq!(members["lead_time_hours"], 36);
        assert_eq!(fc.features.len(), 1);
    }
}
