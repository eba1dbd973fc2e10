//! Grid sampler: flattens one forecast step into scattered samples.

pub mod snapshot;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::error::{Result, ZoneError};

pub use snapshot::{ForecastSnapshot, GridSnapshot, StepGrid, StepRecord};

/// One scattered observation, value already in µg/m³.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(lat: f64, lon: f64, value: f64) -> Self {
        Self { lat, lon, value }
    }
}

/// Calendar labelling of a forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForecastDate {
    pub base_date: NaiveDate,
    pub lead_time_hours: u32,
    /// `base_date` plus whole days of lead time (truncating).
    pub target_date: NaiveDate,
}

impl ForecastDate {
    pub fn new(base_date: NaiveDate, lead_time_hours: u32) -> Self {
        let days = u64::from(lead_time_hours / 24);
        let target_date = base_date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
        Self { base_date, lead_time_hours, target_date }
    }

    /// Display label, `dd/mm/YYYY`.
    pub fn label(&self) -> String {
        self.target_date.format("%d/%m/%Y").to_string()
    }
}

/// Result of sampling one step.
#[derive(Debug, Clone)]
pub struct SampledStep {
    pub samples: Vec<Sample>,
    pub forecast: ForecastDate,
    /// Grid nodes skipped because their value was missing or non-finite.
    pub skipped: usize,
}

/// Flatten forecast step `index` of `snapshot` into samples scaled by `unit_scale`.
pub fn sample_step<S>(snapshot: &S, index: usize, unit_scale: f64) -> Result<SampledStep>
where
    S: ForecastSnapshot + ?Sized,
{
    let step = snapshot.step(index).ok_or(ZoneError::InvalidStepIndex {
        index,
        available: snapshot.step_count(),
    })?;

    let n = step.rows.checked_mul(step.cols).ok_or_else(|| ZoneError::MalformedSnapshot {
        step: index,
        reason: format!("shape {}x{} overflows", step.rows, step.cols),
    })?;
    for (name, len) in [("lats", step.lats.len()), ("lons", step.lons.len()), ("values", step.values.len())] {
        if len != n {
            return Err(ZoneError::MalformedSnapshot {
                step: index,
                reason: format!("{name} has {len} entries, expected {}x{} = {n}", step.rows, step.cols),
            });
        }
    }

    let mut samples = Vec::with_capacity(n);
    let mut skipped = 0usize;
    for i in 0..n {
        let (lat, lon, raw) = (step.lats[i], step.lons[i], step.values[i]);
        if !(lat.is_finite() && lon.is_finite() && raw.is_finite()) {
            skipped += 1;
            continue;
        }
        samples.push(Sample::new(lat, lon, raw * unit_scale));
    }

    let forecast = ForecastDate::new(snapshot.base_date(), step.lead_time_hours);
    tracing::debug!(
        step = index,
        lead_hours = step.lead_time_hours,
        samples = samples.len(),
        skipped,
        target = %forecast.label(),
        "sampled forecast step"
    );

    Ok(SampledStep { samples, forecast, skipped })
}

/// Every step of the snapshot with its calendar labelling, in step order.
pub fn forecast_steps<S>(snapshot: &S) -> Vec<(usize, ForecastDate)>
where
    S: ForecastSnapshot + ?Sized,
{
    (0..snapshot.step_count())
        .filter_map(|i| {
            snapshot
                .step(i)
                .map(|s| (i, ForecastDate::new(snapshot.base_date(), s.lead_time_hours)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Crs;

    fn snapshot() -> GridSnapshot {
        GridSnapshot {
            base_date: NaiveDate::from_ymd_opt(2024, 1, 30).unwrap(),
            crs: Crs::WGS84,
            steps: vec![
                StepRecord {
                    lead_time_hours: 0,
                    rows: 2,
                    cols: 2,
                    lats: vec![-30.0, -30.0, -29.6, -29.6],
                    lons: vec![-53.0, -52.6, -53.0, -52.6],
                    values: vec![1e-8, 2e-8, f64::NAN, 4e-8],
                },
                StepRecord {
                    lead_time_hours: 60,
                    rows: 1,
                    cols: 2,
                    lats: vec![-30.0, -30.0],
                    lons: vec![-53.0],
                    values: vec![1e-8, 2e-8],
                },
            ],
        }
    }

    #[test]
    fn samples_are_scaled_and_missing_values_skipped() {
        let out = sample_step(&snapshot(), 0, 1e9).unwrap();
        assert_eq!(out.samples.len(), 3);
        assert_eq!(out.skipped, 1);
        assert!((out.samples[0].value - 10.0).abs() < 1e-9);
        assert!((out.samples[2].value - 40.0).abs() < 1e-9);
        assert_eq!(out.samples[1].lon, -52.6);
    }

    #[test]
    fn out_of_range_step_is_rejected() {
        let err = sample_step(&snapshot(), 5, 1e9).unwrap_err();
        assert!(matches!(err, ZoneError::InvalidStepIndex { index: 5, available: 2 }));
    }

    #[test]
    fn shape_mismatch_is_malformed() {
        let err = sample_step(&snapshot(), 1, 1e9).unwrap_err();
        assert!(matches!(err, ZoneError::MalformedSnapshot { step: 1, .. }));
    }

    #[test]
    fn oversized_shape_is_malformed() {
        let mut snap = snapshot();
        snap.steps[0] = StepRecord {
            lead_time_hours: 0,
            rows: usize::MAX / 2 + 1,
            cols: 2,
            lats: vec![],
            lons: vec![],
            values: vec![],
        };
        let err = sample_step(&snap, 0, 1e9).unwrap_err();
        assert!(matches!(err, ZoneError::MalformedSnapshot { step: 0, .. }));
    }

    #[test]
    fn target_date_truncates_lead_time_and_crosses_months() {
        let base = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        assert_eq!(ForecastDate::new(base, 12).target_date, base);
        assert_eq!(ForecastDate::new(base, 47).label(), "31/01/2024");
        assert_eq!(ForecastDate::new(base, 60).label(), "01/02/2024");
    }

    #[test]
    fn forecast_steps_lists_every_step() {
        let steps = forecast_steps(&snapshot());
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].0, 1);
        assert_eq!(steps[1].1.label(), "01/02/2024");
    }
}
