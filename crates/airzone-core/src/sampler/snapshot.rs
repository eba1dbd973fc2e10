//! Forecast snapshot access.
//!
//! The pipeline only needs, per step, three equally shaped 2D arrays
//! (latitude, longitude, value), the run's base date and the step's lead
//! time. [`ForecastSnapshot`] is that narrow interface; [`GridSnapshot`] is
//! the JSON-backed implementation the CLI reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::coords::Crs;
use crate::error::Result;

/// One forecast step as row-major `rows × cols` arrays.
#[derive(Debug, Clone, Copy)]
pub struct StepGrid<'a> {
    pub lead_time_hours: u32,
    pub rows: usize,
    pub cols: usize,
    pub lats: &'a [f64],
    pub lons: &'a [f64],
    pub values: &'a [f64],
}

/// Read access to a gridded forecast run.
pub trait ForecastSnapshot {
    /// Date of the forecast run (analysis time, 00 UTC).
    fn base_date(&self) -> NaiveDate;

    /// CRS of the lat/lon arrays.
    fn crs(&self) -> Crs;

    fn step_count(&self) -> usize;

    /// Step `index`, or None past the end.
    fn step(&self, index: usize) -> Option<StepGrid<'_>>;
}

fn null_as_nan_vec<'de, D: serde::Deserializer<'de>>(
    d: D,
) -> std::result::Result<Vec<f64>, D::Error> {
    let v: Vec<Option<f64>> = Vec::deserialize(d)?;
    Ok(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
}

/// Serialised form of one step. `null` values mean missing data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub lead_time_hours: u32,
    pub rows: usize,
    pub cols: usize,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    #[serde(deserialize_with = "null_as_nan_vec")]
    pub values: Vec<f64>,
}

/// In-memory snapshot, typically deserialised from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub base_date: NaiveDate,
    #[serde(default)]
    pub crs: Crs,
    pub steps: Vec<StepRecord>,
}

impl GridSnapshot {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ForecastSnapshot for GridSnapshot {
    fn base_date(&self) -> NaiveDate {
        self.base_date
    }

    fn crs(&self) -> Crs {
        self.crs
    }

    fn step_count(&self) -> usize {
        self.steps.len()
    }

    fn step(&self, index: usize) -> Option<StepGrid<'_>> {
        self.steps.get(index).map(|s| StepGrid {
            lead_time_hours: s.lead_time_hours,
            rows: s.rows,
            cols: s.cols,
            lats: &s.lats,
            lons: &s.lons,
            values: &s.values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_with_null_values_and_default_crs() {
        let snap = GridSnapshot::from_json(
            r#"{
                "base_date": "2024-05-10",
                "steps": [{
                    "lead_time_hours": 12, "rows": 1, "cols": 2,
                    "lats": [-30.0, -30.0], "lons": [-53.0, -52.6],
                    "values": [1.5e-8, null]
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(snap.crs(), Crs::WGS84);
        assert_eq!(snap.step_count(), 1);
        let step = snap.step(0).unwrap();
        assert_eq!(step.lead_time_hours, 12);
        assert!(step.values[1].is_nan());
        assert!(snap.step(1).is_none());
    }
}
