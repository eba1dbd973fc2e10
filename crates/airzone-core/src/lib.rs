//! PM2.5 forecast zone classification.
//!
//! A forecast step is sampled from a gridded snapshot, interpolated onto a
//! regular lattice, contoured into iso-value polygons and joined against
//! administrative boundaries. Each boundary ends up in one air-quality
//! [`Category`].

pub mod config;
pub mod contour;
pub mod coords;
pub mod error;
pub mod interpolate;
pub mod lattice;
pub mod pipeline;
pub mod sampler;
pub mod zones;

pub use config::{CubicConfig, PipelineConfig};
pub use contour::{extract_contours, ContourSet, ContourStats, IsoPolygon};
pub use coords::{Crs, GeoBounds};
pub use error::{Result, ZoneError};
pub use interpolate::interpolate_field;
pub use lattice::Lattice;
pub use pipeline::{PipelineOutput, RunStats, ZonePipeline};
pub use sampler::{forecast_steps, sample_step, ForecastDate, ForecastSnapshot, GridSnapshot, Sample};
pub use zones::{classify_boundaries, Boundary, Category, ClassifiedBoundary, ReferenceContext, ZoneMap};
