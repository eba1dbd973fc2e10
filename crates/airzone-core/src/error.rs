//! Error taxonomy for the zone pipeline.
//!
//! Every stage propagates its failure to the immediate caller. An empty
//! classification is not an error (see [`crate::zones::ZoneMap::is_empty`]).

use thiserror::Error;

use crate::coords::Crs;

pub type Result<T> = std::result::Result<T, ZoneError>;

#[derive(Error, Debug)]
pub enum ZoneError {
    /// Requested forecast step is not present in the snapshot.
    #[error("forecast step {index} out of range (snapshot has {available} steps)")]
    InvalidStepIndex { index: usize, available: usize },

    /// Fewer than four usable samples reached the interpolator.
    #[error("cubic interpolation needs at least 4 samples, got {count}")]
    InsufficientSamples { count: usize },

    /// All sample positions lie on one line.
    #[error("sample positions are collinear; no triangulation exists")]
    DegenerateGeometry,

    /// Boundaries and contour polygons are expressed in different CRSs.
    #[error("CRS mismatch: boundaries are {boundaries}, forecast grid is {grid}")]
    CrsMismatch { boundaries: Crs, grid: Crs },

    /// Lat/lon/value arrays disagree with the declared grid shape.
    #[error("malformed snapshot step {step}: {reason}")]
    MalformedSnapshot { step: usize, reason: String },

    /// Two boundary features share one name.
    #[error("duplicate boundary name {0:?}")]
    DuplicateBoundaryName(String),

    #[error("boundary feature #{index} has no string property {property:?}")]
    MissingBoundaryName { index: usize, property: String },

    #[error("boundary {name:?} is not a polygon or multipolygon")]
    UnsupportedGeometry { name: String },

    #[error("unrecognised CRS identifier {0:?}")]
    UnknownCrs(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    GeoJson(#[from] geojson::Error),
}
