//! Coordinate reference systems and geographic extents.
//! All coordinate math uses f64; x is longitude and y is latitude throughout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ZoneError;

/// A coordinate reference system identified by its EPSG code.
///
/// Accepts `EPSG:4326`, OGC URNs (`urn:ogc:def:crs:EPSG::4674`) and the
/// RFC 7946 default `urn:ogc:def:crs:OGC:1.3:CRS84`, which maps to 4326.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs(u32);

impl Crs {
    pub const WGS84: Crs = Crs(4326);

    pub fn epsg(code: u32) -> Self {
        Self(code)
    }

    pub fn code(&self) -> u32 {
        self.0
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::WGS84
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for Crs {
    type Err = ZoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Ok(Self::WGS84);
        }
        let code = if let Some(rest) = upper.strip_prefix("EPSG:") {
            rest
        } else if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            // Version field may be empty: urn:ogc:def:crs:EPSG::4674
            upper.rsplit(':').next().unwrap_or_default()
        } else {
            return Err(ZoneError::UnknownCrs(trimmed.to_string()));
        };
        code.parse::<u32>()
            .map(Self)
            .map_err(|_| ZoneError::UnknownCrs(trimmed.to_string()))
    }
}

impl TryFrom<String> for Crs {
    type Error = ZoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

/// Axis-aligned geographic extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Smallest extent covering every (lat, lon) pair. None for an empty iterator.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (lat0, lon0) = iter.next()?;
        let mut b = Self { min_lat: lat0, max_lat: lat0, min_lon: lon0, max_lon: lon0 };
        for (lat, lon) in iter {
            b.min_lat = b.min_lat.min(lat);
            b.max_lat = b.max_lat.max(lat);
            b.min_lon = b.min_lon.min(lon);
            b.max_lon = b.max_lon.max(lon);
        }
        Some(b)
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}
