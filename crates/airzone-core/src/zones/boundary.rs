//! Administrative boundaries and the read-only reference context.

use std::collections::HashSet;

use geo::MultiPolygon;
use geojson::FeatureCollection;

use crate::coords::Crs;
use crate::error::{Result, ZoneError};

/// Feature property holding the municipality name in IBGE boundary files.
pub const DEFAULT_NAME_PROPERTY: &str = "NM_MUN";

/// One named administrative area.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl Boundary {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self { name: name.into(), geometry }
    }
}

/// The boundary set every classification joins against. Built once, then
/// shared read-only across invocations.
#[derive(Debug, Clone)]
pub struct ReferenceContext {
    boundaries: Vec<Boundary>,
    crs: Crs,
}

impl ReferenceContext {
    /// Fails with `DuplicateBoundaryName` if two boundaries share a name.
    pub fn new(boundaries: Vec<Boundary>, crs: Crs) -> Result<Self> {
        let mut seen = HashSet::with_capacity(boundaries.len());
        for b in &boundaries {
            if !seen.insert(b.name.as_str()) {
                return Err(ZoneError::DuplicateBoundaryName(b.name.clone()));
            }
        }
        Ok(Self { boundaries, crs })
    }

    /// Load boundaries from a GeoJSON feature collection.
    ///
    /// Each feature's name is read from the string property `name_property`;
    /// its geometry must be a Polygon or MultiPolygon. The CRS is `crs` when
    /// given, otherwise the legacy `crs` member of the collection, otherwise
    /// WGS84 (the RFC 7946 default).
    pub fn from_geojson(text: &str, name_property: &str, crs: Option<Crs>) -> Result<Self> {
        let collection: FeatureCollection = text.parse()?;
        let crs = match crs {
            Some(c) => c,
            None => declared_crs(&collection)?.unwrap_or_default(),
        };

        let mut boundaries = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.iter().enumerate() {
            let name = feature
                .property(name_property)
                .and_then(|v| v.as_str())
                .ok_or_else(|| ZoneError::MissingBoundaryName {
                    index,
                    property: name_property.to_string(),
                })?;
            let unsupported = || ZoneError::UnsupportedGeometry { name: name.to_string() };
            let value = &feature.geometry.as_ref().ok_or_else(unsupported)?.value;
            let geometry = match geo::Geometry::<f64>::try_from(value)? {
                geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                geo::Geometry::MultiPolygon(mp) => mp,
                _ => return Err(unsupported()),
            };
            boundaries.push(Boundary::new(name, geometry));
        }

        tracing::debug!(boundaries = boundaries.len(), %crs, "loaded reference boundaries");
        Self::new(boundaries, crs)
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }
}

/// `{"crs": {"type": "name", "properties": {"name": "..."}}}` (GeoJSON 2008).
fn declared_crs(collection: &FeatureCollection) -> Result<Option<Crs>> {
    let name = collection
        .foreign_members
        .as_ref()
        .and_then(|m| m.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str());
    name.map(str::parse::<Crs>).transpose()
}
