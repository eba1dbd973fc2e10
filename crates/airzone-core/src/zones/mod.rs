//! Zone classifier: spatial join of boundaries against iso-polygons.
//!
//! Each boundary takes the highest iso-level among the polygons it
//! intersects (shared area or a touching edge both count) and is classified
//! from that value. Boundaries touching no polygon are left out of the map.
//! Candidates come from an R-tree over polygon envelopes; the exact
//! `intersects` test runs only on those.

pub mod boundary;
pub mod category;

use std::collections::BTreeMap;

use geo::{BoundingRect, Intersects, MultiPolygon, Rect, Simplify};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use rstar::{RTree, RTreeObject, AABB};

use crate::contour::IsoPolygon;
use crate::coords::Crs;
use crate::error::{Result, ZoneError};

pub use boundary::{Boundary, ReferenceContext, DEFAULT_NAME_PROPERTY};
pub use category::{Category, ALL_CATEGORIES};

/// A boundary with its representative value and category.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedBoundary {
    pub name: String,
    /// Highest iso-level intersecting the boundary (µg/m³).
    pub value: f64,
    pub category: Category,
    /// Boundary geometry after simplification; display only.
    pub geometry: MultiPolygon<f64>,
}

/// Classified boundaries keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneMap {
    zones: BTreeMap<String, ClassifiedBoundary>,
}

impl ZoneMap {
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn get(&self, name: &str) -> Option<&ClassifiedBoundary> {
        self.zones.get(name)
    }

    /// Zones in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedBoundary> {
        self.zones.values()
    }

    /// Number of zones per category, best to worst.
    pub fn category_counts(&self) -> [(Category, usize); 5] {
        ALL_CATEGORIES.map(|c| (c, self.iter().filter(|z| z.category == c).count()))
    }

    /// GeoJSON export; each feature carries `name`, `value`, `category`
    /// and the legend `color`.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let features = self
            .iter()
            .map(|zone| {
                let mut properties = JsonObject::new();
                properties.insert("name".into(), zone.name.clone().into());
                properties.insert("value".into(), zone.value.into());
                properties.insert("category".into(), zone.category.label().into());
                properties.insert("color".into(), zone.category.color().into());
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(geojson::Value::from(&zone.geometry))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();
        FeatureCollection { bbox: None, features, foreign_members: None }
    }
}

impl<'a> IntoIterator for &'a ZoneMap {
    type Item = &'a ClassifiedBoundary;
    type IntoIter = std::collections::btree_map::Values<'a, String, ClassifiedBoundary>;

    fn into_iter(self) -> Self::IntoIter {
        self.zones.values()
    }
}

struct ZoneEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn aabb(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// Join `polygons` (in `grid_crs`) against every boundary of `ctx`.
///
/// Fails with `CrsMismatch` before any geometry work when the two CRSs
/// differ. An empty result is not an error.
pub fn classify_boundaries(
    ctx: &ReferenceContext,
    polygons: &[IsoPolygon],
    grid_crs: Crs,
    simplify_tolerance: f64,
) -> Result<ZoneMap> {
    if ctx.crs() != grid_crs {
        return Err(ZoneError::CrsMismatch { boundaries: ctx.crs(), grid: grid_crs });
    }

    let entries: Vec<ZoneEntry> = polygons
        .iter()
        .enumerate()
        .filter_map(|(index, p)| {
            let rect: Option<Rect<f64>> = p.geometry.bounding_rect().into();
            rect.map(|r| ZoneEntry { index, envelope: aabb(r) })
        })
        .collect();
    let tree = RTree::bulk_load(entries);

    let mut zones = BTreeMap::new();
    for boundary in ctx.boundaries() {
        let rect: Option<Rect<f64>> = boundary.geometry.bounding_rect().into();
        let Some(rect) = rect else { continue };

        // Max over intersecting levels; ties keep the value, so order is irrelevant.
        let value = tree
            .locate_in_envelope_intersecting(&aabb(rect))
            .map(|e| &polygons[e.index])
            .filter(|p| boundary.geometry.intersects(&p.geometry))
            .map(|p| p.value)
            .reduce(f64::max);
        let Some(value) = value else { continue };

        zones.insert(
            boundary.name.clone(),
            ClassifiedBoundary {
                name: boundary.name.clone(),
                value,
                category: Category::classify(value),
                geometry: boundary.geometry.simplify(&simplify_tolerance),
            },
        );
    }

    if zones.is_empty() {
        tracing::warn!(
            boundaries = ctx.len(),
            polygons = polygons.len(),
            "no boundary intersects any contour polygon"
        );
    } else {
        tracing::debug!(classified = zones.len(), boundaries = ctx.len(), "classified boundaries");
    }
    Ok(ZoneMap { zones })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    fn square(x0: f64, y0: f64, size: f64) -> geo::Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]
    }

    fn iso(value: f64, x0: f64, y0: f64, size: f64) -> IsoPolygon {
        IsoPolygon { value, geometry: square(x0, y0, size) }
    }

    fn context(boundaries: Vec<(&str, geo::Polygon<f64>)>) -> ReferenceContext {
        ReferenceContext::new(
            boundaries
                .into_iter()
                .map(|(n, p)| Boundary::new(n, MultiPolygon::new(vec![p])))
                .collect(),
            Crs::WGS84,
        )
        .unwrap()
    }

    #[test]
    fn representative_value_is_the_maximum() {
        let ctx = context(vec![("Pelotas", square(0.0, 0.0, 1.0))]);
        let polygons = vec![iso(10.0, -1.0, -1.0, 3.0), iso(40.0, 0.2, 0.2, 0.5), iso(90.0, 0.8, 0.8, 1.0)];
        let map = classify_boundaries(&ctx, &polygons, Crs::WGS84, 0.001).unwrap();
        let zone = map.get("Pelotas").unwrap();
        assert_eq!(zone.value, 90.0);
        assert_eq!(zone.category, Category::VeryPoor);
        assert_eq!(zone.category.label(), "Very Poor");
    }

    #[test]
    fn non_overlapping_boundaries_are_excluded() {
        let ctx = context(vec![("Inside", square(0.0, 0.0, 1.0)), ("Far", square(10.0, 10.0, 1.0))]);
        let map = classify_boundaries(&ctx, &[iso(20.0, 0.0, 0.0, 2.0)], Crs::WGS84, 0.001).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.get("Far").is_none());
        assert_eq!(map.get("Inside").unwrap().category, Category::Moderate);
    }

    #[test]
    fn touching_counts_as_intersecting() {
        let ctx = context(vec![("Neighbour", square(1.0, 0.0, 1.0))]);
        let map = classify_boundaries(&ctx, &[iso(60.0, 0.0, 0.0, 1.0)], Crs::WGS84, 0.0).unwrap();
        assert_eq!(map.get("Neighbour").unwrap().category, Category::Poor);
    }

    #[test]
    fn empty_join_is_not_an_error() {
        let ctx = context(vec![("Far", square(10.0, 10.0, 1.0))]);
        let map = classify_boundaries(&ctx, &[iso(20.0, 0.0, 0.0, 1.0)], Crs::WGS84, 0.001).unwrap();
        assert!(map.is_empty());
        let map = classify_boundaries(&ctx, &[], Crs::WGS84, 0.001).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn crs_mismatch_is_rejected() {
        let ctx = context(vec![("Pelotas", square(0.0, 0.0, 1.0))]);
        let err = classify_boundaries(&ctx, &[iso(20.0, 0.0, 0.0, 1.0)], Crs::epsg(4674), 0.001).unwrap_err();
        assert!(matches!(err, ZoneError::CrsMismatch { .. }));
    }

    #[test]
    fn simplification_does_not_change_the_category() {
        // A square with a tiny notch; simplification removes the notch vertex.
        let notched = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.5, y: 0.0002),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let ctx = context(vec![("Notched", notched)]);
        let map = classify_boundaries(&ctx, &[iso(130.0, 0.4, -0.1, 0.2)], Crs::WGS84, 0.001).unwrap();
        let zone = map.get("Notched").unwrap();
        assert_eq!(zone.category, Category::Hazardous);
        assert_eq!(zone.geometry.0[0].exterior().0.len(), 5);
        assert!((zone.geometry.unsigned_area() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn exports_feature_properties() {
        let ctx = context(vec![("B", square(0.0, 0.0, 1.0)), ("A", square(0.5, 0.5, 1.0))]);
        let map = classify_boundaries(&ctx, &[iso(14.999, 0.0, 0.0, 2.0)], Crs::WGS84, 0.001).unwrap();
        let fc = map.to_feature_collection();
        assert_eq!(fc.features.len(), 2);
        let first = &fc.features[0];
        assert_eq!(first.property("name").and_then(|v| v.as_str()), Some("A"));
        assert_eq!(first.property("category").and_then(|v| v.as_str()), Some("Good"));
        assert_eq!(first.property("color").and_then(|v| v.as_str()), Some("#70E17B"));
        assert!(first.geometry.is_some());
        assert_eq!(map.category_counts()[0], (Category::Good, 2));
    }
}
