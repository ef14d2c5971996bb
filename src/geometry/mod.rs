//! Core geometry and feature types.
//!
//! Features are GeoJSON-compatible: a [`Feature`] serializes to
//! `{"type": "Feature", "id": ..., "geometry": ..., "properties": ...}` and a
//! [`Geometry`] to `{"type": "Point" | "LineString" | "Polygon",
//! "coordinates": ...}`. Only these three geometry types are supported.

pub mod planar;
pub mod spherical;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single `[lng, lat]` coordinate pair in GeoJSON axis order.
pub type Position = [f64; 2];

/// Open key/value property map attached to every feature.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Opaque feature identifier, unique within one store instance.
///
/// Generated and validated by the store's
/// [`IdStrategy`](crate::store::IdStrategy); the default strategy emits
/// 36-character hyphenated UUID tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Supported geometry variants.
///
/// Coordinate invariants:
/// - `LineString` carries at least two coordinates.
/// - `Polygon` rings are closed (first coordinate equals the last) and carry
///   at least four coordinates each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
}

impl Geometry {
    /// Returns the GeoJSON geometry type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
        }
    }

    /// Checks the per-type coordinate invariants.
    ///
    /// Returns `None` when the geometry is well-formed, otherwise a
    /// human-readable reason suitable for load rejection reporting.
    pub fn shape_error(&self) -> Option<String> {
        match self {
            Geometry::Point(position) => {
                if !position.iter().all(|c| c.is_finite()) {
                    return Some("Point coordinates must be finite numbers".to_string());
                }
            }
            Geometry::LineString(coords) => {
                if coords.len() < 2 {
                    return Some("LineString must have at least two coordinates".to_string());
                }
                if !coords.iter().flatten().all(|c| c.is_finite()) {
                    return Some("LineString coordinates must be finite numbers".to_string());
                }
            }
            Geometry::Polygon(rings) => {
                if rings.is_empty() {
                    return Some("Polygon must have at least one ring".to_string());
                }
                for ring in rings {
                    if ring.len() < 4 {
                        return Some(
                            "Polygon rings must have at least four coordinates".to_string(),
                        );
                    }
                    if ring.first() != ring.last() {
                        return Some(
                            "Polygon rings must be closed (first coordinate equals last)"
                                .to_string(),
                        );
                    }
                    if !ring.iter().flatten().all(|c| c.is_finite()) {
                        return Some("Polygon coordinates must be finite numbers".to_string());
                    }
                }
            }
        }
        None
    }

    /// Rounds every coordinate to `decimals` decimal digits in place.
    ///
    /// Applied by the store before any geometry is committed so that stored
    /// coordinates never exceed the configured precision.
    pub fn limit_precision(&mut self, decimals: u32) {
        match self {
            Geometry::Point(position) => *position = limit_precision(*position, decimals),
            Geometry::LineString(coords) => {
                for position in coords.iter_mut() {
                    *position = limit_precision(*position, decimals);
                }
            }
            Geometry::Polygon(rings) => {
                for ring in rings.iter_mut() {
                    for position in ring.iter_mut() {
                        *position = limit_precision(*position, decimals);
                    }
                }
            }
        }
    }
}

/// Rounds a single coordinate pair to `decimals` decimal digits.
pub fn limit_precision(position: Position, decimals: u32) -> Position {
    let factor = 10f64.powi(decimals as i32);
    [
        (position[0] * factor).round() / factor,
        (position[1] * factor).round() / factor,
    ]
}

/// GeoJSON object tag for features. Always serializes as `"Feature"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureType {
    #[default]
    Feature,
}

/// One authored geometry plus its identifier and properties.
///
/// This is the wire format the store exports via
/// [`copy_all`](crate::store::FeatureStore::copy_all) and accepts back via
/// [`load`](crate::store::FeatureStore::load). Properties always include a
/// string `mode` tag naming the drawing mode that produced the feature; in
/// tracked configuration they additionally carry numeric `createdAt` /
/// `updatedAt` epoch-millisecond stamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default)]
    pub feature_type: FeatureType,
    pub id: FeatureId,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Properties,
}

impl Feature {
    pub fn new(id: FeatureId, geometry: Geometry, properties: Properties) -> Self {
        Self {
            feature_type: FeatureType::Feature,
            id,
            geometry,
            properties,
        }
    }
}

/// Axis-aligned bounding box in `[lng, lat]` space.
///
/// Used as the spatial index's indexing key. Point geometries produce a
/// zero-area box; polygons are bounded by their outer ring only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Zero-area box around a single coordinate.
    pub fn from_position(position: Position) -> Self {
        Self {
            min_x: position[0],
            min_y: position[1],
            max_x: position[0],
            max_y: position[1],
        }
    }

    /// Smallest box enclosing every coordinate in the slice.
    ///
    /// Returns a zero-area box at the origin for an empty slice; callers
    /// guard against empty geometry before indexing.
    pub fn from_positions(positions: &[Position]) -> Self {
        let Some(first) = positions.first() else {
            return Self::from_position([0.0, 0.0]);
        };
        let mut bbox = Self::from_position(*first);
        for position in &positions[1..] {
            bbox.min_x = bbox.min_x.min(position[0]);
            bbox.min_y = bbox.min_y.min(position[1]);
            bbox.max_x = bbox.max_x.max(position[0]);
            bbox.max_y = bbox.max_y.max(position[1]);
        }
        bbox
    }

    /// Bounding box of a geometry.
    ///
    /// For polygons only the outer ring contributes; holes never extend
    /// beyond it.
    pub fn from_geometry(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Point(position) => Self::from_position(*position),
            Geometry::LineString(coords) => Self::from_positions(coords),
            Geometry::Polygon(rings) => {
                Self::from_positions(rings.first().map(Vec::as_slice).unwrap_or(&[]))
            }
        }
    }

    /// True when the two boxes overlap (touching edges count as overlap).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_serializes_as_geojson() {
        let geometry = Geometry::Point([10.0, 20.0]);
        let json = serde_json::to_value(&geometry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "Point", "coordinates": [10.0, 20.0]})
        );
    }

    #[test]
    fn feature_round_trips_through_json() {
        let feature = Feature::new(
            FeatureId::from("abc"),
            Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]),
            Properties::new(),
        );
        let json = serde_json::to_string(&feature).unwrap();
        assert!(json.contains("\"type\":\"Feature\""));
        let back: Feature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, feature);
    }

    #[test]
    fn shape_error_rejects_short_linestrings() {
        let geometry = Geometry::LineString(vec![[0.0, 0.0]]);
        assert!(geometry.shape_error().is_some());
    }

    #[test]
    fn shape_error_rejects_open_polygon_rings() {
        let geometry = Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
        ]]);
        let reason = geometry.shape_error().expect("open ring should fail");
        assert!(reason.contains("closed"));
    }

    #[test]
    fn shape_error_accepts_closed_polygon() {
        let geometry = Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
        ]]);
        assert!(geometry.shape_error().is_none());
    }

    #[test]
    fn limit_precision_rounds_coordinates() {
        let mut geometry = Geometry::Point([1.23456789, -9.87654321]);
        geometry.limit_precision(4);
        assert_eq!(geometry, Geometry::Point([1.2346, -9.8765]));
    }

    #[test]
    fn polygon_bbox_uses_outer_ring_only() {
        let geometry = Geometry::Polygon(vec![
            vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
            vec![[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 1.0]],
        ]);
        let bbox = BoundingBox::from_geometry(&geometry);
        assert_eq!(bbox.min_x, 0.0);
        assert_eq!(bbox.max_x, 4.0);
        assert_eq!(bbox.max_y, 4.0);
    }

    #[test]
    fn point_bbox_is_zero_area() {
        let bbox = BoundingBox::from_geometry(&Geometry::Point([3.0, 7.0]));
        assert_eq!(bbox.min_x, bbox.max_x);
        assert_eq!(bbox.min_y, bbox.max_y);
    }

    #[test]
    fn bbox_intersection_includes_touching_edges() {
        let a = BoundingBox::from_positions(&[[0.0, 0.0], [1.0, 1.0]]);
        let b = BoundingBox::from_positions(&[[1.0, 1.0], [2.0, 2.0]]);
        let c = BoundingBox::from_positions(&[[5.0, 5.0], [6.0, 6.0]]);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
