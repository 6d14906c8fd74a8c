#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index over census sector polygons.
//!
//! Built from a `GeoJSON` `FeatureCollection` (one feature per sector, as
//! served by the IBGE mesh API), stored in an R-tree, and queried with a
//! point. The sector whose polygon contains the point wins; when none does
//! (gaps in the mesh, points on a shared edge) the sector with the nearest
//! centroid is used instead.

use geo::{Centroid as _, Contains as _, MultiPolygon};
use geojson::{FeatureCollection, GeoJson, JsonValue};
use rstar::{AABB, RTree, RTreeObject};
use sector_map_geography::distance::distance_km;
use sector_map_geography_models::Coordinate;
use thiserror::Error;

/// Feature property holding the sector identifier in IBGE meshes.
pub const DEFAULT_ID_PROPERTY: &str = "id_setor";

/// Errors that can occur while building a [`SectorIndex`].
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The input was not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    /// The input was valid `GeoJSON` but not a `FeatureCollection`.
    #[error("Expected a FeatureCollection, got {kind}")]
    NotFeatureCollection {
        /// The top-level `GeoJSON` kind that was found.
        kind: &'static str,
    },
}

/// A sector polygon stored in the R-tree with its identifier.
struct SectorEntry {
    sector_id: String,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
    centroid: Coordinate,
}

impl RTreeObject for SectorEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index for the sectors of one municipality.
pub struct SectorIndex {
    sectors: RTree<SectorEntry>,
}

impl SectorIndex {
    /// Parses a `GeoJSON` `FeatureCollection` and indexes its sectors.
    ///
    /// # Errors
    ///
    /// * If the text is not valid `GeoJSON`
    /// * If the top-level object is not a `FeatureCollection`
    pub fn from_geojson_str(geojson_str: &str, id_property: &str) -> Result<Self, SpatialError> {
        let geojson: GeoJson = geojson_str.parse().map_err(Box::new)?;

        match geojson {
            GeoJson::FeatureCollection(collection) => {
                Ok(Self::from_feature_collection(collection, id_property))
            }
            GeoJson::Feature(_) => Err(SpatialError::NotFeatureCollection { kind: "Feature" }),
            GeoJson::Geometry(_) => Err(SpatialError::NotFeatureCollection { kind: "Geometry" }),
        }
    }

    /// Indexes the sectors of an already-parsed `FeatureCollection`.
    ///
    /// Features without a usable identifier or without a polygonal
    /// geometry are skipped.
    #[must_use]
    pub fn from_feature_collection(collection: FeatureCollection, id_property: &str) -> Self {
        let total = collection.features.len();
        let mut entries = Vec::with_capacity(total);

        for feature in collection.features {
            let Some(sector_id) = feature.property(id_property).and_then(property_to_id) else {
                log::debug!("Skipping sector feature without '{id_property}'");
                continue;
            };

            let Some(polygon) = feature.geometry.and_then(geometry_to_multipolygon) else {
                log::warn!("Skipping sector {sector_id}: geometry is missing or not polygonal");
                continue;
            };

            let Some(centroid) = polygon.centroid() else {
                log::warn!("Skipping sector {sector_id}: empty polygon");
                continue;
            };

            entries.push(SectorEntry {
                sector_id,
                envelope: compute_envelope(&polygon),
                polygon,
                centroid: Coordinate::new(centroid.y(), centroid.x()),
            });
        }

        log::debug!("Indexed {} of {total} sector features", entries.len());

        Self {
            sectors: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed sectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sectors.size()
    }

    /// Whether no sector was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sectors.size() == 0
    }

    /// Returns the sector whose polygon contains `coordinate`.
    ///
    /// Sectors tile a municipality without overlap, so first match wins.
    #[must_use]
    pub fn lookup_containing(&self, coordinate: &Coordinate) -> Option<&str> {
        let point = geo::Point::new(coordinate.longitude, coordinate.latitude);
        let query_env = AABB::from_point([coordinate.longitude, coordinate.latitude]);

        self.sectors
            .locate_in_envelope_intersecting(&query_env)
            .find(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.sector_id.as_str())
    }

    /// Returns the sector whose centroid is closest to `coordinate`.
    ///
    /// Distances are great-circle, so this is a linear scan rather than an
    /// R-tree nearest-neighbor query in degree space.
    #[must_use]
    pub fn nearest_centroid(&self, coordinate: &Coordinate) -> Option<&str> {
        let mut best: Option<(&SectorEntry, f64)> = None;

        for entry in self.sectors.iter() {
            let distance = distance_km(coordinate, &entry.centroid);
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((entry, distance));
            }
        }

        best.map(|(entry, _)| entry.sector_id.as_str())
    }

    /// Containing sector first, nearest centroid second.
    #[must_use]
    pub fn lookup(&self, coordinate: &Coordinate) -> Option<&str> {
        self.lookup_containing(coordinate)
            .or_else(|| self.nearest_centroid(coordinate))
    }
}

/// Accepts string or integer identifiers. Blank strings are unusable.
fn property_to_id(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        JsonValue::Number(n) => n.as_u64().map(|n| n.to_string()),
        _ => None,
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn geometry_to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
