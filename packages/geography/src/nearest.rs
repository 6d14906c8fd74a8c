//! Nearest-municipality and containing-neighborhood search.
//!
//! Both searches are linear scans over the reference dataset. The dataset
//! is small and fixed, so no spatial index is needed here.

use sector_map_geography_models::{AdministrativeArea, Coordinate};

use crate::distance::distance_km;
use crate::reference::ReferenceDataset;

/// Sub-area label used when no registered neighborhood contains a point.
pub const FALLBACK_SUB_AREA: &str = "Centro";

/// Returns the area whose center is closest to `coordinate`.
///
/// Ties keep the first declared area. The dataset is validated non-empty at
/// load time, so a result always exists.
#[must_use]
pub fn nearest_area<'a>(
    dataset: &'a ReferenceDataset,
    coordinate: &Coordinate,
) -> &'a AdministrativeArea {
    let areas = dataset.areas();
    let mut best = &areas[0];
    let mut best_distance = distance_km(coordinate, &best.center);

    for area in &areas[1..] {
        let distance = distance_km(coordinate, &area.center);
        if distance < best_distance {
            best = area;
            best_distance = distance;
        }
    }

    log::trace!(
        "Nearest area to {}, {} is {} ({best_distance:.2} km)",
        coordinate.latitude,
        coordinate.longitude,
        best.name
    );

    best
}

/// Returns the name of the first sub-area of `area_key` whose inclusion
/// radius contains `coordinate`, or [`FALLBACK_SUB_AREA`].
///
/// Radii may overlap. Overlaps are resolved by declaration order, not by
/// distance: an earlier sub-area wins even when a later one is closer.
#[must_use]
pub fn nearest_sub_area<'a>(
    dataset: &'a ReferenceDataset,
    coordinate: &Coordinate,
    area_key: &str,
) -> &'a str {
    dataset
        .sub_areas_of(area_key)
        .find(|sub_area| distance_km(coordinate, &sub_area.center) <= sub_area.radius_km)
        .map_or(FALLBACK_SUB_AREA, |sub_area| sub_area.name.as_str())
}
