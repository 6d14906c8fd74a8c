#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic reference types for census sector resolution.
//!
//! These types describe the fixed reference region (a single Brazilian
//! state), its municipalities ("areas") and the neighborhoods ("sub-areas")
//! registered under them. They are plain data: loading, validation and the
//! search algorithms live in `sector_map_geography`.

use serde::{Deserialize, Serialize};

/// A WGS84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude (negative south of the equator).
    pub latitude: f64,
    /// Longitude (negative west of Greenwich).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Axis-aligned latitude/longitude bounds of the reference region.
///
/// Bounds are inclusive on every side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    /// Southern-most latitude.
    pub min_latitude: f64,
    /// Northern-most latitude.
    pub max_latitude: f64,
    /// Western-most longitude.
    pub min_longitude: f64,
    /// Eastern-most longitude.
    pub max_longitude: f64,
}

impl RegionBounds {
    /// Returns `true` if the coordinate lies within the bounds.
    ///
    /// Non-finite coordinates are never contained.
    #[must_use]
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        coordinate.is_finite()
            && (self.min_latitude..=self.max_latitude).contains(&coordinate.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&coordinate.longitude)
    }
}

/// The region every resolution is restricted to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Human-readable state name (e.g. "Rio de Janeiro").
    pub name: String,
    /// Two-letter state abbreviation (e.g. "RJ").
    pub uf: String,
    /// Bounding box used to reject coordinates outside the state.
    pub bounds: RegionBounds,
}

/// A municipality in the reference region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdministrativeArea {
    /// Normalized lookup key (lower-case, no diacritics).
    ///
    /// Filled in by the dataset loader from [`Self::name`]; never read
    /// from the source artifact.
    #[serde(default, skip_deserializing)]
    pub key: String,
    /// Display name (e.g. "Niterói").
    pub name: String,
    /// Seven-digit IBGE municipality code (e.g. "3302800").
    pub code: String,
    /// Representative point used by nearest-area search.
    pub center: Coordinate,
    /// Common textual variants of the name, in match priority order.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A named neighborhood inside an [`AdministrativeArea`].
///
/// Membership is decided at query time by a radius test around
/// [`Self::center`]; there is no polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubArea {
    /// Neighborhood name (e.g. "Copacabana").
    pub name: String,
    /// Display name of the owning area, as written in the dataset.
    pub area: String,
    /// Representative point.
    pub center: Coordinate,
    /// Inclusion radius around the center, in kilometres.
    pub radius_km: f64,
}
