#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! External collaborators of the resolution engine.
//!
//! Two capabilities are modelled as traits so the engine can be driven by
//! real HTTP services in production and by stand-ins in tests:
//!
//! - [`Geocoder`]: free-text address to coordinate, plus the municipality
//!   name the service thinks the point is in
//! - [`SectorLookup`]: coordinate and municipality code to an
//!   authoritative census sector identifier
//!
//! Concrete implementations are [`nominatim::NominatimGeocoder`] and
//! [`ibge::IbgeSectorLookup`], configured by TOML files in `services/`
//! and loaded through the [`service_registry`]. [`NoGeocoder`] and
//! [`NoSectorLookup`] always answer "nothing found" and are used when the
//! engine runs offline.

pub mod ibge;
pub mod nominatim;
pub mod service_registry;

use sector_map_geography_models::Coordinate;
use thiserror::Error;

/// A geocoding hit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedLocation {
    /// Where the service placed the address.
    pub coordinate: Coordinate,
    /// Best-effort municipality name reported by the service.
    pub area_name: Option<String>,
    /// The service's full formatted address, if any.
    pub display_name: Option<String>,
    /// State name reported by the service.
    pub state: Option<String>,
}

/// Errors from collaborator calls.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The sector mesh could not be indexed.
    #[error("Sector mesh error: {0}")]
    Spatial(#[from] sector_map_spatial::SpatialError),
}

/// Resolves free-text addresses to coordinates.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocodes `text`. `Ok(None)` means the service found nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the service could not be queried.
    async fn geocode(&self, text: &str) -> Result<Option<GeocodedLocation>, GeocodeError>;
}

/// Resolves a coordinate to an authoritative census sector identifier.
#[async_trait::async_trait]
pub trait SectorLookup: Send + Sync {
    /// Looks up the sector containing (or nearest to) `coordinate` within
    /// the municipality `area_code`. `Ok(None)` means no sector is known.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the service could not be queried.
    async fn lookup_sector(
        &self,
        coordinate: &Coordinate,
        area_code: &str,
    ) -> Result<Option<String>, GeocodeError>;
}

/// A [`Geocoder`] that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGeocoder;

#[async_trait::async_trait]
impl Geocoder for NoGeocoder {
    async fn geocode(&self, _text: &str) -> Result<Option<GeocodedLocation>, GeocodeError> {
        Ok(None)
    }
}

/// A [`SectorLookup`] that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSectorLookup;

#[async_trait::async_trait]
impl SectorLookup for NoSectorLookup {
    async fn lookup_sector(
        &self,
        _coordinate: &Coordinate,
        _area_code: &str,
    ) -> Result<Option<String>, GeocodeError> {
        Ok(None)
    }
}
