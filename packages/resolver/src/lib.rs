#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census sector resolution engine.
//!
//! A [`Resolver`] turns a [`ResolutionRequest`] (an address or a coordinate
//! pair) into a [`ResolutionResult`] naming the municipality, the
//! neighborhood and the census sector:
//!
//! 1. Validate the input and, for coordinates, the state bounding box
//! 2. Locate the point: geocode the address, falling back to matching the
//!    text against known municipality names
//! 3. Pick the municipality (nearest center unless the geocoder named one)
//!    and the neighborhood (first registered radius containing the point)
//! 4. Ask the sector service for the authoritative sector, falling back to
//!    a deterministic [`synthesize`]d identifier
//!
//! Item failures never escape as errors: each becomes a failure-tagged
//! result. Batches run through [`Resolver::resolve_batch`], which keeps
//! input order, isolates item faults and paces calls to the external
//! services.

pub mod batch;
pub mod config;
pub mod pacer;
pub mod progress;
pub mod resolve;
pub mod synthesize;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use sector_map_geocoder::{Geocoder, NoGeocoder, NoSectorLookup, SectorLookup};
use sector_map_geography::reference::ReferenceDataset;
use sector_map_resolver_models::FailureReason;
use thiserror::Error;

pub use batch::BatchError;
pub use config::{ConfigError, EngineConfig};
pub use sector_map_resolver_models::{ResolutionRequest, ResolutionResult};
pub use synthesize::synthesize;

/// Why the pipeline stopped for one item.
///
/// Converted into a failure-tagged [`ResolutionResult`] at the resolver
/// boundary, never returned to callers.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Address text or a coordinate component is missing or unusable.
    #[error("Missing or unusable input")]
    MissingInput,

    /// The coordinate lies outside the region bounding box.
    #[error("Coordinate {latitude}, {longitude} is outside the region")]
    OutOfRegion {
        /// Rejected latitude.
        latitude: f64,
        /// Rejected longitude.
        longitude: f64,
    },

    /// Neither the geocoder nor name matching located the address.
    #[error("Could not locate address '{address}'")]
    UnresolvableAddress {
        /// The address text.
        address: String,
    },

    /// The geocoder placed the address in a municipality outside the
    /// dataset.
    #[error("Municipality '{name}' is not in the reference dataset")]
    AreaNotInDataset {
        /// Municipality name reported by the geocoder.
        name: String,
    },
}

impl ResolveError {
    /// The failure tag reported to callers.
    #[must_use]
    pub const fn reason(&self) -> FailureReason {
        match self {
            Self::MissingInput => FailureReason::MissingInput,
            Self::OutOfRegion { .. } => FailureReason::OutOfRegion,
            Self::UnresolvableAddress { .. } => FailureReason::UnresolvableAddress,
            Self::AreaNotInDataset { .. } => FailureReason::AreaNotInDataset,
        }
    }
}

/// The resolution engine: the reference dataset plus the two external
/// collaborators.
///
/// Cheap to clone; all state is shared and read-only.
#[derive(Clone)]
pub struct Resolver {
    dataset: Arc<ReferenceDataset>,
    geocoder: Arc<dyn Geocoder>,
    sector_lookup: Arc<dyn SectorLookup>,
}

impl Resolver {
    /// Creates a resolver over `dataset` using the given collaborators.
    #[must_use]
    pub fn new(
        dataset: Arc<ReferenceDataset>,
        geocoder: Arc<dyn Geocoder>,
        sector_lookup: Arc<dyn SectorLookup>,
    ) -> Self {
        Self {
            dataset,
            geocoder,
            sector_lookup,
        }
    }

    /// Creates a resolver that never calls an external service: addresses
    /// are located by name matching only and every sector code is
    /// synthesized.
    #[must_use]
    pub fn offline(dataset: Arc<ReferenceDataset>) -> Self {
        Self::new(dataset, Arc::new(NoGeocoder), Arc::new(NoSectorLookup))
    }

    /// The reference dataset this resolver works against.
    #[must_use]
    pub fn dataset(&self) -> &ReferenceDataset {
        &self.dataset
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("dataset", &self.dataset.name())
            .finish_non_exhaustive()
    }
}
