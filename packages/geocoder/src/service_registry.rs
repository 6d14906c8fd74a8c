//! Compile-time registry of collaborator service configurations.
//!
//! Each external service is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`] and [`enabled_services`], and builds the engine's
//! collaborators from the highest-priority enabled service of each role.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::ibge::IbgeSectorLookup;
use crate::nominatim::NominatimGeocoder;
use crate::{Geocoder, NoGeocoder, NoSectorLookup, SectorLookup};

/// Errors from loading the registry or building clients from it.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An embedded service definition is malformed.
    #[error("Failed to parse service '{name}': {source}")]
    Parse {
        /// File stem of the offending definition.
        name: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// The HTTP client for a service could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A collaborator service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDefinition {
    /// Unique identifier (e.g., `"nominatim"`, `"ibge_mesh"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service is used by the engine.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Selection order within a role, lower values win.
    pub priority: u32,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` free-form search.
    Nominatim {
        /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
        base_url: String,
        /// Comma-separated ISO country codes to restrict results to.
        country_codes: String,
        /// `User-Agent` sent with every request, required by the usage
        /// policy of the public instance.
        user_agent: String,
    },
    /// IBGE territorial mesh API.
    IbgeMesh {
        /// API root (e.g., `"https://servicodados.ibge.gov.br/api/v2"`).
        base_url: String,
        /// Feature property carrying the sector identifier.
        id_property: String,
    },
}

/// What a service is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    /// Implements [`Geocoder`].
    Geocoding,
    /// Implements [`SectorLookup`].
    SectorLookup,
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    10
}

impl ServiceDefinition {
    /// Returns the provider's base URL regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { base_url, .. }
            | ProviderConfig::IbgeMesh { base_url, .. } => base_url,
        }
    }

    /// Returns the role this service fills.
    #[must_use]
    pub const fn role(&self) -> ServiceRole {
        match self.provider {
            ProviderConfig::Nominatim { .. } => ServiceRole::Geocoding,
            ProviderConfig::IbgeMesh { .. } => ServiceRole::SectorLookup,
        }
    }

    fn http_client(&self, user_agent: Option<&str>) -> Result<reqwest::Client, RegistryError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(self.timeout_secs));
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent);
        }
        Ok(builder.build()?)
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("nominatim", include_str!("../services/nominatim.toml")),
    ("ibge", include_str!("../services/ibge.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all service configurations (enabled and disabled).
///
/// # Errors
///
/// Returns [`RegistryError::Parse`] if any embedded TOML config is
/// malformed.
pub fn all_services() -> Result<Vec<ServiceDefinition>, RegistryError> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str).map_err(|source| RegistryError::Parse {
                name: (*name).to_string(),
                source,
            })
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
///
/// # Errors
///
/// Returns [`RegistryError::Parse`] if any embedded TOML config is
/// malformed.
pub fn enabled_services() -> Result<Vec<ServiceDefinition>, RegistryError> {
    let mut services: Vec<ServiceDefinition> =
        all_services()?.into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    Ok(services)
}

/// Builds the geocoder from the highest-priority enabled geocoding
/// service, or [`NoGeocoder`] if none is enabled.
///
/// # Errors
///
/// Returns [`RegistryError`] if the registry cannot be loaded or the HTTP
/// client cannot be built.
pub fn build_geocoder() -> Result<Arc<dyn Geocoder>, RegistryError> {
    let service = enabled_services()?
        .into_iter()
        .find(|s| s.role() == ServiceRole::Geocoding);

    let Some(service) = service else {
        log::warn!("No geocoding service enabled, address lookups will rely on name matching");
        return Ok(Arc::new(NoGeocoder));
    };

    log::info!("Using geocoding service '{}' ({})", service.id, service.name);

    match &service.provider {
        ProviderConfig::Nominatim {
            base_url,
            country_codes,
            user_agent,
        } => {
            let client = service.http_client(Some(user_agent))?;
            Ok(Arc::new(NominatimGeocoder::new(
                client,
                base_url.as_str(),
                country_codes.as_str(),
            )))
        }
        ProviderConfig::IbgeMesh { .. } => Ok(Arc::new(NoGeocoder)),
    }
}

/// Builds the sector lookup from the highest-priority enabled mesh
/// service, or [`NoSectorLookup`] if none is enabled.
///
/// # Errors
///
/// Returns [`RegistryError`] if the registry cannot be loaded or the HTTP
/// client cannot be built.
pub fn build_sector_lookup() -> Result<Arc<dyn SectorLookup>, RegistryError> {
    let service = enabled_services()?
        .into_iter()
        .find(|s| s.role() == ServiceRole::SectorLookup);

    let Some(service) = service else {
        log::warn!("No sector lookup service enabled, all sector codes will be synthesized");
        return Ok(Arc::new(NoSectorLookup));
    };

    log::info!("Using sector lookup service '{}' ({})", service.id, service.name);

    match &service.provider {
        ProviderConfig::IbgeMesh {
            base_url,
            id_property,
        } => {
            let client = service.http_client(None)?;
            Ok(Arc::new(IbgeSectorLookup::new(
                client,
                base_url.as_str(),
                id_property.as_str(),
            )))
        }
        ProviderConfig::Nominatim { .. } => Ok(Arc::new(NoSectorLookup)),
    }
}
