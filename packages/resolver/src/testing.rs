//! Deterministic stand-in collaborators for tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sector_map_geocoder::{GeocodeError, GeocodedLocation, Geocoder, SectorLookup};
use sector_map_geography::reference::ReferenceDataset;
use sector_map_geography_models::Coordinate;

pub fn dataset() -> Arc<ReferenceDataset> {
    Arc::new(ReferenceDataset::embedded().unwrap())
}

/// Answers from a fixed table keyed by the exact query text.
#[derive(Default)]
pub struct TableGeocoder {
    entries: BTreeMap<String, GeocodedLocation>,
    pub calls: AtomicUsize,
}

impl TableGeocoder {
    pub fn with(self, text: &str, coordinate: Coordinate, area_name: Option<&str>) -> Self {
        self.with_location(
            text,
            GeocodedLocation {
                coordinate,
                area_name: area_name.map(String::from),
                display_name: Some(format!("{text}, Brasil")),
                state: None,
            },
        )
    }

    pub fn with_location(mut self, text: &str, location: GeocodedLocation) -> Self {
        self.entries.insert(text.to_string(), location);
        self
    }
}

#[async_trait::async_trait]
impl Geocoder for TableGeocoder {
    async fn geocode(&self, text: &str) -> Result<Option<GeocodedLocation>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.get(text).cloned())
    }
}

/// Always fails.
pub struct FailingGeocoder;

#[async_trait::async_trait]
impl Geocoder for FailingGeocoder {
    async fn geocode(&self, _text: &str) -> Result<Option<GeocodedLocation>, GeocodeError> {
        Err(GeocodeError::RateLimited)
    }
}

/// Panics when asked about `trigger`, finds nothing otherwise.
pub struct PanickingGeocoder {
    pub trigger: &'static str,
}

#[async_trait::async_trait]
impl Geocoder for PanickingGeocoder {
    async fn geocode(&self, text: &str) -> Result<Option<GeocodedLocation>, GeocodeError> {
        assert!(text != self.trigger, "geocoder exploded on '{text}'");
        Ok(None)
    }
}

/// Returns `"{area_code}AUTH"` for every lookup and counts calls.
#[derive(Default)]
pub struct FixedSectorLookup {
    pub calls: AtomicUsize,
}

#[async_trait::async_trait]
impl SectorLookup for FixedSectorLookup {
    async fn lookup_sector(
        &self,
        _coordinate: &Coordinate,
        area_code: &str,
    ) -> Result<Option<String>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(format!("{area_code}AUTH")))
    }
}

/// Always fails.
pub struct FailingSectorLookup;

#[async_trait::async_trait]
impl SectorLookup for FailingSectorLookup {
    async fn lookup_sector(
        &self,
        _coordinate: &Coordinate,
        _area_code: &str,
    ) -> Result<Option<String>, GeocodeError> {
        Err(GeocodeError::Parse {
            message: "mesh unavailable".to_string(),
        })
    }
}
