//! Single-item resolution pipeline.

use std::panic::AssertUnwindSafe;

use futures::FutureExt as _;
use sector_map_geocoder::GeocodedLocation;
use sector_map_geography::matcher::match_area;
use sector_map_geography::nearest::{nearest_area, nearest_sub_area};
use sector_map_geography::normalize::normalize;
use sector_map_geography_models::{AdministrativeArea, Coordinate};
use sector_map_resolver_models::{
    FailureReason, QueryKind, ResolutionRequest, ResolutionResult, SectorSource,
};

use crate::pacer::Pacer;
use crate::synthesize::synthesize;
use crate::{ResolveError, Resolver};

impl Resolver {
    /// Resolves one request.
    ///
    /// Never fails: invalid input, unresolvable addresses and even panics
    /// inside a collaborator come back as failure-tagged results.
    pub async fn resolve(&self, request: &ResolutionRequest) -> ResolutionResult {
        self.resolve_paced(request, None).await
    }

    /// Like [`Self::resolve`], waiting on `pacer` once the item is known to
    /// need an external call.
    pub(crate) async fn resolve_paced(
        &self,
        request: &ResolutionRequest,
        pacer: Option<&Pacer>,
    ) -> ResolutionResult {
        let outcome = AssertUnwindSafe(self.try_resolve(request, pacer))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                log::debug!("Resolution of '{}' failed: {e}", request.queried_as());
                ResolutionResult::failed(request, e.reason())
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| panic.downcast_ref::<&str>().copied())
                    .unwrap_or("non-string panic payload");
                log::error!(
                    "Panic while resolving '{}': {detail}",
                    request.queried_as()
                );
                ResolutionResult::failed(request, FailureReason::InternalError)
            }
        }
    }

    async fn try_resolve(
        &self,
        request: &ResolutionRequest,
        pacer: Option<&Pacer>,
    ) -> Result<ResolutionResult, ResolveError> {
        let (coordinate, known_area) = match request.kind {
            QueryKind::Address => {
                let text = request
                    .address_text
                    .as_deref()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .ok_or(ResolveError::MissingInput)?;

                if let Some(pacer) = pacer {
                    pacer.wait().await;
                }

                self.locate_address(text).await?
            }
            QueryKind::Coordinates => {
                let coordinate = self.validate_coordinate(request)?;

                if let Some(pacer) = pacer {
                    pacer.wait().await;
                }

                (coordinate, None)
            }
        };

        let area = known_area.unwrap_or_else(|| nearest_area(&self.dataset, &coordinate));
        let sub_area = nearest_sub_area(&self.dataset, &coordinate, &area.key);
        let (sector_code, sector_source) = self.sector_for(&coordinate, area).await;

        Ok(ResolutionResult {
            correlation_id: request.correlation_id.clone(),
            sector_code,
            area_name: area.name.clone(),
            sub_area_name: Some(sub_area.to_string()),
            queried_as: request.queried_as(),
            coordinate: Some(coordinate),
            sector_source: Some(sector_source),
            failure: None,
        })
    }

    /// Coordinates must be present, finite, non-zero and inside the region.
    fn validate_coordinate(&self, request: &ResolutionRequest) -> Result<Coordinate, ResolveError> {
        let input = request.coordinate.unwrap_or_default();
        let (Some(latitude), Some(longitude)) = (input.latitude, input.longitude) else {
            return Err(ResolveError::MissingInput);
        };

        if !is_usable_degree(latitude) || !is_usable_degree(longitude) {
            return Err(ResolveError::MissingInput);
        }

        let coordinate = Coordinate::new(latitude, longitude);
        if !self.dataset.bounds().contains(&coordinate) {
            return Err(ResolveError::OutOfRegion {
                latitude,
                longitude,
            });
        }

        Ok(coordinate)
    }

    /// Geocoder first, name matching second.
    ///
    /// A geocoder hit must fall inside the region. Its municipality comes
    /// from [`Self::geocoded_area`]; a hit without one leaves the area to
    /// the nearest-center search.
    async fn locate_address(
        &self,
        text: &str,
    ) -> Result<(Coordinate, Option<&AdministrativeArea>), ResolveError> {
        let geocoded = match self.geocoder.geocode(text).await {
            Ok(found) => found.filter(|location| location.coordinate.is_finite()),
            Err(e) => {
                log::warn!("Geocoding failed for '{text}': {e}");
                None
            }
        };

        if let Some(location) = geocoded {
            let coordinate = location.coordinate;
            if !self.dataset.bounds().contains(&coordinate) {
                log::debug!(
                    "Geocoded '{text}' to {}, {} outside the region",
                    coordinate.latitude,
                    coordinate.longitude
                );
                return Err(ResolveError::OutOfRegion {
                    latitude: coordinate.latitude,
                    longitude: coordinate.longitude,
                });
            }

            return Ok((coordinate, self.geocoded_area(&location)?));
        }

        log::debug!("No geocoder hit for '{text}', matching municipality names");

        match_area(&self.dataset, text)
            .map(|area| (area.center, Some(area)))
            .ok_or_else(|| ResolveError::UnresolvableAddress {
                address: text.to_string(),
            })
    }

    /// Municipality of a geocoder hit.
    ///
    /// A reported state other than the region's rejects the hit. A reported
    /// municipality name must exist in the dataset. Without one, the first
    /// display-name part naming a known municipality is used, skipping the
    /// part that names the state itself.
    fn geocoded_area(
        &self,
        location: &GeocodedLocation,
    ) -> Result<Option<&AdministrativeArea>, ResolveError> {
        let state = non_blank(location.state.as_deref());
        if let Some(state) = state
            && normalize(state) != normalize(&self.dataset.region().name)
        {
            return Err(ResolveError::OutOfRegion {
                latitude: location.coordinate.latitude,
                longitude: location.coordinate.longitude,
            });
        }

        if let Some(name) = non_blank(location.area_name.as_deref()) {
            return self
                .dataset
                .area_by_name(name)
                .map(Some)
                .ok_or_else(|| ResolveError::AreaNotInDataset {
                    name: name.to_string(),
                });
        }

        let state_key = state.map(normalize);
        let from_display_name = location.display_name.as_deref().and_then(|display| {
            display
                .split(',')
                .filter(|part| state_key.as_deref() != Some(normalize(part).as_str()))
                .find_map(|part| self.dataset.area_by_name(part))
        });

        Ok(from_display_name)
    }

    /// Authoritative sector if the lookup service has one, synthesized
    /// otherwise.
    async fn sector_for(
        &self,
        coordinate: &Coordinate,
        area: &AdministrativeArea,
    ) -> (String, SectorSource) {
        match self.sector_lookup.lookup_sector(coordinate, &area.code).await {
            Ok(Some(code)) if !code.trim().is_empty() => {
                (code.trim().to_string(), SectorSource::Authoritative)
            }
            Ok(_) => (synthesize(coordinate, &area.code), SectorSource::Synthesized),
            Err(e) => {
                log::warn!(
                    "Sector lookup failed for {}, {} in {}: {e}",
                    coordinate.latitude,
                    coordinate.longitude,
                    area.code
                );
                (synthesize(coordinate, &area.code), SectorSource::Synthesized)
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Zero degrees counts as absent.
#[allow(clippy::float_cmp)]
const fn is_usable_degree(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use sector_map_geocoder::NoSectorLookup;
    use sector_map_resolver_models::CoordinateInput;

    use super::*;
    use crate::testing::{
        FailingGeocoder, FailingSectorLookup, FixedSectorLookup, PanickingGeocoder,
        TableGeocoder, dataset,
    };

    const COPACABANA: Coordinate = Coordinate::new(-22.9711, -43.1822);

    fn offline() -> Resolver {
        Resolver::offline(dataset())
    }

    #[tokio::test]
    async fn resolves_coordinate_with_synthesized_sector() {
        let result = offline()
            .resolve(&ResolutionRequest::coordinates(-22.9711, -43.1822))
            .await;

        assert!(result.is_success());
        assert_eq!(result.area_name, "Rio de Janeiro");
        assert_eq!(result.sub_area_name.as_deref(), Some("Copacabana"));
        assert_eq!(result.queried_as, "-22.9711, -43.1822");
        assert_eq!(result.sector_code, synthesize(&COPACABANA, "3304557"));
        assert_eq!(result.sector_source, Some(SectorSource::Synthesized));
        assert_eq!(result.coordinate, Some(COPACABANA));
    }

    #[tokio::test]
    async fn prefers_authoritative_sector() {
        let lookup = Arc::new(FixedSectorLookup::default());
        let resolver = Resolver::new(dataset(), Arc::new(TableGeocoder::default()), lookup.clone());

        let result = resolver
            .resolve(&ResolutionRequest::coordinates(-22.8906, -43.1097))
            .await;

        assert_eq!(result.sector_code, "3302800AUTH");
        assert_eq!(result.area_name, "Niterói");
        assert_eq!(result.sector_source, Some(SectorSource::Authoritative));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sector_lookup_failure_falls_back_to_synthesis() {
        let resolver = Resolver::new(
            dataset(),
            Arc::new(TableGeocoder::default()),
            Arc::new(FailingSectorLookup),
        );

        let result = resolver
            .resolve(&ResolutionRequest::coordinates(-22.5, -43.25))
            .await;

        assert!(result.is_success());
        assert_eq!(result.sector_source, Some(SectorSource::Synthesized));
        assert!(result.sector_code.ends_with("000500"));
    }

    #[tokio::test]
    async fn out_of_region_never_reaches_collaborators() {
        let lookup = Arc::new(FixedSectorLookup::default());
        let resolver = Resolver::new(dataset(), Arc::new(TableGeocoder::default()), lookup.clone());

        // São Paulo
        let result = resolver
            .resolve(&ResolutionRequest::coordinates(-23.5505, -46.6333))
            .await;

        assert_eq!(result.failure_reason(), Some(FailureReason::OutOfRegion));
        assert!(result.sector_code.is_empty());
        assert_eq!(
            result.failure.unwrap().message,
            "Coordenadas fora do Estado do Rio de Janeiro"
        );
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn region_bounds_are_inclusive() {
        let resolver = offline();
        for (lat, lng) in [(-23.4, -45.0), (-20.0, -40.0)] {
            let result = resolver.resolve(&ResolutionRequest::coordinates(lat, lng)).await;
            assert!(result.is_success(), "{lat}, {lng} rejected");
        }
        for (lat, lng) in [(-23.4001, -43.0), (-22.0, -39.9999)] {
            let result = resolver.resolve(&ResolutionRequest::coordinates(lat, lng)).await;
            assert_eq!(result.failure_reason(), Some(FailureReason::OutOfRegion));
        }
    }

    #[tokio::test]
    async fn missing_or_unusable_coordinates() {
        let resolver = offline();
        let inputs = [
            CoordinateInput {
                latitude: None,
                longitude: Some(-43.2),
            },
            CoordinateInput {
                latitude: Some(-22.9),
                longitude: None,
            },
            CoordinateInput {
                latitude: Some(0.0),
                longitude: Some(-43.2),
            },
            CoordinateInput {
                latitude: Some(f64::NAN),
                longitude: Some(-43.2),
            },
            CoordinateInput {
                latitude: Some(-22.9),
                longitude: Some(f64::INFINITY),
            },
        ];

        for input in inputs {
            let request = ResolutionRequest {
                correlation_id: Some("x".to_string()),
                kind: QueryKind::Coordinates,
                address_text: None,
                coordinate: Some(input),
            };
            let result = resolver.resolve(&request).await;
            assert_eq!(
                result.failure_reason(),
                Some(FailureReason::MissingInput),
                "{input:?}"
            );
            assert_eq!(result.correlation_id.as_deref(), Some("x"));
            assert_eq!(result.failure.unwrap().message, "Coordenadas não fornecidas");
        }

        let no_coordinate = ResolutionRequest {
            correlation_id: None,
            kind: QueryKind::Coordinates,
            address_text: Some("-22.9, -43.2".to_string()),
            coordinate: None,
        };
        assert_eq!(
            resolver.resolve(&no_coordinate).await.failure_reason(),
            Some(FailureReason::MissingInput)
        );
    }

    #[tokio::test]
    async fn blank_address_is_missing_input() {
        let geocoder = Arc::new(TableGeocoder::default());
        let resolver = Resolver::new(dataset(), geocoder.clone(), Arc::new(NoSectorLookup));

        for text in ["", "   \t"] {
            let result = resolver.resolve(&ResolutionRequest::address(text)).await;
            assert_eq!(result.failure_reason(), Some(FailureReason::MissingInput));
            assert_eq!(result.failure.unwrap().message, "Endereço não fornecido");
        }
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn geocoded_address_uses_reported_municipality() {
        let text = "Avenida Atlântica, 1702, Copacabana";
        let geocoder = TableGeocoder::default().with(text, COPACABANA, Some("Rio de Janeiro"));
        let resolver = Resolver::new(dataset(), Arc::new(geocoder), Arc::new(NoSectorLookup));

        let result = resolver.resolve(&ResolutionRequest::address(text)).await;

        assert!(result.is_success());
        assert_eq!(result.area_name, "Rio de Janeiro");
        assert_eq!(result.sub_area_name.as_deref(), Some("Copacabana"));
        assert_eq!(result.queried_as, text);
        assert_eq!(result.coordinate, Some(COPACABANA));
        assert!(result.sector_code.starts_with("3304557"));
    }

    #[tokio::test]
    async fn geocoded_municipality_outside_dataset() {
        let text = "Rua Teste, 10, Paraty";
        let paraty = Coordinate::new(-23.2178, -44.7131);
        let geocoder = TableGeocoder::default().with(text, paraty, Some("Paraty"));
        let resolver = Resolver::new(dataset(), Arc::new(geocoder), Arc::new(NoSectorLookup));

        let result = resolver.resolve(&ResolutionRequest::address(text)).await;

        assert_eq!(result.failure_reason(), Some(FailureReason::AreaNotInDataset));
        assert_eq!(
            result.failure.unwrap().message,
            "Município não encontrado na base de dados"
        );
    }

    #[tokio::test]
    async fn geocoded_without_municipality_uses_nearest_center() {
        let text = "Praia de Icaraí";
        let icarai = Coordinate::new(-22.9053, -43.1056);
        let geocoder = TableGeocoder::default().with(text, icarai, Some("  "));
        let resolver = Resolver::new(dataset(), Arc::new(geocoder), Arc::new(NoSectorLookup));

        let result = resolver.resolve(&ResolutionRequest::address(text)).await;

        assert_eq!(result.area_name, "Niterói");
        assert_eq!(result.sub_area_name.as_deref(), Some("Icaraí"));
    }

    #[tokio::test]
    async fn geocoded_point_outside_region_is_rejected() {
        let text = "Praça da Liberdade, Belo Horizonte";
        let belo_horizonte = Coordinate::new(-19.932, -43.938);
        let geocoder = TableGeocoder::default().with(text, belo_horizonte, None);
        let lookup = Arc::new(FixedSectorLookup::default());
        let resolver = Resolver::new(dataset(), Arc::new(geocoder), lookup.clone());

        let result = resolver.resolve(&ResolutionRequest::address(text)).await;

        assert_eq!(result.failure_reason(), Some(FailureReason::OutOfRegion));
        assert!(result.area_name.is_empty());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn geocoded_point_in_another_state_is_rejected() {
        // Juiz de Fora lies inside the region's bounding box.
        let text = "Rua Halfeld, Juiz de Fora";
        let geocoder = TableGeocoder::default().with_location(
            text,
            GeocodedLocation {
                coordinate: Coordinate::new(-21.7642, -43.3503),
                area_name: Some("Juiz de Fora".to_string()),
                display_name: None,
                state: Some("Minas Gerais".to_string()),
            },
        );
        let resolver = Resolver::new(dataset(), Arc::new(geocoder), Arc::new(NoSectorLookup));

        let result = resolver.resolve(&ResolutionRequest::address(text)).await;

        assert_eq!(result.failure_reason(), Some(FailureReason::OutOfRegion));
    }

    #[tokio::test]
    async fn municipality_read_from_display_name() {
        let text = "Rua Marechal Floriano, 100";
        let geocoder = TableGeocoder::default().with_location(
            text,
            GeocodedLocation {
                // Duque de Caxias center, so nearest-center would disagree.
                coordinate: Coordinate::new(-22.7856, -43.3117),
                area_name: None,
                display_name: Some(
                    "Rua Marechal Floriano, Centro, Nova Iguaçu, Região Metropolitana do \
                     Rio de Janeiro, Rio de Janeiro, Região Sudeste, Brasil"
                        .to_string(),
                ),
                state: Some("Rio de Janeiro".to_string()),
            },
        );
        let resolver = Resolver::new(dataset(), Arc::new(geocoder), Arc::new(NoSectorLookup));

        let result = resolver.resolve(&ResolutionRequest::address(text)).await;

        assert!(result.is_success());
        assert_eq!(result.area_name, "Nova Iguaçu");
        assert!(result.sector_code.starts_with("3303006"));
    }

    #[tokio::test]
    async fn state_part_of_display_name_is_not_a_municipality() {
        let text = "Rua Paraná, Mesquita";
        let geocoder = TableGeocoder::default().with_location(
            text,
            GeocodedLocation {
                coordinate: Coordinate::new(-22.7828, -43.4311),
                area_name: None,
                display_name: Some(
                    "Rua Paraná, Mesquita, Rio de Janeiro, Região Sudeste, Brasil".to_string(),
                ),
                state: Some("Rio de Janeiro".to_string()),
            },
        );
        let resolver = Resolver::new(dataset(), Arc::new(geocoder), Arc::new(NoSectorLookup));

        let result = resolver.resolve(&ResolutionRequest::address(text)).await;

        assert_eq!(result.area_name, "Nova Iguaçu");
    }

    #[tokio::test]
    async fn geocoder_miss_falls_back_to_name_matching() {
        let resolver = Resolver::new(
            dataset(),
            Arc::new(TableGeocoder::default()),
            Arc::new(NoSectorLookup),
        );

        let result = resolver
            .resolve(&ResolutionRequest::address("Rua Inexistente 123, Niterói"))
            .await;

        assert!(result.is_success());
        assert_eq!(result.area_name, "Niterói");
        assert_eq!(result.coordinate, Some(Coordinate::new(-22.8906, -43.1097)));
        assert_eq!(result.sub_area_name.as_deref(), Some("Centro"));
        assert!(result.sector_code.starts_with("3302800"));
    }

    #[tokio::test]
    async fn geocoder_error_falls_back_to_name_matching() {
        let resolver = Resolver::new(dataset(), Arc::new(FailingGeocoder), Arc::new(NoSectorLookup));

        let result = resolver
            .resolve(&ResolutionRequest::address("Centro, Macaé"))
            .await;

        assert_eq!(result.area_name, "Macaé");
    }

    #[tokio::test]
    async fn unknown_address_is_unresolvable() {
        let result = offline()
            .resolve(&ResolutionRequest::address("Avenida Paulista, São Paulo"))
            .await;

        assert_eq!(
            result.failure_reason(),
            Some(FailureReason::UnresolvableAddress)
        );
        assert_eq!(result.queried_as, "Avenida Paulista, São Paulo");
    }

    #[tokio::test]
    async fn collaborator_panic_becomes_internal_error() {
        let resolver = Resolver::new(
            dataset(),
            Arc::new(PanickingGeocoder { trigger: "boom" }),
            Arc::new(NoSectorLookup),
        );

        let result = resolver
            .resolve(&ResolutionRequest::address("boom").with_correlation_id("9"))
            .await;

        assert_eq!(result.failure_reason(), Some(FailureReason::InternalError));
        assert_eq!(result.correlation_id.as_deref(), Some("9"));
        assert_eq!(result.failure.unwrap().message, "Erro ao processar o item");

        let result = resolver
            .resolve(&ResolutionRequest::address("Cabo Frio"))
            .await;
        assert_eq!(result.area_name, "Cabo Frio");
    }

    #[tokio::test]
    async fn resolution_is_deterministic() {
        let resolver = offline();
        let request = ResolutionRequest::coordinates(-22.5058, -43.1786);
        let first = resolver.resolve(&request).await;
        let second = resolver.resolve(&request).await;
        assert_eq!(first, second);
        assert_eq!(first.area_name, "Petrópolis");
    }
}
