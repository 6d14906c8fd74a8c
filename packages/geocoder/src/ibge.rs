//! IBGE territorial mesh client for census sector lookup.
//!
//! Downloads the census sector polygons of one municipality as `GeoJSON`
//! and picks the sector containing the point, or the one with the nearest
//! centroid when no polygon contains it.
//!
//! See <https://servicodados.ibge.gov.br/api/docs/malhas>

use sector_map_geography_models::Coordinate;
use sector_map_spatial::SectorIndex;

use crate::{GeocodeError, SectorLookup};

const GEOJSON_FORMAT: &str = "application/vnd.geo+json";

/// [`SectorLookup`] backed by the IBGE mesh API.
#[derive(Debug, Clone)]
pub struct IbgeSectorLookup {
    client: reqwest::Client,
    base_url: String,
    id_property: String,
}

impl IbgeSectorLookup {
    /// Creates a lookup against the API rooted at `base_url` (for example
    /// `https://servicodados.ibge.gov.br/api/v2`), reading sector ids from
    /// the feature property `id_property`.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        id_property: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            id_property: id_property.into(),
        }
    }

    fn mesh_url(&self, area_code: &str) -> String {
        format!(
            "{}/malhas/{area_code}/setores",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait::async_trait]
impl SectorLookup for IbgeSectorLookup {
    async fn lookup_sector(
        &self,
        coordinate: &Coordinate,
        area_code: &str,
    ) -> Result<Option<String>, GeocodeError> {
        let resp = self
            .client
            .get(self.mesh_url(area_code))
            .query(&[("formato", GEOJSON_FORMAT)])
            .send()
            .await?;

        match resp.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(GeocodeError::RateLimited),
            reqwest::StatusCode::NOT_FOUND => {
                log::debug!("IBGE has no sector mesh for municipality {area_code}");
                return Ok(None);
            }
            _ => {}
        }

        let body = resp.error_for_status()?.text().await?;
        sector_from_mesh(&body, &self.id_property, coordinate)
    }
}

/// Indexes a mesh response and looks `coordinate` up in it.
fn sector_from_mesh(
    body: &str,
    id_property: &str,
    coordinate: &Coordinate,
) -> Result<Option<String>, GeocodeError> {
    let index = SectorIndex::from_geojson_str(body, id_property)?;
    log::debug!("IBGE mesh contains {} usable sectors", index.len());
    Ok(index.lookup(coordinate).map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh() -> String {
        serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "id_setor": "330455705060001" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[
                            [-43.19, -22.98], [-43.17, -22.98], [-43.17, -22.96],
                            [-43.19, -22.96], [-43.19, -22.98]
                        ]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "id_setor": "330455705060002" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[
                            [-43.21, -22.99], [-43.19, -22.99], [-43.19, -22.97],
                            [-43.21, -22.97], [-43.21, -22.99]
                        ]]
                    }
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn finds_containing_sector() {
        let copacabana = Coordinate::new(-22.9711, -43.1822);
        assert_eq!(
            sector_from_mesh(&mesh(), "id_setor", &copacabana).unwrap().as_deref(),
            Some("330455705060001")
        );
    }

    #[test]
    fn falls_back_to_nearest_centroid() {
        let offshore = Coordinate::new(-23.05, -43.205);
        assert_eq!(
            sector_from_mesh(&mesh(), "id_setor", &offshore).unwrap().as_deref(),
            Some("330455705060002")
        );
    }

    #[test]
    fn empty_mesh_has_no_sector() {
        let body = r#"{"type":"FeatureCollection","features":[]}"#;
        assert!(
            sector_from_mesh(body, "id_setor", &Coordinate::new(-22.9, -43.2))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn malformed_mesh_is_an_error() {
        assert!(matches!(
            sector_from_mesh("<html>", "id_setor", &Coordinate::new(-22.9, -43.2)),
            Err(GeocodeError::Spatial(_))
        ));
    }

    #[test]
    fn builds_mesh_url() {
        let lookup = IbgeSectorLookup::new(
            reqwest::Client::new(),
            "https://servicodados.ibge.gov.br/api/v2/",
            "id_setor",
        );
        assert_eq!(
            lookup.mesh_url("3304557"),
            "https://servicodados.ibge.gov.br/api/v2/malhas/3304557/setores"
        );
    }
}
