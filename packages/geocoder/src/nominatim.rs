//! Nominatim / OpenStreetMap geocoder client.
//!
//! Free-form search restricted to Brazil. The public instance allows at
//! most **1 request per second**; batch callers pace their requests.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use sector_map_geography_models::Coordinate;

use crate::{GeocodeError, GeocodedLocation, Geocoder};

/// Address fields that may carry the municipality name, in preference
/// order.
const AREA_NAME_FIELDS: &[&str] = &["city", "town", "municipality", "state_district"];

/// [`Geocoder`] backed by a Nominatim search endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    country_codes: String,
}

impl NominatimGeocoder {
    /// Creates a geocoder that searches `base_url` (the `/search`
    /// endpoint) restricted to `country_codes`.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        country_codes: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            country_codes: country_codes.into(),
        }
    }
}

#[async_trait::async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, text: &str) -> Result<Option<GeocodedLocation>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", text),
                ("countrycodes", self.country_codes.as_str()),
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_response(&body)
    }
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedLocation>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let area_name = AREA_NAME_FIELDS
        .iter()
        .filter_map(|field| first["address"][field].as_str())
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(String::from);

    let display_name = first["display_name"].as_str().map(String::from);

    let state = first["address"]["state"]
        .as_str()
        .map(str::trim)
        .filter(|state| !state.is_empty())
        .map(String::from);

    Ok(Some(GeocodedLocation {
        coordinate: Coordinate::new(lat, lon),
        area_name,
        display_name,
        state,
    }))
}
