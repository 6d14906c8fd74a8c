#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and result types for census sector resolution.
//!
//! A [`ResolutionRequest`] is either an address or a coordinate pair. Every
//! request produces exactly one [`ResolutionResult`], which is either a
//! success (non-empty sector code) or a failure tagged with a
//! [`FailureReason`] and its user-facing message.

use sector_map_geography_models::Coordinate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// What a request asks to resolve.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueryKind {
    /// Free-text address.
    Address,
    /// Latitude/longitude pair.
    Coordinates,
}

/// A possibly incomplete coordinate pair as supplied by a caller.
///
/// Either component may be missing so that malformed input can be
/// represented and rejected per item instead of failing deserialization
/// of a whole batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateInput {
    /// Latitude in decimal degrees.
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    pub longitude: Option<f64>,
}

/// One location to resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    /// Caller-supplied id echoed back on the result.
    pub correlation_id: Option<String>,
    /// Which of the inputs below is meaningful.
    pub kind: QueryKind,
    /// Address text, for [`QueryKind::Address`].
    pub address_text: Option<String>,
    /// Coordinate, for [`QueryKind::Coordinates`].
    pub coordinate: Option<CoordinateInput>,
}

impl ResolutionRequest {
    /// An address request.
    #[must_use]
    pub fn address(text: impl Into<String>) -> Self {
        Self {
            correlation_id: None,
            kind: QueryKind::Address,
            address_text: Some(text.into()),
            coordinate: None,
        }
    }

    /// A coordinate request.
    #[must_use]
    pub const fn coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            correlation_id: None,
            kind: QueryKind::Coordinates,
            address_text: None,
            coordinate: Some(CoordinateInput {
                latitude: Some(latitude),
                longitude: Some(longitude),
            }),
        }
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Text describing what was queried, for echoing back to the caller.
    ///
    /// The address text for address requests, `"{lat}, {lng}"` for
    /// coordinate requests. Missing parts render as empty.
    #[must_use]
    pub fn queried_as(&self) -> String {
        match self.kind {
            QueryKind::Address => self.address_text.clone().unwrap_or_default(),
            QueryKind::Coordinates => {
                let input = self.coordinate.unwrap_or_default();
                match (input.latitude, input.longitude) {
                    (Some(lat), Some(lng)) => format!("{lat}, {lng}"),
                    (Some(lat), None) => format!("{lat}, "),
                    (None, Some(lng)) => format!(", {lng}"),
                    (None, None) => String::new(),
                }
            }
        }
    }
}

/// Where a successful result's sector code came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SectorSource {
    /// Returned by the authoritative sector geometry service.
    Authoritative,
    /// Derived locally from the coordinate and municipality code. Stable,
    /// but not an official sector identifier.
    Synthesized,
}

/// Why a single item could not be resolved.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// The address text or a coordinate component is missing or unusable.
    MissingInput,
    /// The coordinate lies outside the state bounding box.
    OutOfRegion,
    /// Neither geocoding nor name matching located the address.
    UnresolvableAddress,
    /// The geocoder named a municipality that is not in the dataset.
    AreaNotInDataset,
    /// Unexpected failure while processing the item.
    InternalError,
}

impl FailureReason {
    /// User-facing (pt-BR) message for this failure.
    #[must_use]
    pub const fn message(self, kind: QueryKind) -> &'static str {
        match (self, kind) {
            (Self::MissingInput, QueryKind::Address) => "Endereço não fornecido",
            (Self::MissingInput, QueryKind::Coordinates) => "Coordenadas não fornecidas",
            (Self::OutOfRegion, _) => "Coordenadas fora do Estado do Rio de Janeiro",
            (Self::UnresolvableAddress, _) => "Não foi possível geocodificar o endereço",
            (Self::AreaNotInDataset, _) => "Município não encontrado na base de dados",
            (Self::InternalError, _) => "Erro ao processar o item",
        }
    }
}

/// A failure tag with its rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Machine-readable reason.
    pub reason: FailureReason,
    /// User-facing message.
    pub message: String,
}

/// The outcome of resolving one request.
///
/// Exactly one of two shapes holds: success (`sector_code` non-empty,
/// `failure` absent) or failure (`failure` present, `sector_code` empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    /// Echo of the request's correlation id.
    pub correlation_id: Option<String>,
    /// Census sector code, empty on failure.
    pub sector_code: String,
    /// Municipality display name, empty on failure.
    pub area_name: String,
    /// Neighborhood name.
    pub sub_area_name: Option<String>,
    /// Echo of what was queried.
    pub queried_as: String,
    /// The coordinate the sector was resolved for.
    pub coordinate: Option<Coordinate>,
    /// Origin of `sector_code`, on success.
    pub sector_source: Option<SectorSource>,
    /// Failure tag, on failure.
    pub failure: Option<Failure>,
}

impl ResolutionResult {
    /// Builds a failure result for `request`.
    #[must_use]
    pub fn failed(request: &ResolutionRequest, reason: FailureReason) -> Self {
        Self {
            correlation_id: request.correlation_id.clone(),
            sector_code: String::new(),
            area_name: String::new(),
            sub_area_name: None,
            queried_as: request.queried_as(),
            coordinate: None,
            sector_source: None,
            failure: Some(Failure {
                reason,
                message: reason.message(request.kind).to_string(),
            }),
        }
    }

    /// Whether this is a success result.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// The failure reason, if any.
    #[must_use]
    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.failure.as_ref().map(|f| f.reason)
    }
}
