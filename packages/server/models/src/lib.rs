#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the census sector server.
//!
//! The JSON contract uses Portuguese field names (`tipo`, `endereco`,
//! `codigoSetorCensitario`, ...) to stay compatible with existing front
//! ends. These types are separate from the engine's request/result types
//! so the wire contract can evolve independently.

use sector_map_resolver_models::{
    CoordinateInput, FailureReason, QueryKind, ResolutionRequest, ResolutionResult, SectorSource,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Search kind discriminator (`tipo`).
///
/// Only `"endereco"` selects address search; any other non-empty value
/// selects coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiQueryKind {
    /// Free-text address.
    Endereco,
    /// Latitude/longitude pair.
    Coordenadas,
}

impl ApiQueryKind {
    /// Reads a raw `tipo` value. `null`, `false` and `""` count as absent.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Bool(false) => None,
            Value::String(tipo) if tipo.is_empty() => None,
            Value::String(tipo) if tipo == "endereco" => Some(Self::Endereco),
            _ => Some(Self::Coordenadas),
        }
    }
}

fn deserialize_tipo<'de, D>(deserializer: D) -> Result<Option<ApiQueryKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| ApiQueryKind::from_value(&value))
}

impl From<ApiQueryKind> for QueryKind {
    fn from(kind: ApiQueryKind) -> Self {
        match kind {
            ApiQueryKind::Endereco => Self::Address,
            ApiQueryKind::Coordenadas => Self::Coordinates,
        }
    }
}

/// Body of `POST /api/setor-censitario`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSectorRequest {
    /// Search kind. Required; optional here so its absence gets a
    /// dedicated error message.
    #[serde(default, deserialize_with = "deserialize_tipo")]
    pub tipo: Option<ApiQueryKind>,
    /// Address text, for `endereco` searches.
    pub endereco: Option<String>,
    /// Latitude, for `coordenadas` searches.
    pub latitude: Option<f64>,
    /// Longitude, for `coordenadas` searches.
    pub longitude: Option<f64>,
}

impl ApiSectorRequest {
    /// Converts into an engine request of the given kind.
    #[must_use]
    pub fn into_request(self, kind: ApiQueryKind) -> ResolutionRequest {
        build_request(kind, None, self.endereco, self.latitude, self.longitude)
    }
}

/// One item of a batch request.
///
/// Read leniently: a numeric `id` is kept as text, numeric strings are
/// accepted as degrees and anything else unusable becomes absent, so a bad
/// item fails on its own row instead of rejecting the batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "Value")]
pub struct ApiBatchItem {
    /// Optional caller id, echoed on the result.
    pub id: Option<String>,
    /// Address text, for `endereco` batches.
    pub endereco: Option<String>,
    /// Latitude, for `coordenadas` batches.
    pub latitude: Option<f64>,
    /// Longitude, for `coordenadas` batches.
    pub longitude: Option<f64>,
}

impl From<Value> for ApiBatchItem {
    fn from(value: Value) -> Self {
        let id = match &value["id"] {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        };

        Self {
            id,
            endereco: value["endereco"].as_str().map(String::from),
            latitude: lenient_degree(&value["latitude"]),
            longitude: lenient_degree(&value["longitude"]),
        }
    }
}

fn lenient_degree(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl ApiBatchItem {
    /// Converts into an engine request of the given kind.
    #[must_use]
    pub fn into_request(self, kind: ApiQueryKind) -> ResolutionRequest {
        build_request(kind, self.id, self.endereco, self.latitude, self.longitude)
    }
}

/// Body of `POST /api/setor-censitario-batch`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiBatchRequest {
    /// Search kind shared by every item.
    #[serde(default, deserialize_with = "deserialize_tipo")]
    pub tipo: Option<ApiQueryKind>,
    /// Items to resolve.
    pub itens: Option<Vec<ApiBatchItem>>,
}

fn build_request(
    kind: ApiQueryKind,
    correlation_id: Option<String>,
    endereco: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> ResolutionRequest {
    match kind {
        ApiQueryKind::Endereco => ResolutionRequest {
            correlation_id,
            kind: QueryKind::Address,
            address_text: endereco,
            coordinate: None,
        },
        ApiQueryKind::Coordenadas => ResolutionRequest {
            correlation_id,
            kind: QueryKind::Coordinates,
            address_text: None,
            coordinate: Some(CoordinateInput {
                latitude,
                longitude,
            }),
        },
    }
}

/// Successful single-item response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSectorResponse {
    /// Census sector code.
    pub codigo_setor_censitario: String,
    /// Municipality name.
    pub municipio: String,
    /// Neighborhood name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bairro: Option<String>,
    /// Echo of the address text or `"{lat}, {lng}"`.
    pub endereco_pesquisado: String,
    /// Latitude the sector was resolved for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude the sector was resolved for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Whether the sector code is official or synthesized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origem_setor: Option<SectorSource>,
}

impl From<ResolutionResult> for ApiSectorResponse {
    fn from(result: ResolutionResult) -> Self {
        Self {
            codigo_setor_censitario: result.sector_code,
            municipio: result.area_name,
            bairro: result.sub_area_name,
            endereco_pesquisado: result.queried_as,
            latitude: result.coordinate.map(|c| c.latitude),
            longitude: result.coordinate.map(|c| c.longitude),
            origem_setor: result.sector_source,
        }
    }
}

/// One entry of a batch response. Failed items carry `erro`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBatchItemResult {
    /// Echo of the item id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Census sector code, empty on failure.
    pub codigo_setor_censitario: String,
    /// Municipality name, empty on failure.
    pub municipio: String,
    /// Neighborhood name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bairro: Option<String>,
    /// Echo of the address text or `"{lat}, {lng}"`.
    pub endereco_pesquisado: String,
    /// Latitude the sector was resolved for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude the sector was resolved for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Whether the sector code is official or synthesized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origem_setor: Option<SectorSource>,
    /// User-facing failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erro: Option<String>,
    /// Machine-readable failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo_erro: Option<FailureReason>,
}

impl From<ResolutionResult> for ApiBatchItemResult {
    fn from(result: ResolutionResult) -> Self {
        let (erro, codigo_erro) = result
            .failure
            .map_or((None, None), |f| (Some(f.message), Some(f.reason)));

        Self {
            id: result.correlation_id,
            codigo_setor_censitario: result.sector_code,
            municipio: result.area_name,
            bairro: result.sub_area_name,
            endereco_pesquisado: result.queried_as,
            latitude: result.coordinate.map(|c| c.latitude),
            longitude: result.coordinate.map(|c| c.longitude),
            origem_setor: result.sector_source,
            erro,
            codigo_erro,
        }
    }
}

/// Body of a successful batch response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiBatchResponse {
    /// One result per input item, in input order.
    pub resultados: Vec<ApiBatchItemResult>,
}

/// Error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// User-facing message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}
