//! HTTP handler functions for the census sector API.

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, error, web};
use sector_map_resolver::BatchError;
use sector_map_resolver_models::FailureReason;
use sector_map_server_models::{
    ApiBatchItemResult, ApiBatchRequest, ApiBatchResponse, ApiError, ApiHealth, ApiSectorRequest,
    ApiSectorResponse,
};

use crate::AppState;

const MISSING_KIND: &str = "Tipo de pesquisa não especificado";
const INVALID_PARAMETERS: &str = "Parâmetros inválidos";

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/setor-censitario`
///
/// Resolves one address or coordinate pair. Failures map to 400 (bad
/// input), 404 (location not found) or 500.
pub async fn resolve_sector(
    state: web::Data<AppState>,
    body: web::Json<ApiSectorRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    let Some(kind) = body.tipo else {
        return HttpResponse::BadRequest().json(ApiError::new(MISSING_KIND));
    };

    let request = body.into_request(kind);
    let result = state.resolver.resolve(&request).await;

    if let Some(failure) = &result.failure {
        log::debug!("Sector request failed: {}", failure.message);
        return HttpResponse::build(status_for(failure.reason))
            .json(ApiError::new(failure.message.as_str()));
    }

    HttpResponse::Ok().json(ApiSectorResponse::from(result))
}

/// `POST /api/setor-censitario-batch`
///
/// Resolves every item in order. Item failures are reported per item with
/// `erro`; only a malformed or oversized batch fails as a whole.
pub async fn resolve_sector_batch(
    state: web::Data<AppState>,
    body: web::Json<ApiBatchRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    let (Some(kind), Some(itens)) = (body.tipo, body.itens) else {
        return HttpResponse::BadRequest().json(ApiError::new(INVALID_PARAMETERS));
    };
    if itens.is_empty() {
        return HttpResponse::BadRequest().json(ApiError::new(INVALID_PARAMETERS));
    }

    let requests: Vec<_> = itens
        .into_iter()
        .map(|item| item.into_request(kind))
        .collect();

    match state
        .resolver
        .resolve_batch(&requests, &state.config, None)
        .await
    {
        Ok(results) => HttpResponse::Ok().json(ApiBatchResponse {
            resultados: results.into_iter().map(ApiBatchItemResult::from).collect(),
        }),
        Err(e @ BatchError::BatchTooLarge { .. }) => {
            HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
        }
    }
}

/// Turns JSON extractor failures into the API's error body.
pub fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> error::Error {
    log::debug!("Rejecting request body: {err}");
    let response = HttpResponse::BadRequest().json(ApiError::new(INVALID_PARAMETERS));
    error::InternalError::from_response(err, response).into()
}

const fn status_for(reason: FailureReason) -> StatusCode {
    match reason {
        FailureReason::MissingInput | FailureReason::OutOfRegion => StatusCode::BAD_REQUEST,
        FailureReason::UnresolvableAddress | FailureReason::AreaNotInDataset => {
            StatusCode::NOT_FOUND
        }
        FailureReason::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};
    use sector_map_geography::reference::ReferenceDataset;
    use sector_map_resolver::{EngineConfig, Resolver};
    use serde_json::{Value, json};

    use super::*;

    fn state() -> web::Data<AppState> {
        let dataset = std::sync::Arc::new(ReferenceDataset::embedded().unwrap());
        web::Data::new(AppState {
            resolver: Resolver::offline(dataset),
            config: EngineConfig {
                pacing_ms: 0,
                ..EngineConfig::default()
            },
        })
    }

    async fn post(uri: &str, body: &Value) -> (StatusCode, Value) {
        let app = test::init_service(App::new().app_data(state()).configure(crate::configure)).await;
        let req = test::TestRequest::post()
            .uri(uri)
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        (status, test::read_body_json(resp).await)
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().app_data(state()).configure(crate::configure)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], json!(true));
        assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
    }

    #[actix_web::test]
    async fn resolves_coordinates() {
        let (status, body) = post(
            "/api/setor-censitario",
            &json!({ "tipo": "coordenadas", "latitude": -22.5, "longitude": -43.25 }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let code = body["codigoSetorCensitario"].as_str().unwrap();
        assert!(code.ends_with("000500"), "{code}");
        assert_eq!(body["enderecoPesquisado"], json!("-22.5, -43.25"));
        assert_eq!(body["origemSetor"], json!("SYNTHESIZED"));
        assert!(body["municipio"].is_string());
    }

    #[actix_web::test]
    async fn resolves_address_by_name() {
        let (status, body) = post(
            "/api/setor-censitario",
            &json!({ "tipo": "endereco", "endereco": "Rua do Imperador, Petrópolis" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["municipio"], json!("Petrópolis"));
        assert!(
            body["codigoSetorCensitario"]
                .as_str()
                .unwrap()
                .starts_with("3303501")
        );
    }

    #[actix_web::test]
    async fn missing_tipo_is_bad_request() {
        let (status, body) = post("/api/setor-censitario", &json!({ "endereco": "Rua X" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Tipo de pesquisa não especificado"));
    }

    #[actix_web::test]
    async fn failures_map_to_status_codes() {
        let (status, body) = post(
            "/api/setor-censitario",
            &json!({ "tipo": "coordenadas", "latitude": -23.55, "longitude": -46.63 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            json!("Coordenadas fora do Estado do Rio de Janeiro")
        );

        let (status, body) = post("/api/setor-censitario", &json!({ "tipo": "endereco" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Endereço não fornecido"));

        let (status, body) = post(
            "/api/setor-censitario",
            &json!({ "tipo": "endereco", "endereco": "Avenida Paulista, São Paulo" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Não foi possível geocodificar o endereço"));
    }

    #[actix_web::test]
    async fn malformed_body_is_bad_request() {
        let (status, body) = post(
            "/api/setor-censitario",
            &json!({ "tipo": "coordenadas", "latitude": "x", "longitude": -43.2 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Parâmetros inválidos"));
    }

    #[actix_web::test]
    async fn unknown_tipo_searches_coordinates() {
        let (status, body) = post(
            "/api/setor-censitario",
            &json!({ "tipo": "satelite", "latitude": -22.8906, "longitude": -43.1097 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["municipio"], json!("Niterói"));

        let (status, body) = post(
            "/api/setor-censitario",
            &json!({ "tipo": "satelite", "endereco": "Niterói" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Coordenadas não fornecidas"));
    }

    #[actix_web::test]
    async fn batch_reports_per_item_errors_in_order() {
        let (status, body) = post(
            "/api/setor-censitario-batch",
            &json!({
                "tipo": "coordenadas",
                "itens": [
                    { "id": "1", "latitude": -22.8906, "longitude": -43.1097 },
                    { "id": "2", "latitude": -22.9 },
                    { "id": "3", "latitude": -22.3708, "longitude": -41.7864 }
                ]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let resultados = body["resultados"].as_array().unwrap();
        assert_eq!(resultados.len(), 3);
        assert_eq!(resultados[0]["id"], json!("1"));
        assert_eq!(resultados[0]["municipio"], json!("Niterói"));
        assert_eq!(resultados[1]["erro"], json!("Coordenadas não fornecidas"));
        assert_eq!(resultados[1]["codigoErro"], json!("MISSING_INPUT"));
        assert_eq!(resultados[1]["codigoSetorCensitario"], json!(""));
        assert_eq!(resultados[2]["municipio"], json!("Macaé"));
        assert!(resultados[2].get("erro").is_none());
    }

    #[actix_web::test]
    async fn badly_typed_item_fails_only_its_row() {
        let (status, body) = post(
            "/api/setor-censitario-batch",
            &json!({
                "tipo": "coordenadas",
                "itens": [
                    { "id": 1, "latitude": -22.8906, "longitude": -43.1097 },
                    { "id": "2", "latitude": "x", "longitude": -43.2 },
                    { "id": "3", "latitude": -22.3708, "longitude": -41.7864 }
                ]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let resultados = body["resultados"].as_array().unwrap();
        assert_eq!(resultados.len(), 3);
        assert_eq!(resultados[0]["id"], json!("1"));
        assert_eq!(resultados[0]["municipio"], json!("Niterói"));
        assert_eq!(resultados[1]["id"], json!("2"));
        assert_eq!(resultados[1]["codigoErro"], json!("MISSING_INPUT"));
        assert_eq!(resultados[1]["erro"], json!("Coordenadas não fornecidas"));
        assert_eq!(resultados[2]["municipio"], json!("Macaé"));
    }

    #[actix_web::test]
    async fn batch_rejects_bad_envelopes() {
        for body in [
            json!({ "itens": [{ "endereco": "Niterói" }] }),
            json!({ "tipo": "endereco" }),
            json!({ "tipo": "endereco", "itens": [] }),
            json!({ "tipo": "endereco", "itens": "Niterói" }),
        ] {
            let (status, response) = post("/api/setor-censitario-batch", &body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(response["error"], json!("Parâmetros inválidos"));
        }
    }

    #[actix_web::test]
    async fn batch_over_limit_is_rejected() {
        let itens: Vec<Value> = (0..1001)
            .map(|i| json!({ "id": i.to_string(), "latitude": -22.5, "longitude": -43.25 }))
            .collect();
        let (status, body) = post(
            "/api/setor-censitario-batch",
            &json!({ "tipo": "coordenadas", "itens": itens }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Lote excede o limite de 1000 itens"));
    }
}
