use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CACHE_CONTROL,
};
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::set_header::SetResponseHeaderLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use metascrape_core::{AppError, ExtractRequest};

use crate::dto::{ExtractResponse, HealthResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS, PATCH";

const USAGE: &str = "\
simple meta scraping service

  GET /api?url=<targetUrl>

custom scrapes can be defined as such:

  GET /api?url=<targetUrl>&allImgurImages=img[src*=\"imgur.com\"]

every extra query parameter is a name mapped to a CSS selector.
";

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api", get(extract).options(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            state.cache_control.clone(),
        ));

    let public = Router::new()
        .route("/", get(usage))
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api",
    params(
        ("url" = String, Query, description = "Target URL to fetch"),
    ),
    responses(
        (status = 200, description = "Extraction result", body = ExtractResponse),
        (status = 400, description = "Invalid input, unreachable target, or empty body", body = crate::dto::ErrorResponse),
    ),
    tag = "extract"
)]
pub async fn extract(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(pairs) = query.map_err(|e| {
        tracing::debug!(error = %e, "Malformed query string");
        AppError::InvalidInput
    })?;
    let request = ExtractRequest::from_query_pairs(pairs)?;
    tracing::info!(url = %request.url, queries = request.queries.len(), "Extraction requested");

    let result = state.service.extract(&request).await?;
    tracing::debug!(
        url = %request.url,
        probe_status = result.probe().status,
        "Extraction succeeded"
    );

    Ok(axum::Json(ExtractResponse::from(result)))
}

/// CORS preflight. The headers come from the layers on the `/api` router.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

// ---------------------------------------------------------------------------
// Usage & health
// ---------------------------------------------------------------------------

pub async fn usage() -> &'static str {
    USAGE
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health() -> impl IntoResponse {
    axum::Json(HealthResponse { status: "healthy" })
}
