//! HTTP routes.
//!
//! Endpoints:
//! - GET /health - Liveness check, no authentication
//! - POST /v1/convert/svg - Convert `{"svg": ..., "filename": ...}` to PDF
//! - POST /v1/convert/svg/file - Convert a multipart `file` upload to PDF
//!
//! Both conversion routes require the `X-API-Key` header.

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::auth;
use crate::conversion::{run_conversion, ConversionRequest, ConversionResult};
use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying the SVG upload.
const UPLOAD_FIELD: &str = "file";

const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Body of `POST /v1/convert/svg`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SvgConvertRequest {
    /// SVG document as a string
    pub svg: String,
    /// Optional output filename
    #[serde(default)]
    pub filename: Option<String>,
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config().max_upload_bytes;

    let convert = Router::new()
        .route("/v1/convert/svg", post(convert_svg_json))
        .route("/v1/convert/svg/file", post(convert_svg_file))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(convert)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// POST /v1/convert/svg
async fn convert_svg_json(
    State(state): State<AppState>,
    payload: Result<Json<SvgConvertRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(ApiError::from_json_rejection)?;

    let request = ConversionRequest::inline(payload.svg, payload.filename);
    convert(&state, request).await
}

/// POST /v1/convert/svg/file
async fn convert_svg_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(ApiError::from_multipart_rejection)?;

    let request = read_upload(&mut multipart).await?;
    convert(&state, request).await
}

/// Pulls the first `file` part out of the form; other parts are ignored.
async fn read_upload(multipart: &mut Multipart) -> Result<ConversionRequest, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        debug!(
            filename = ?filename,
            content_type = ?content_type,
            bytes = bytes.len(),
            "Received SVG upload"
        );

        return Ok(ConversionRequest::upload(bytes.to_vec(), filename, content_type));
    }

    Err(ApiError::InvalidRequest(format!(
        "Missing '{UPLOAD_FIELD}' field in multipart form"
    )))
}

async fn convert(state: &AppState, request: ConversionRequest) -> Result<Response, ApiError> {
    let result = run_conversion(
        state.converter(),
        request,
        state.config().conversion_timeout,
    )
    .await?;

    pdf_response(result)
}

fn pdf_response(result: ConversionResult) -> Result<Response, ApiError> {
    let disposition = content_disposition(&result.filename)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        result.pdf,
    )
        .into_response())
}

/// `attachment; filename="..."`, plus an RFC 5987 `filename*` when the name
/// is not plain ASCII.
fn content_disposition(filename: &str) -> Result<HeaderValue, ApiError> {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .collect();

    let mut value = format!("attachment; filename=\"{ascii}\"");
    if ascii != filename {
        value.push_str("; filename*=UTF-8''");
        value.push_str(&urlencoding::encode(filename));
    }

    HeaderValue::from_str(&value).map_err(|e| {
        ApiError::Internal(anyhow::Error::new(e).context("Failed to build Content-Disposition header"))
    })
}
