//! Handlers for the `/qrcodes` resource.
//!
//! Image, scan, resolve and decode endpoints are public. Everything else
//! requires a producer or admin token, and the service additionally checks
//! that the caller owns the batch behind the code.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracecode_core::hashing::sha256_hex;
use tracecode_core::types::{DbId, Timestamp};
use tracecode_db::models::qr_code::QrCodeStats;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireProducer};
use crate::response::DataResponse;
use crate::services::qrcode::{CreateQrCodeRequest, ImageInfo, QrCodeView, ScanOutcome};
use crate::state::AppState;

/// Browsers and scanners may cache images for an hour.
const IMAGE_CACHE_CONTROL: &str = "public, max-age=3600";

/// Body of `POST /qrcodes/generate/{batch_id}/bulk`.
#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    pub count: u32,
    #[serde(flatten)]
    pub options: CreateQrCodeRequest,
}

/// Query parameters for `GET /qrcodes/resolve`.
#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub code: String,
}

/// Body of `POST /qrcodes/decode`.
#[derive(Debug, Deserialize)]
pub struct DecodeRequest {
    /// The raw string a client read off a QR image.
    pub content: String,
}

/// Query parameters for `GET /qrcodes`. At least one filter is required.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub batch_id: Option<DbId>,
    pub product_id: Option<DbId>,
}

/// Body of `PUT /qrcodes/{token}/expiry`. A missing or null value clears the
/// expiry.
#[derive(Debug, Deserialize)]
pub struct SetExpiryRequest {
    pub expire_time: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

fn bad_body(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// POST /api/v1/qrcodes/generate/{batch_id}
///
/// The body is optional; without one the configured defaults apply.
pub async fn generate(
    State(state): State<AppState>,
    RequireProducer(user): RequireProducer,
    Path(batch_id): Path<DbId>,
    input: Result<Option<Json<CreateQrCodeRequest>>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<QrCodeView>>)> {
    let input = input
        .map_err(bad_body)?
        .map(|Json(input)| input)
        .unwrap_or_default();
    let code = state
        .qrcodes
        .create(&user.actor(), batch_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: code })))
}

/// POST /api/v1/qrcodes/generate/{batch_id}/bulk
pub async fn generate_bulk(
    State(state): State<AppState>,
    RequireProducer(user): RequireProducer,
    Path(batch_id): Path<DbId>,
    input: Result<Json<BulkCreateRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<QrCodeView>>>)> {
    let Json(input) = input.map_err(bad_body)?;
    let codes = state
        .qrcodes
        .create_bulk(&user.actor(), batch_id, input.count, &input.options)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: codes })))
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// GET /api/v1/qrcodes/image/{token}, also served as `/preview/{token}`.
///
/// Accepts `{token}` or `{token}.png`. Honors `If-None-Match`.
pub async fn image(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let image = state.qrcodes.read_image(&token).await?;
    let etag = format!("\"{}\"", sha256_hex(&image.bytes));

    let not_modified = headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);
    if not_modified {
        return Ok((StatusCode::NOT_MODIFIED, [(ETAG, etag)]).into_response());
    }

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "image/png".to_string()),
            (CACHE_CONTROL, IMAGE_CACHE_CONTROL.to_string()),
            (ETAG, etag),
        ],
        image.bytes,
    )
        .into_response())
}

/// GET /api/v1/qrcodes/download/{token}
///
/// Same bytes as the image endpoint, as an attachment.
pub async fn download(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Response> {
    let image = state.qrcodes.read_image(&token).await?;
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "image/png".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"qrcode_{}.png\"", image.token),
            ),
        ],
        image.bytes,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// GET /api/v1/qrcodes/scan/{token}
pub async fn scan(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<ScanOutcome>>> {
    let outcome = state.qrcodes.resolve_scan(&token).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// GET /api/v1/qrcodes/resolve?code={token}
pub async fn resolve(
    State(state): State<AppState>,
    Query(params): Query<ResolveQuery>,
) -> AppResult<Json<DataResponse<ScanOutcome>>> {
    let outcome = state.qrcodes.resolve_scan(&params.code).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/qrcodes/decode
///
/// Resolve content scanned offline: a link, an embedded snapshot or a bare
/// token. Counts as a scan and returns live lineage.
pub async fn decode(
    State(state): State<AppState>,
    Json(input): Json<DecodeRequest>,
) -> AppResult<Json<DataResponse<ScanOutcome>>> {
    let outcome = state.qrcodes.decode(&input.content).await?;
    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

/// GET /api/v1/qrcodes?batch_id={id}&product_id={id}
pub async fn list(
    State(state): State<AppState>,
    RequireProducer(user): RequireProducer,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<DataResponse<Vec<QrCodeView>>>> {
    let actor = user.actor();
    let codes = match (params.batch_id, params.product_id) {
        (Some(batch_id), product_id) => {
            state.qrcodes.list_by_batch(&actor, batch_id, product_id).await?
        }
        (None, Some(product_id)) => state.qrcodes.list_by_product(&actor, product_id).await?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "batch_id or product_id is required".into(),
            ))
        }
    };
    Ok(Json(DataResponse { data: codes }))
}

/// GET /api/v1/qrcodes/stats
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<QrCodeStats>>> {
    let stats = state.qrcodes.stats().await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/qrcodes/{token}
pub async fn get_by_token(
    State(state): State<AppState>,
    RequireProducer(user): RequireProducer,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<QrCodeView>>> {
    let code = state.qrcodes.find(&user.actor(), &token).await?;
    Ok(Json(DataResponse { data: code }))
}

/// GET /api/v1/qrcodes/image-info/{token}
pub async fn image_info(
    State(state): State<AppState>,
    RequireProducer(user): RequireProducer,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<ImageInfo>>> {
    let info = state.qrcodes.image_info(&user.actor(), &token).await?;
    Ok(Json(DataResponse { data: info }))
}

/// POST /api/v1/qrcodes/{token}/disable
pub async fn disable(
    State(state): State<AppState>,
    RequireProducer(user): RequireProducer,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<QrCodeView>>> {
    let code = state.qrcodes.disable(&user.actor(), &token).await?;
    Ok(Json(DataResponse { data: code }))
}

/// POST /api/v1/qrcodes/{token}/enable
pub async fn enable(
    State(state): State<AppState>,
    RequireProducer(user): RequireProducer,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<QrCodeView>>> {
    let code = state.qrcodes.enable(&user.actor(), &token).await?;
    Ok(Json(DataResponse { data: code }))
}

/// PUT /api/v1/qrcodes/{token}/expiry
pub async fn set_expiry(
    State(state): State<AppState>,
    RequireProducer(user): RequireProducer,
    Path(token): Path<String>,
    Json(input): Json<SetExpiryRequest>,
) -> AppResult<Json<DataResponse<QrCodeView>>> {
    let code = state
        .qrcodes
        .set_expiry(&user.actor(), &token, input.expire_time)
        .await?;
    Ok(Json(DataResponse { data: code }))
}

/// DELETE /api/v1/qrcodes/{token}
pub async fn delete(
    State(state): State<AppState>,
    RequireProducer(user): RequireProducer,
    Path(token): Path<String>,
) -> AppResult<StatusCode> {
    state.qrcodes.delete(&user.actor(), &token).await?;
    Ok(StatusCode::NO_CONTENT)
}
