//! Handlers for the `/batches` resource.
//!
//! Batch CRUD belongs to the surrounding platform; only deletion lives here
//! because it must take the batch's QR codes and their artifacts with it.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracecode_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::rbac::RequireProducer;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BatchDeleted {
    pub batch_id: DbId,
    pub deleted_qrcodes: usize,
}

/// DELETE /api/v1/batches/{batch_id}
pub async fn delete_batch(
    State(state): State<AppState>,
    RequireProducer(user): RequireProducer,
    Path(batch_id): Path<DbId>,
) -> AppResult<Json<DataResponse<BatchDeleted>>> {
    let deleted_qrcodes = state.qrcodes.delete_batch(&user.actor(), batch_id).await?;
    Ok(Json(DataResponse {
        data: BatchDeleted {
            batch_id,
            deleted_qrcodes,
        },
    }))
}
