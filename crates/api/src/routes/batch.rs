//! Route definitions for the `/batches` resource.

use axum::routing::delete;
use axum::Router;

use crate::handlers::batch;
use crate::state::AppState;

/// Routes mounted at `/batches`.
///
/// ```text
/// DELETE /{batch_id}    -> delete_batch (cascades to QR codes)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{batch_id}", delete(batch::delete_batch))
}
