pub mod batch;
pub mod health;
pub mod qrcode;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /qrcodes/generate/{batch_id}         mint one code (POST)
/// /qrcodes/generate/{batch_id}/bulk    mint several codes (POST)
/// /qrcodes/image/{token}               PNG, regenerated on cache miss (GET)
/// /qrcodes/download/{token}            PNG as attachment (GET)
/// /qrcodes/scan/{token}                resolve + count scan (GET)
/// /qrcodes/resolve                     resolve + count scan (?code=) (GET)
/// /qrcodes/decode                      resolve scanned content (POST)
/// /qrcodes                             list for a batch (?batch_id=) (GET)
/// /qrcodes/stats                       registry counters (GET, admin)
/// /qrcodes/image-info/{token}          artifact metadata (GET)
/// /qrcodes/{token}                     get, delete
/// /qrcodes/{token}/disable             disable (POST)
/// /qrcodes/{token}/enable              re-enable (POST)
/// /qrcodes/{token}/expiry              set or clear expiry (PUT)
///
/// /batches/{batch_id}                  delete with QR cascade (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/qrcodes", qrcode::router())
        .nest("/batches", batch::router())
}
