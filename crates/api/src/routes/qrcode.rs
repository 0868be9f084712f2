//! Route definitions for the `/qrcodes` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::qrcode;
use crate::state::AppState;

/// Routes mounted at `/qrcodes`.
///
/// ```text
/// POST   /generate/{batch_id}         -> generate           (producer of batch / admin)
/// POST   /generate/{batch_id}/bulk    -> generate_bulk      (producer of batch / admin)
/// GET    /image/{token}               -> image              (public)
/// GET    /preview/{token}             -> image              (public)
/// GET    /download/{token}            -> download           (public)
/// GET    /scan/{token}                -> scan               (public)
/// GET    /resolve                     -> resolve ?code=     (public)
/// POST   /decode                      -> decode             (public)
/// GET    /                            -> list ?batch_id= &product_id=
/// GET    /stats                       -> stats              (admin)
/// GET    /image-info/{token}          -> image_info
/// GET    /{token}                     -> get_by_token
/// DELETE /{token}                     -> delete
/// POST   /{token}/disable             -> disable
/// POST   /{token}/enable              -> enable
/// PUT    /{token}/expiry              -> set_expiry
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate/{batch_id}", post(qrcode::generate))
        .route("/generate/{batch_id}/bulk", post(qrcode::generate_bulk))
        .route("/image/{token}", get(qrcode::image))
        .route("/preview/{token}", get(qrcode::image))
        .route("/download/{token}", get(qrcode::download))
        .route("/scan/{token}", get(qrcode::scan))
        .route("/resolve", get(qrcode::resolve))
        .route("/decode", post(qrcode::decode))
        .route("/", get(qrcode::list))
        .route("/stats", get(qrcode::stats))
        .route("/image-info/{token}", get(qrcode::image_info))
        .route(
            "/{token}",
            get(qrcode::get_by_token).delete(qrcode::delete),
        )
        .route("/{token}/disable", post(qrcode::disable))
        .route("/{token}/enable", post(qrcode::enable))
        .route("/{token}/expiry", put(qrcode::set_expiry))
}
