use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::qrcode::QrCodeService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: tracecode_db::DbPool,
    /// Server configuration (JWT settings are read by the auth extractors).
    pub config: Arc<ServerConfig>,
    /// QR code registry, renderer and artifact store.
    pub qrcodes: Arc<QrCodeService>,
}

impl AppState {
    pub fn new(pool: tracecode_db::DbPool, config: ServerConfig) -> Self {
        let qrcodes = QrCodeService::new(pool.clone(), config.qrcode.clone());
        Self {
            pool,
            config: Arc::new(config),
            qrcodes: Arc::new(qrcodes),
        }
    }
}
