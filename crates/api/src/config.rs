use std::path::PathBuf;

use tracecode_core::qr_status::PayloadMode;
use tracecode_core::render::{RenderOptions, DEFAULT_MARGIN, DEFAULT_WIDTH};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// QR code generation and storage settings.
    pub qrcode: QrCodeConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            qrcode: QrCodeConfig::from_env(),
        }
    }
}

/// Settings for minting, rendering and storing QR codes.
#[derive(Debug, Clone)]
pub struct QrCodeConfig {
    /// Externally reachable origin, without trailing slash. Link-mode content
    /// and image URLs are built from it.
    pub public_base_url: String,
    /// Directory holding one PNG per token.
    pub storage_root: PathBuf,
    /// Payload mode used when a create request does not name one.
    pub default_payload_mode: PayloadMode,
    /// Raster size and quiet zone.
    pub render: RenderOptions,
}

impl QrCodeConfig {
    /// Load QR settings from environment variables.
    ///
    /// | Env Var               | Default                  |
    /// |-----------------------|--------------------------|
    /// | `PUBLIC_BASE_URL`     | `http://localhost:3000`  |
    /// | `QRCODE_STORAGE_ROOT` | `storage/qrcodes`        |
    /// | `QRCODE_PAYLOAD_MODE` | `embedded_snapshot`      |
    /// | `QRCODE_IMAGE_WIDTH`  | `512`                    |
    /// | `QRCODE_IMAGE_MARGIN` | `1`                      |
    pub fn from_env() -> Self {
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let storage_root = PathBuf::from(
            std::env::var("QRCODE_STORAGE_ROOT").unwrap_or_else(|_| "storage/qrcodes".into()),
        );

        let default_payload_mode = PayloadMode::from_str_value(
            &std::env::var("QRCODE_PAYLOAD_MODE").unwrap_or_else(|_| "embedded_snapshot".into()),
        )
        .expect("QRCODE_PAYLOAD_MODE must be `link` or `embedded_snapshot`");

        let width: u32 = std::env::var("QRCODE_IMAGE_WIDTH")
            .unwrap_or_else(|_| DEFAULT_WIDTH.to_string())
            .parse()
            .expect("QRCODE_IMAGE_WIDTH must be a valid u32");

        let margin: u32 = std::env::var("QRCODE_IMAGE_MARGIN")
            .unwrap_or_else(|_| DEFAULT_MARGIN.to_string())
            .parse()
            .expect("QRCODE_IMAGE_MARGIN must be a valid u32");

        Self {
            public_base_url,
            storage_root,
            default_payload_mode,
            render: RenderOptions { width, margin },
        }
    }

    /// Public URL serving the PNG for a token.
    pub fn image_url(&self, token: &str) -> String {
        format!("{}/api/v1/qrcodes/image/{token}", self.public_base_url)
    }
}
