//! QR code registry rows and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use tracecode_core::error::CoreError;
use tracecode_core::qr_status::{PayloadMode, QrStatus};
use tracecode_core::types::{DbId, Timestamp};

/// A row from the `qr_codes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QrCode {
    pub id: DbId,
    pub token: String,
    pub batch_id: DbId,
    pub payload_mode: String,
    pub encoded_content: String,
    pub image_path: Option<String>,
    pub image_url: Option<String>,
    pub image_size_bytes: Option<i32>,
    pub status_id: i16,
    pub scan_count: i64,
    pub last_scan_time: Option<Timestamp>,
    pub expire_time: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QrCode {
    /// Stored status (not folded with expiry).
    pub fn status(&self) -> Result<QrStatus, CoreError> {
        QrStatus::from_id(self.status_id)
    }

    pub fn mode(&self) -> Result<PayloadMode, CoreError> {
        PayloadMode::from_str_value(&self.payload_mode)
    }
}

/// DTO for inserting a freshly minted code. Status starts `active`.
#[derive(Debug, Clone)]
pub struct CreateQrCode {
    pub token: String,
    pub batch_id: DbId,
    pub payload_mode: PayloadMode,
    pub encoded_content: String,
    pub image_path: Option<String>,
    pub image_url: Option<String>,
    pub image_size_bytes: Option<i32>,
    pub expire_time: Option<Timestamp>,
}

/// Registry-wide counters.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QrCodeStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub total_scans: i64,
}
