//! Repository for the `qr_codes` table (the QR code registry).
//!
//! Scan counting is done entirely in SQL: [`QrCodeRepo::record_scan`] is a
//! single conditional `UPDATE ... SET scan_count = scan_count + 1`, so
//! concurrent scans of one token serialize on the row lock and none of them
//! is lost.

use sqlx::PgPool;
use tracecode_core::qr_status::QrStatus;
use tracecode_core::types::{DbId, Timestamp};

use crate::models::qr_code::{CreateQrCode, QrCode, QrCodeStats};

/// Name of the unique constraint on `qr_codes.token`.
pub const TOKEN_UNIQUE_CONSTRAINT: &str = "uq_qr_codes_token";

const COLUMNS: &str = "\
    id, token, batch_id, payload_mode, encoded_content, image_path, image_url, \
    image_size_bytes, status_id, scan_count, last_scan_time, expire_time, \
    created_at, updated_at";

/// Whether an insert failed because the token already exists.
pub fn is_duplicate_token(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505")
                && db_err.constraint() == Some(TOKEN_UNIQUE_CONSTRAINT)
        }
        _ => false,
    }
}

pub struct QrCodeRepo;

impl QrCodeRepo {
    /// Insert a new code in the `active` state with zero scans.
    pub async fn create(pool: &PgPool, input: &CreateQrCode) -> Result<QrCode, sqlx::Error> {
        let query = format!(
            "INSERT INTO qr_codes \
                (token, batch_id, payload_mode, encoded_content, image_path, image_url, \
                 image_size_bytes, status_id, expire_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QrCode>(&query)
            .bind(&input.token)
            .bind(input.batch_id)
            .bind(input.payload_mode.as_str())
            .bind(&input.encoded_content)
            .bind(&input.image_path)
            .bind(&input.image_url)
            .bind(input.image_size_bytes)
            .bind(QrStatus::Active.id())
            .bind(input.expire_time)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<QrCode>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM qr_codes WHERE token = $1");
        sqlx::query_as::<_, QrCode>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// List every code minted for a batch, oldest first.
    pub async fn list_by_batch(pool: &PgPool, batch_id: DbId) -> Result<Vec<QrCode>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM qr_codes WHERE batch_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, QrCode>(&query)
            .bind(batch_id)
            .fetch_all(pool)
            .await
    }

    /// All codes on batches of `product_id`, oldest first.
    ///
    /// With `producer_id` set, only batches that producer owns are included
    /// (the batch's producer, else the product's).
    pub async fn list_by_product(
        pool: &PgPool,
        product_id: DbId,
        producer_id: Option<DbId>,
    ) -> Result<Vec<QrCode>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM qr_codes \
             WHERE batch_id IN ( \
                 SELECT b.id FROM batches b \
                 LEFT JOIN products p ON p.id = b.product_id \
                 WHERE b.product_id = $1 \
                   AND ($2::BIGINT IS NULL OR COALESCE(b.producer_id, p.producer_id) = $2) \
             ) \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, QrCode>(&query)
            .bind(product_id)
            .bind(producer_id)
            .fetch_all(pool)
            .await
    }

    /// Count one successful scan.
    ///
    /// Increments only while the code is active and unexpired at the moment
    /// of the update, and stamps `last_scan_time` with the wall clock at
    /// that moment. Returns `None` if the code vanished or stopped being
    /// scannable since it was read; the caller must not report success then.
    pub async fn record_scan(pool: &PgPool, token: &str) -> Result<Option<QrCode>, sqlx::Error> {
        let query = format!(
            "UPDATE qr_codes SET \
                 scan_count = scan_count + 1, \
                 last_scan_time = clock_timestamp() \
             WHERE token = $1 \
               AND status_id = $2 \
               AND (expire_time IS NULL OR expire_time > clock_timestamp()) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QrCode>(&query)
            .bind(token)
            .bind(QrStatus::Active.id())
            .fetch_optional(pool)
            .await
    }

    /// Set the stored status.
    pub async fn set_status(
        pool: &PgPool,
        token: &str,
        status: QrStatus,
    ) -> Result<Option<QrCode>, sqlx::Error> {
        let query = format!(
            "UPDATE qr_codes SET status_id = $2 WHERE token = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QrCode>(&query)
            .bind(token)
            .bind(status.id())
            .fetch_optional(pool)
            .await
    }

    /// Replace the expiry (`None` clears it) together with the status it implies.
    pub async fn set_expiry(
        pool: &PgPool,
        token: &str,
        expire_time: Option<Timestamp>,
        status: QrStatus,
    ) -> Result<Option<QrCode>, sqlx::Error> {
        let query = format!(
            "UPDATE qr_codes SET expire_time = $2, status_id = $3 \
             WHERE token = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QrCode>(&query)
            .bind(token)
            .bind(expire_time)
            .bind(status.id())
            .fetch_optional(pool)
            .await
    }

    /// Record the location and size of a (re)generated artifact.
    pub async fn update_image(
        pool: &PgPool,
        token: &str,
        image_path: &str,
        image_size_bytes: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE qr_codes SET image_path = $2, image_size_bytes = $3 WHERE token = $1",
        )
        .bind(token)
        .bind(image_path)
        .bind(image_size_bytes)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete one code. Returns `false` if it did not exist.
    pub async fn delete(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM qr_codes WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Registry-wide counters. A code counts as active only if it is stored
    /// active and not past its expiry.
    pub async fn stats(pool: &PgPool) -> Result<QrCodeStats, sqlx::Error> {
        sqlx::query_as::<_, QrCodeStats>(
            "SELECT \
                 COUNT(*) AS total, \
                 COUNT(*) FILTER (WHERE status_id = $1 \
                     AND (expire_time IS NULL OR expire_time > NOW())) AS active, \
                 COUNT(*) FILTER (WHERE NOT (status_id = $1 \
                     AND (expire_time IS NULL OR expire_time > NOW()))) AS inactive, \
                 COALESCE(SUM(scan_count), 0)::BIGINT AS total_scans \
             FROM qr_codes",
        )
        .bind(QrStatus::Active.id())
        .fetch_one(pool)
        .await
    }
}
