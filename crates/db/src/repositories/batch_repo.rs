//! Repository for the `batches` table.
//!
//! Also serves as the batch data provider for the QR subsystem: lineage is
//! always read fresh from the joined product/producer rows, never from a
//! cached copy on the QR code.

use sqlx::PgPool;
use tracecode_core::traceability::Lineage;
use tracecode_core::types::DbId;

use crate::models::batch::{Batch, BatchLineageRow, CreateBatch};

const COLUMNS: &str = "id, batch_code, product_id, producer_id, notes, created_at, updated_at";

/// The producer account is the batch's producer when set, the product's
/// producer otherwise. `Lineage::owner_id` uses the same order.
const LINEAGE_QUERY: &str = "\
    SELECT \
        b.id AS batch_id, b.batch_code, b.product_id AS batch_product_id, \
        b.producer_id AS batch_producer_id, b.notes AS batch_notes, \
        b.created_at AS batch_created_at, \
        p.id AS product_id, p.name AS product_name, p.origin, p.planting_date, \
        p.harvest_date, p.test_type, p.test_date, p.test_report, p.is_qualified, \
        p.image_url AS product_image_url, p.producer_id AS product_producer_id, \
        p.producer_name AS product_producer_name, p.producer_tel AS product_producer_tel, \
        p.producer_enterprise AS product_producer_enterprise, \
        u.id AS account_id, u.username AS account_username, u.tel AS account_tel, \
        e.name AS account_enterprise \
    FROM batches b \
    LEFT JOIN products p ON p.id = b.product_id \
    LEFT JOIN users u ON u.id = COALESCE(b.producer_id, p.producer_id) \
    LEFT JOIN enterprises e ON e.id = u.enterprise_id \
    WHERE b.id = $1";

pub struct BatchRepo;

impl BatchRepo {
    pub async fn create(pool: &PgPool, input: &CreateBatch) -> Result<Batch, sqlx::Error> {
        let query = format!(
            "INSERT INTO batches (batch_code, product_id, producer_id, notes) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Batch>(&query)
            .bind(&input.batch_code)
            .bind(input.product_id)
            .bind(input.producer_id)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Batch>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM batches WHERE id = $1");
        sqlx::query_as::<_, Batch>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the current product + batch + producer lineage of a batch.
    pub async fn find_lineage(pool: &PgPool, id: DbId) -> Result<Option<Lineage>, sqlx::Error> {
        let row = sqlx::query_as::<_, BatchLineageRow>(LINEAGE_QUERY)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Lineage::from))
    }

    /// Delete a batch together with its QR code rows in one transaction.
    ///
    /// Returns the tokens whose artifacts the caller must now remove, or
    /// `None` if the batch did not exist (nothing is deleted in that case).
    pub async fn delete_cascade(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Vec<String>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let tokens: Vec<String> =
            sqlx::query_scalar("DELETE FROM qr_codes WHERE batch_id = $1 RETURNING token")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let deleted = sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(tokens))
    }
}
