//! Repository for the `products` table.

use sqlx::PgPool;
use tracecode_core::types::DbId;

use crate::models::product::{CreateProduct, Product};

const COLUMNS: &str = "\
    id, name, origin, planting_date, harvest_date, test_type, test_date, \
    test_report, is_qualified, image_url, producer_id, producer_name, \
    producer_tel, producer_enterprise, created_at, updated_at";

pub struct ProductRepo;

impl ProductRepo {
    pub async fn create(pool: &PgPool, input: &CreateProduct) -> Result<Product, sqlx::Error> {
        let query = format!(
            "INSERT INTO products \
                (name, origin, planting_date, harvest_date, test_type, test_date, \
                 test_report, is_qualified, image_url, producer_id, producer_name, \
                 producer_tel, producer_enterprise) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, false), $9, $10, $11, $12, $13) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(&input.name)
            .bind(&input.origin)
            .bind(input.planting_date)
            .bind(input.harvest_date)
            .bind(&input.test_type)
            .bind(input.test_date)
            .bind(&input.test_report)
            .bind(input.is_qualified)
            .bind(&input.image_url)
            .bind(input.producer_id)
            .bind(&input.producer_name)
            .bind(&input.producer_tel)
            .bind(&input.producer_enterprise)
            .fetch_one(pool)
            .await
    }

    /// Rename a product. Used to show that scans read live data.
    pub async fn rename(pool: &PgPool, id: DbId, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE products SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
