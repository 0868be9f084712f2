//! Repository for the `enterprises` table.

use sqlx::PgPool;

use crate::models::enterprise::{CreateEnterprise, Enterprise};

const COLUMNS: &str = "id, name, created_at, updated_at";

pub struct EnterpriseRepo;

impl EnterpriseRepo {
    pub async fn create(pool: &PgPool, input: &CreateEnterprise) -> Result<Enterprise, sqlx::Error> {
        let query = format!("INSERT INTO enterprises (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Enterprise>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }
}
