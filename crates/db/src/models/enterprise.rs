use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracecode_core::types::{DbId, Timestamp};

/// A row from the `enterprises` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Enterprise {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEnterprise {
    pub name: String,
}
