use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracecode_core::types::{DbId, Timestamp};

/// A row from the `users` table.
///
/// Accounts are managed elsewhere; this service only reads them to resolve
/// producer identity and ownership.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub role: String,
    pub tel: Option<String>,
    pub enterprise_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub role: String,
    pub tel: Option<String>,
    pub enterprise_id: Option<DbId>,
}
