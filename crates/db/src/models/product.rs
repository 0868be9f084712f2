use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracecode_core::types::{DbId, Timestamp};

/// A row from the `products` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: DbId,
    pub name: String,
    pub origin: Option<String>,
    pub planting_date: Option<NaiveDate>,
    pub harvest_date: Option<NaiveDate>,
    pub test_type: Option<String>,
    pub test_date: Option<NaiveDate>,
    pub test_report: Option<String>,
    pub is_qualified: bool,
    pub image_url: Option<String>,
    pub producer_id: Option<DbId>,
    pub producer_name: Option<String>,
    pub producer_tel: Option<String>,
    pub producer_enterprise: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub origin: Option<String>,
    pub planting_date: Option<NaiveDate>,
    pub harvest_date: Option<NaiveDate>,
    pub test_type: Option<String>,
    pub test_date: Option<NaiveDate>,
    pub test_report: Option<String>,
    pub is_qualified: Option<bool>,
    pub image_url: Option<String>,
    pub producer_id: Option<DbId>,
    pub producer_name: Option<String>,
    pub producer_tel: Option<String>,
    pub producer_enterprise: Option<String>,
}
