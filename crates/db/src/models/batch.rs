use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracecode_core::traceability::{BatchView, Lineage, ProducerFields, ProducerView, ProductView};
use tracecode_core::types::{DbId, Timestamp};

/// A row from the `batches` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Batch {
    pub id: DbId,
    pub batch_code: String,
    pub product_id: Option<DbId>,
    pub producer_id: Option<DbId>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBatch {
    pub batch_code: String,
    pub product_id: Option<DbId>,
    pub producer_id: Option<DbId>,
    pub notes: Option<String>,
}

/// One batch joined with its product, the producer account and the
/// producer's enterprise. Product columns are all nullable because the
/// product link is optional.
#[derive(Debug, Clone, FromRow)]
pub struct BatchLineageRow {
    pub batch_id: DbId,
    pub batch_code: String,
    pub batch_product_id: Option<DbId>,
    pub batch_producer_id: Option<DbId>,
    pub batch_notes: Option<String>,
    pub batch_created_at: Timestamp,

    pub product_id: Option<DbId>,
    pub product_name: Option<String>,
    pub origin: Option<String>,
    pub planting_date: Option<NaiveDate>,
    pub harvest_date: Option<NaiveDate>,
    pub test_type: Option<String>,
    pub test_date: Option<NaiveDate>,
    pub test_report: Option<String>,
    pub is_qualified: Option<bool>,
    pub product_image_url: Option<String>,
    pub product_producer_id: Option<DbId>,
    pub product_producer_name: Option<String>,
    pub product_producer_tel: Option<String>,
    pub product_producer_enterprise: Option<String>,

    pub account_id: Option<DbId>,
    pub account_username: Option<String>,
    pub account_tel: Option<String>,
    pub account_enterprise: Option<String>,
}

impl From<BatchLineageRow> for Lineage {
    fn from(row: BatchLineageRow) -> Self {
        let batch = BatchView {
            id: row.batch_id,
            batch_code: row.batch_code,
            product_id: row.batch_product_id,
            producer_id: row.batch_producer_id,
            created_at: row.batch_created_at,
            notes: row.batch_notes,
        };

        let owner_id = row.batch_producer_id.or(row.product_producer_id);
        // The product's producer copy only describes the owner if the product
        // names the same producer (or none).
        let copy_applies = row.product_producer_id.is_none() || row.product_producer_id == owner_id;

        let product = match (row.product_id, row.product_name) {
            (Some(id), Some(name)) => Some(ProductView {
                id,
                name,
                origin: row.origin,
                planting_date: row.planting_date,
                harvest_date: row.harvest_date,
                test_type: row.test_type,
                test_date: row.test_date,
                test_report: row.test_report,
                is_qualified: row.is_qualified.unwrap_or(false),
                image_url: row.product_image_url,
                producer: ProducerView::resolve(
                    owner_id,
                    if copy_applies {
                        ProducerFields {
                            name: row.product_producer_name,
                            tel: row.product_producer_tel,
                            enterprise: row.product_producer_enterprise,
                        }
                    } else {
                        ProducerFields::default()
                    },
                    ProducerFields {
                        name: row.account_username,
                        tel: row.account_tel,
                        enterprise: row.account_enterprise,
                    },
                ),
            }),
            _ => None,
        };

        Lineage { batch, product }
    }
}
