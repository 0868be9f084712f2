use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("QR code not found: {0}")]
    TokenNotFound(String),

    #[error("Batch {batch_id} does not belong to product {product_id}")]
    ProductBatchMismatch { batch_id: DbId, product_id: DbId },

    #[error("Payload of {len} bytes exceeds QR capacity of {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Duplicate QR token: {0}")]
    DuplicateToken(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
