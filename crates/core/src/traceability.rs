//! Lineage view and traceability payload construction.
//!
//! A [`Lineage`] is the live product + batch + producer view returned on
//! scan. A [`TraceabilitySnapshot`] is a point-in-time copy of it baked into
//! an `embedded_snapshot` QR image. Field order in these structs is the
//! serialization order, so the encoded JSON is deterministic for a given
//! input.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::qr_status::PayloadMode;
use crate::token::normalize_token;
use crate::types::{DbId, Timestamp};

/// Public route that resolves a token. Link-mode content points here.
pub const SCAN_PATH: &str = "/api/v1/qrcodes/scan";

// ---------------------------------------------------------------------------
// Lineage view
// ---------------------------------------------------------------------------

/// Producer identity as shown to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerView {
    pub id: Option<DbId>,
    pub username: Option<String>,
    pub tel: Option<String>,
    pub enterprise: Option<String>,
}

/// Producer contact fields from one source (product snapshot or account).
#[derive(Debug, Clone, Default)]
pub struct ProducerFields {
    pub name: Option<String>,
    pub tel: Option<String>,
    pub enterprise: Option<String>,
}

impl ProducerView {
    /// Merge the product's denormalized producer fields with the producer
    /// account, preferring the product's copy field by field. Blank strings
    /// count as missing.
    pub fn resolve(id: Option<DbId>, on_product: ProducerFields, account: ProducerFields) -> Self {
        Self {
            id,
            username: prefer(on_product.name, account.name),
            tel: prefer(on_product.tel, account.tel),
            enterprise: prefer(on_product.enterprise, account.enterprise),
        }
    }
}

fn prefer(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|s| !s.trim().is_empty())
        .or_else(|| fallback.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
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
    pub producer: ProducerView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchView {
    pub id: DbId,
    pub batch_code: String,
    pub product_id: Option<DbId>,
    pub producer_id: Option<DbId>,
    pub created_at: Timestamp,
    pub notes: Option<String>,
}

/// Live lineage for one batch. `product` is `None` when the batch has lost
/// its product link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lineage {
    pub batch: BatchView,
    pub product: Option<ProductView>,
}

impl Lineage {
    /// The linked product, or `ProductNotFound` if the batch has none.
    pub fn require_product(&self) -> Result<&ProductView, CoreError> {
        self.product.as_ref().ok_or(CoreError::NotFound {
            entity: "Product",
            id: self.batch.product_id.unwrap_or_default(),
        })
    }

    /// Producer who owns the batch: the batch's own producer, else the
    /// product's. This is also the producer shown in `product.producer`.
    pub fn owner_id(&self) -> Option<DbId> {
        self.batch
            .producer_id
            .or_else(|| self.product.as_ref().and_then(|p| p.producer.id))
    }

    /// Reject a caller-supplied product id that is not the batch's product.
    pub fn check_product(&self, expected_product_id: Option<DbId>) -> Result<(), CoreError> {
        match expected_product_id {
            Some(product_id) if self.batch.product_id != Some(product_id) => {
                Err(CoreError::ProductBatchMismatch {
                    batch_id: self.batch.id,
                    product_id,
                })
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Canonical snapshot encoded by `embedded_snapshot` codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceabilitySnapshot {
    pub token: String,
    pub generated_at: Timestamp,
    pub product: ProductView,
    pub batch: BatchView,
    /// Link that resolves the same token online, for scanners that cannot
    /// render the embedded JSON.
    pub online_query_url: String,
}

impl TraceabilitySnapshot {
    pub fn build(
        token: &str,
        lineage: &Lineage,
        generated_at: Timestamp,
        public_base_url: &str,
    ) -> Result<Self, CoreError> {
        let product = lineage.require_product()?;
        Ok(Self {
            token: token.to_string(),
            generated_at,
            product: product.clone(),
            batch: lineage.batch.clone(),
            online_query_url: resolution_url(public_base_url, token),
        })
    }
}

/// Canonical resolution URL for a token.
pub fn resolution_url(public_base_url: &str, token: &str) -> String {
    format!("{}{SCAN_PATH}/{token}", public_base_url.trim_end_matches('/'))
}

/// Build the exact string to encode into the QR image.
pub fn encode_content(
    mode: PayloadMode,
    token: &str,
    lineage: &Lineage,
    generated_at: Timestamp,
    public_base_url: &str,
) -> Result<String, CoreError> {
    match mode {
        PayloadMode::Link => Ok(resolution_url(public_base_url, token)),
        PayloadMode::EmbeddedSnapshot => {
            let snapshot =
                TraceabilitySnapshot::build(token, lineage, generated_at, public_base_url)?;
            serde_json::to_string(&snapshot)
                .map_err(|e| CoreError::Internal(format!("Snapshot serialization failed: {e}")))
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding scanned content
// ---------------------------------------------------------------------------

/// Recover the token from a string read off a QR image.
///
/// Accepts an embedded snapshot (`{"token": ...}`), a resolution link
/// (`.../scan/{token}` or `...?code={token}`), or a bare token.
pub fn extract_token(content: &str) -> Result<String, CoreError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CoreError::Validation("QR content is empty".into()));
    }

    let candidate = if content.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| CoreError::Validation(format!("QR content is not valid JSON: {e}")))?;
        value
            .get("token")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| CoreError::Validation("QR snapshot has no token field".into()))?
    } else {
        token_from_link(content)
    };

    normalize_token(&candidate)
        .ok_or_else(|| CoreError::Validation(format!("QR content carries no valid token: {candidate}")))
}

fn token_from_link(link: &str) -> String {
    let without_fragment = link.split('#').next().unwrap_or(link);
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_fragment, None),
    };

    if let Some(code) = query.and_then(|q| {
        q.split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "code")
            .map(|(_, value)| value.to_string())
    }) {
        return code;
    }

    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}
