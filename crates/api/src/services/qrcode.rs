//! QR code registry service.
//!
//! Ties the core pieces together: batch lineage from `BatchRepo`, payload
//! building, token generation, rendering, the artifact store and the
//! `qr_codes` registry. Every mutating operation takes the caller as an
//! explicit [`Actor`]; resolution and image reads are public.
//!
//! Ordering rules:
//! - Creation validates and renders everything before the first side
//!   effect. The artifact is written before the registry row, never over an
//!   existing file, and removed again if the insert fails.
//! - A scan re-reads live lineage and then increments the counter in a
//!   single conditional `UPDATE`. If that update matches nothing the scan
//!   is not reported as resolved.
//! - A missing artifact is a cache miss, not an error: it is re-rendered
//!   from the stored `encoded_content`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracecode_core::artifact::{ArtifactError, ArtifactStore};
use tracecode_core::error::CoreError;
use tracecode_core::qr_status::{self, InvalidReason, PayloadMode, QrStatus};
use tracecode_core::render::render_png;
use tracecode_core::roles::{Actor, ROLE_ADMIN, ROLE_PRODUCER};
use tracecode_core::token::{artifact_file_name, generate_token, normalize_token};
use tracecode_core::traceability::{encode_content, extract_token, BatchView, Lineage, ProductView};
use tracecode_core::types::{DbId, Timestamp};
use tracecode_db::models::qr_code::{CreateQrCode, QrCode, QrCodeStats};
use tracecode_db::repositories::qr_code_repo::is_duplicate_token;
use tracecode_db::repositories::{BatchRepo, QrCodeRepo};

use crate::config::QrCodeConfig;
use crate::error::{AppError, AppResult};

/// Upper bound for a single bulk generation request.
pub const MAX_BULK_COUNT: u32 = 100;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Options for minting a code. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateQrCodeRequest {
    /// Overrides the configured default payload mode.
    pub payload_mode: Option<PayloadMode>,
    /// If given, must be the batch's product.
    pub product_id: Option<DbId>,
    /// Must lie in the future.
    pub expire_time: Option<Timestamp>,
}

/// Registry record as exposed over the API. `status` folds in expiry.
#[derive(Debug, Clone, Serialize)]
pub struct QrCodeView {
    pub token: String,
    pub batch_id: DbId,
    pub payload_mode: PayloadMode,
    pub status: QrStatus,
    pub encoded_content: String,
    pub image_url: Option<String>,
    pub image_size_bytes: Option<i32>,
    pub scan_count: i64,
    pub last_scan_time: Option<Timestamp>,
    pub expire_time: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl QrCodeView {
    fn from_row(code: QrCode, now: Timestamp) -> Result<Self, CoreError> {
        let status = qr_status::effective_status(code.status()?, code.expire_time, now);
        let payload_mode = code.mode()?;
        Ok(Self {
            token: code.token,
            batch_id: code.batch_id,
            payload_mode,
            status,
            encoded_content: code.encoded_content,
            image_url: code.image_url,
            image_size_bytes: code.image_size_bytes,
            scan_count: code.scan_count,
            last_scan_time: code.last_scan_time,
            expire_time: code.expire_time,
            created_at: code.created_at,
        })
    }
}

/// Terminal state of a scan that found its token.
///
/// A token that never existed is not an outcome; it is
/// [`CoreError::TokenNotFound`].
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The scan was counted. `qrcode.scan_count` includes it.
    Resolved {
        qrcode: QrCodeView,
        product: Option<ProductView>,
        batch: BatchView,
    },
    /// The code exists but is not scannable. Nothing was counted.
    Invalid {
        token: String,
        status: QrStatus,
        reason: InvalidReason,
        message: &'static str,
    },
}

impl ScanOutcome {
    fn invalid(token: String, reason: InvalidReason) -> Self {
        let status = match reason {
            InvalidReason::Unbound => QrStatus::Unbound,
            InvalidReason::Expired => QrStatus::Expired,
            InvalidReason::Disabled => QrStatus::Disabled,
        };
        ScanOutcome::Invalid {
            token,
            status,
            reason,
            message: reason.message(),
        }
    }
}

/// Stored artifact metadata.
#[derive(Debug, Serialize)]
pub struct ImageInfo {
    pub token: String,
    pub filename: String,
    pub image_url: String,
    pub image_size_bytes: Option<i32>,
    pub created_at: Timestamp,
}

/// PNG bytes for a token.
#[derive(Debug)]
pub struct QrImage {
    pub token: String,
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct QrCodeService {
    pool: PgPool,
    artifacts: ArtifactStore,
    config: QrCodeConfig,
}

impl QrCodeService {
    pub fn new(pool: PgPool, config: QrCodeConfig) -> Self {
        let artifacts = ArtifactStore::new(config.storage_root.clone());
        Self {
            pool,
            artifacts,
            config,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn config(&self) -> &QrCodeConfig {
        &self.config
    }

    // -- Creation --------------------------------------------------------

    /// Mint one code for a batch.
    pub async fn create(
        &self,
        actor: &Actor,
        batch_id: DbId,
        request: &CreateQrCodeRequest,
    ) -> AppResult<QrCodeView> {
        let (lineage, mode) = self.prepare(actor, batch_id, request).await?;
        self.mint(&lineage, mode, request.expire_time).await
    }

    /// Mint `count` independent codes for one batch.
    ///
    /// Validation runs once up front. Each code is committed on its own, so
    /// a failure part-way leaves the codes minted before it in place.
    pub async fn create_bulk(
        &self,
        actor: &Actor,
        batch_id: DbId,
        count: u32,
        request: &CreateQrCodeRequest,
    ) -> AppResult<Vec<QrCodeView>> {
        if count == 0 || count > MAX_BULK_COUNT {
            return Err(CoreError::Validation(format!(
                "count must be between 1 and {MAX_BULK_COUNT}"
            ))
            .into());
        }

        let (lineage, mode) = self.prepare(actor, batch_id, request).await?;
        let mut created = Vec::with_capacity(count as usize);
        for _ in 0..count {
            created.push(self.mint(&lineage, mode, request.expire_time).await?);
        }

        tracing::info!(batch_id, count, user_id = actor.user_id, "Bulk-generated QR codes");
        Ok(created)
    }

    /// All checks that must pass before anything is written.
    async fn prepare(
        &self,
        actor: &Actor,
        batch_id: DbId,
        request: &CreateQrCodeRequest,
    ) -> AppResult<(Lineage, PayloadMode)> {
        let lineage = self.authorize_batch(actor, batch_id).await?;
        lineage.check_product(request.product_id)?;

        if let Some(expire_time) = request.expire_time {
            if expire_time <= Utc::now() {
                return Err(CoreError::Validation("expire_time must be in the future".into()).into());
            }
        }

        let mode = request
            .payload_mode
            .unwrap_or(self.config.default_payload_mode);
        if mode == PayloadMode::EmbeddedSnapshot {
            lineage.require_product()?;
        }
        Ok((lineage, mode))
    }

    async fn mint(
        &self,
        lineage: &Lineage,
        mode: PayloadMode,
        expire_time: Option<Timestamp>,
    ) -> AppResult<QrCodeView> {
        self.mint_token(generate_token(), lineage, mode, expire_time)
            .await
    }

    /// Mint a code under a given token.
    ///
    /// A token that is already taken, by a stored artifact or by a registry
    /// row, fails with `DuplicateToken` and leaves the existing code as it
    /// was. The only file ever removed here is the one this call created.
    async fn mint_token(
        &self,
        token: String,
        lineage: &Lineage,
        mode: PayloadMode,
        expire_time: Option<Timestamp>,
    ) -> AppResult<QrCodeView> {
        let content = encode_content(
            mode,
            &token,
            lineage,
            Utc::now(),
            &self.config.public_base_url,
        )?;
        let png = render_png(&content, self.config.render)?;
        let size = byte_size(&png)?;

        let path = match self.artifacts.put_new(&token, &png).await {
            Ok(path) => path,
            Err(ArtifactError::AlreadyExists(_)) => {
                return Err(CoreError::DuplicateToken(token).into());
            }
            Err(e) => return Err(e.into()),
        };

        let input = CreateQrCode {
            token: token.clone(),
            batch_id: lineage.batch.id,
            payload_mode: mode,
            encoded_content: content,
            image_path: Some(path.display().to_string()),
            image_url: Some(self.config.image_url(&token)),
            image_size_bytes: Some(size),
            expire_time,
        };

        let code = match QrCodeRepo::create(&self.pool, &input).await {
            Ok(code) => code,
            Err(err) => {
                self.discard_artifact(&token).await;
                if is_duplicate_token(&err) {
                    return Err(CoreError::DuplicateToken(token).into());
                }
                return Err(err.into());
            }
        };

        tracing::info!(
            token = %code.token,
            batch_id = code.batch_id,
            payload_mode = mode.as_str(),
            size,
            "QR code generated",
        );
        Ok(QrCodeView::from_row(code, Utc::now())?)
    }

    // -- Resolution ------------------------------------------------------

    /// Resolve a scanned token to live lineage, counting the scan.
    pub async fn resolve_scan(&self, raw_token: &str) -> AppResult<ScanOutcome> {
        let token = canonical(raw_token)?;
        let code = self.find_code(&token).await?;

        if let Err(reason) =
            qr_status::check_scannable(code.status()?, code.expire_time, Utc::now())
        {
            tracing::info!(token = %token, reason = ?reason, "Scan of invalid QR code");
            return Ok(ScanOutcome::invalid(token, reason));
        }

        let lineage = BatchRepo::find_lineage(&self.pool, code.batch_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Batch",
                id: code.batch_id,
            })?;

        let Some(scanned) = QrCodeRepo::record_scan(&self.pool, &token).await? else {
            return self.unrecorded_scan(token).await;
        };

        tracing::debug!(token = %token, scan_count = scanned.scan_count, "QR code scanned");
        Ok(ScanOutcome::Resolved {
            qrcode: QrCodeView::from_row(scanned, Utc::now())?,
            product: lineage.product,
            batch: lineage.batch,
        })
    }

    /// Decide what to report when the conditional increment matched no row.
    async fn unrecorded_scan(&self, token: String) -> AppResult<ScanOutcome> {
        let code = self.find_code(&token).await?;
        match qr_status::check_scannable(code.status()?, code.expire_time, Utc::now()) {
            Err(reason) => Ok(ScanOutcome::invalid(token, reason)),
            // The database clock already saw the expiry.
            Ok(()) if code.expire_time.is_some() => {
                Ok(ScanOutcome::invalid(token, InvalidReason::Expired))
            }
            Ok(()) => Err(AppError::InternalError(format!(
                "Scan of QR code {token} was not recorded"
            ))),
        }
    }

    /// Recover the token from scanned content and resolve it.
    pub async fn decode(&self, content: &str) -> AppResult<ScanOutcome> {
        let token = extract_token(content)?;
        self.resolve_scan(&token).await
    }

    // -- Artifact read path ----------------------------------------------

    /// PNG bytes for a token, regenerated from the registry on a cache miss.
    pub async fn read_image(&self, raw_token: &str) -> AppResult<QrImage> {
        let token = canonical(raw_token)?;
        let code = self.find_code(&token).await?;

        if let Some(bytes) = self.artifacts.get(&token).await? {
            tracing::debug!(token = %token, size = bytes.len(), "QR artifact cache hit");
            return Ok(QrImage { token, bytes });
        }

        tracing::warn!(token = %token, "QR artifact missing, regenerating from stored content");
        let bytes = render_png(&code.encoded_content, self.config.render)?;
        let path = self.artifacts.put(&token, &bytes).await?;
        QrCodeRepo::update_image(
            &self.pool,
            &token,
            &path.display().to_string(),
            byte_size(&bytes)?,
        )
        .await?;

        Ok(QrImage { token, bytes })
    }

    // -- Administration --------------------------------------------------

    pub async fn find(&self, actor: &Actor, raw_token: &str) -> AppResult<QrCodeView> {
        let code = self.load_managed(actor, raw_token).await?;
        Ok(QrCodeView::from_row(code, Utc::now())?)
    }

    /// Codes of one batch. A supplied `product_id` must be the batch's
    /// product.
    pub async fn list_by_batch(
        &self,
        actor: &Actor,
        batch_id: DbId,
        product_id: Option<DbId>,
    ) -> AppResult<Vec<QrCodeView>> {
        self.authorize_batch(actor, batch_id).await?.check_product(product_id)?;
        views(QrCodeRepo::list_by_batch(&self.pool, batch_id).await?)
    }

    /// Codes across every batch of a product that the actor manages. An
    /// unknown product yields an empty list.
    pub async fn list_by_product(&self, actor: &Actor, product_id: DbId) -> AppResult<Vec<QrCodeView>> {
        let owner = match actor.role.as_str() {
            ROLE_ADMIN => None,
            ROLE_PRODUCER => Some(actor.user_id),
            _ => {
                return Err(CoreError::Forbidden(format!(
                    "Not allowed to list QR codes of product {product_id}"
                ))
                .into())
            }
        };
        views(QrCodeRepo::list_by_product(&self.pool, product_id, owner).await?)
    }

    pub async fn image_info(&self, actor: &Actor, raw_token: &str) -> AppResult<ImageInfo> {
        let code = self.load_managed(actor, raw_token).await?;
        Ok(ImageInfo {
            filename: artifact_file_name(&code.token),
            image_url: code
                .image_url
                .unwrap_or_else(|| self.config.image_url(&code.token)),
            image_size_bytes: code.image_size_bytes,
            created_at: code.created_at,
            token: code.token,
        })
    }

    pub async fn disable(&self, actor: &Actor, raw_token: &str) -> AppResult<QrCodeView> {
        let code = self.load_managed(actor, raw_token).await?;
        let next = qr_status::transition_disable(code.status()?);
        let updated = self.store_status(&code.token, next).await?;
        tracing::info!(token = %updated.token, user_id = actor.user_id, "QR code disabled");
        Ok(QrCodeView::from_row(updated, Utc::now())?)
    }

    pub async fn enable(&self, actor: &Actor, raw_token: &str) -> AppResult<QrCodeView> {
        let code = self.load_managed(actor, raw_token).await?;
        let next = qr_status::transition_enable(code.status()?, code.expire_time, Utc::now())?;
        let updated = self.store_status(&code.token, next).await?;
        tracing::info!(
            token = %updated.token,
            user_id = actor.user_id,
            status = next.as_str(),
            "QR code re-enabled",
        );
        Ok(QrCodeView::from_row(updated, Utc::now())?)
    }

    /// Replace the expiry; `None` clears it.
    pub async fn set_expiry(
        &self,
        actor: &Actor,
        raw_token: &str,
        expire_time: Option<Timestamp>,
    ) -> AppResult<QrCodeView> {
        let code = self.load_managed(actor, raw_token).await?;
        let next = qr_status::transition_set_expiry(code.status()?, expire_time, Utc::now());
        let updated = QrCodeRepo::set_expiry(&self.pool, &code.token, expire_time, next)
            .await?
            .ok_or_else(|| CoreError::TokenNotFound(code.token.clone()))?;
        tracing::info!(
            token = %updated.token,
            user_id = actor.user_id,
            expire_time = ?expire_time,
            "QR code expiry updated",
        );
        Ok(QrCodeView::from_row(updated, Utc::now())?)
    }

    /// Remove one code and its artifact.
    pub async fn delete(&self, actor: &Actor, raw_token: &str) -> AppResult<()> {
        let code = self.load_managed(actor, raw_token).await?;
        if !QrCodeRepo::delete(&self.pool, &code.token).await? {
            return Err(CoreError::TokenNotFound(code.token).into());
        }
        self.discard_artifact(&code.token).await;
        tracing::info!(token = %code.token, user_id = actor.user_id, "QR code deleted");
        Ok(())
    }

    /// Delete a batch on behalf of its owner. Returns how many codes went
    /// with it.
    pub async fn delete_batch(&self, actor: &Actor, batch_id: DbId) -> AppResult<usize> {
        self.authorize_batch(actor, batch_id).await?;
        let tokens = self
            .cascade_delete_for_batch(batch_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Batch",
                id: batch_id,
            })?;
        Ok(tokens.len())
    }

    /// Delete a batch, all of its registry rows, then their artifacts.
    ///
    /// Rows go in one transaction; files are removed only after it commits.
    /// Returns the removed tokens, or `None` if the batch did not exist.
    pub async fn cascade_delete_for_batch(&self, batch_id: DbId) -> AppResult<Option<Vec<String>>> {
        let Some(tokens) = BatchRepo::delete_cascade(&self.pool, batch_id).await? else {
            return Ok(None);
        };
        for token in &tokens {
            self.discard_artifact(token).await;
        }
        tracing::info!(batch_id, qrcodes = tokens.len(), "Batch deleted with its QR codes");
        Ok(Some(tokens))
    }

    pub async fn stats(&self) -> AppResult<QrCodeStats> {
        Ok(QrCodeRepo::stats(&self.pool).await?)
    }

    // -- Helpers ---------------------------------------------------------

    async fn find_code(&self, token: &str) -> AppResult<QrCode> {
        QrCodeRepo::find_by_token(&self.pool, token)
            .await?
            .ok_or_else(|| CoreError::TokenNotFound(token.to_string()).into())
    }

    /// Look up a batch and check that `actor` may manage it.
    async fn authorize_batch(&self, actor: &Actor, batch_id: DbId) -> AppResult<Lineage> {
        let lineage = BatchRepo::find_lineage(&self.pool, batch_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Batch",
                id: batch_id,
            })?;
        if !actor.can_manage_batch(lineage.owner_id()) {
            return Err(CoreError::Forbidden(format!(
                "Not allowed to manage QR codes of batch {batch_id}"
            ))
            .into());
        }
        Ok(lineage)
    }

    async fn load_managed(&self, actor: &Actor, raw_token: &str) -> AppResult<QrCode> {
        let token = canonical(raw_token)?;
        let code = self.find_code(&token).await?;
        self.authorize_batch(actor, code.batch_id).await?;
        Ok(code)
    }

    async fn store_status(&self, token: &str, status: QrStatus) -> AppResult<QrCode> {
        QrCodeRepo::set_status(&self.pool, token, status)
            .await?
            .ok_or_else(|| CoreError::TokenNotFound(token.to_string()).into())
    }

    /// Best-effort artifact removal after the registry row is gone.
    async fn discard_artifact(&self, token: &str) {
        if let Err(e) = self.artifacts.delete(token).await {
            tracing::warn!(token = %token, error = %e, "Failed to remove QR artifact");
        }
    }
}

fn views(codes: Vec<QrCode>) -> AppResult<Vec<QrCodeView>> {
    let now = Utc::now();
    codes
        .into_iter()
        .map(|code| QrCodeView::from_row(code, now).map_err(AppError::from))
        .collect()
}

/// Canonical form of a client-supplied token. Anything that is not a UUID
/// cannot be in the registry.
fn canonical(raw_token: &str) -> Result<String, CoreError> {
    normalize_token(raw_token).ok_or_else(|| CoreError::TokenNotFound(raw_token.trim().to_string()))
}

fn byte_size(bytes: &[u8]) -> Result<i32, CoreError> {
    i32::try_from(bytes.len())
        .map_err(|_| CoreError::Internal(format!("Artifact of {} bytes is too large", bytes.len())))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use assert_matches::assert_matches;
    use tracecode_core::render::RenderOptions;
    use tracecode_core::roles::ROLE_PRODUCER;
    use tracecode_db::models::batch::CreateBatch;
    use tracecode_db::models::product::CreateProduct;
    use tracecode_db::models::user::CreateUser;
    use tracecode_db::repositories::{ProductRepo, UserRepo};

    use super::*;

    async fn seed(pool: &PgPool, root: &Path) -> (QrCodeService, Actor, DbId) {
        let producer = UserRepo::create(
            pool,
            &CreateUser {
                username: "lisi".to_string(),
                role: ROLE_PRODUCER.to_string(),
                tel: None,
                enterprise_id: None,
            },
        )
        .await
        .unwrap();
        let product = ProductRepo::create(
            pool,
            &CreateProduct {
                name: "Organic Cucumber".to_string(),
                producer_id: Some(producer.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let batch = BatchRepo::create(
            pool,
            &CreateBatch {
                batch_code: "B1".to_string(),
                product_id: Some(product.id),
                producer_id: Some(producer.id),
                notes: None,
            },
        )
        .await
        .unwrap();

        let service = QrCodeService::new(
            pool.clone(),
            QrCodeConfig {
                public_base_url: "http://localhost:3000".to_string(),
                storage_root: root.to_path_buf(),
                default_payload_mode: PayloadMode::Link,
                render: RenderOptions::default(),
            },
        );
        (service, Actor::new(producer.id, ROLE_PRODUCER), batch.id)
    }

    fn file_count(root: &Path) -> usize {
        std::fs::read_dir(root).unwrap().count()
    }

    #[sqlx::test(migrations = "../../db/migrations")]
    async fn taken_token_leaves_existing_artifact_untouched(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let (service, owner, batch_id) = seed(&pool, dir.path()).await;
        let existing = service
            .create(&owner, batch_id, &CreateQrCodeRequest::default())
            .await
            .unwrap();
        let original = service.artifacts().get(&existing.token).await.unwrap().unwrap();

        let lineage = service.authorize_batch(&owner, batch_id).await.unwrap();
        let err = service
            .mint_token(
                existing.token.clone(),
                &lineage,
                PayloadMode::EmbeddedSnapshot,
                None,
            )
            .await
            .unwrap_err();

        assert_matches!(err, AppError::Core(CoreError::DuplicateToken(ref t)) if *t == existing.token);
        assert_eq!(
            service.artifacts().get(&existing.token).await.unwrap(),
            Some(original)
        );
        assert_eq!(file_count(dir.path()), 1);
        let row = service.find(&owner, &existing.token).await.unwrap();
        assert_eq!(row.encoded_content, existing.encoded_content);
        assert_eq!(row.payload_mode, PayloadMode::Link);
    }

    #[sqlx::test(migrations = "../../db/migrations")]
    async fn taken_token_without_artifact_is_rejected_and_cleaned_up(pool: PgPool) {
        let dir = tempfile::tempdir().unwrap();
        let (service, owner, batch_id) = seed(&pool, dir.path()).await;
        let existing = service
            .create(&owner, batch_id, &CreateQrCodeRequest::default())
            .await
            .unwrap();
        service.artifacts().delete(&existing.token).await.unwrap();

        let lineage = service.authorize_batch(&owner, batch_id).await.unwrap();
        let err = service
            .mint_token(
                existing.token.clone(),
                &lineage,
                PayloadMode::EmbeddedSnapshot,
                None,
            )
            .await
            .unwrap_err();

        assert_matches!(err, AppError::Core(CoreError::DuplicateToken(_)));
        assert_eq!(file_count(dir.path()), 0);

        // The cache miss heals from the original row, not the rejected mint.
        let healed = service.read_image(&existing.token).await.unwrap();
        assert_eq!(
            healed.bytes,
            render_png(&existing.encoded_content, RenderOptions::default()).unwrap()
        );
    }
}
