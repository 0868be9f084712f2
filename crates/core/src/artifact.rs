//! Filesystem store for rendered QR images.
//!
//! One PNG per token at `{root}/{token}.png`. The registry row is the
//! source of truth; files here are a cache of it and may disappear at any
//! time, in which case readers regenerate them from the stored content.
//!
//! Writes go to a unique temporary file first and are then renamed into
//! place, so concurrent regenerations of the same token never expose a
//! half-written file. Because rendering is deterministic, whichever rename
//! lands last leaves the same bytes behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::token::{artifact_file_name, normalize_token};

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Refusing to build an artifact path for malformed token '{0}'")]
    InvalidToken(String),

    #[error("An artifact for token '{0}' already exists")]
    AlreadyExists(String),

    #[error("Artifact I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Local directory holding one image per token.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic location of a token's artifact.
    ///
    /// Only canonical tokens are accepted, so the result always stays
    /// directly under the root.
    pub fn path_for(&self, token: &str) -> Result<PathBuf, ArtifactError> {
        match normalize_token(token) {
            Some(canonical) if canonical == token => Ok(self.root.join(artifact_file_name(token))),
            _ => Err(ArtifactError::InvalidToken(token.to_string())),
        }
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<(), ArtifactError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(io_err(&self.root))
    }

    /// Store `bytes` as the artifact for `token`, replacing any existing file.
    pub async fn put(&self, token: &str, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
        let path = self.path_for(token)?;
        let tmp = self.write_temp(token, bytes).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_err(&path)(e));
        }

        tracing::debug!(token, path = %path.display(), size = bytes.len(), "Stored QR artifact");
        Ok(path)
    }

    /// Store the first artifact for a freshly minted `token`.
    ///
    /// Fails with [`ArtifactError::AlreadyExists`] instead of touching a file
    /// that is already in place. The hard link makes the check and the
    /// publish one atomic step.
    pub async fn put_new(&self, token: &str, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
        let path = self.path_for(token)?;
        let tmp = self.write_temp(token, bytes).await?;
        let linked = fs::hard_link(&tmp, &path).await;
        let _ = fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ArtifactError::AlreadyExists(token.to_string()));
            }
            Err(e) => return Err(io_err(&path)(e)),
        }

        tracing::debug!(token, path = %path.display(), size = bytes.len(), "Stored new QR artifact");
        Ok(path)
    }

    /// Write `bytes` to a uniquely named temporary file under the root.
    async fn write_temp(&self, token: &str, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
        self.ensure_root().await?;
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", artifact_file_name(token), Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_err(&tmp)(e));
        }
        Ok(tmp)
    }

    /// Read the artifact for `token`. `Ok(None)` is a cache miss.
    pub async fn get(&self, token: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        let path = self.path_for(token)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    /// Remove the artifact for `token`. Returns `false` if it was already gone.
    pub async fn delete(&self, token: &str) -> Result<bool, ArtifactError> {
        let path = self.path_for(token)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(&path)(e)),
        }
    }
}
