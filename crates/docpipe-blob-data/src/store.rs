//! Blob store capability
//!
//! Opaque byte storage keyed by path. Every tenant-owned object lives under
//! the `{tenant_id}/` prefix; the store itself never interprets paths.

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use std::sync::Arc;

use docpipe_config::{BlobBackend, BlobConfig};

use crate::error::{BlobDataError, BlobDataResult};

/// Path-keyed byte storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write (or overwrite) the object at `path`
    ///
    /// `content_type` is advisory; backends without metadata support
    /// ignore it.
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> BlobDataResult<()>;

    /// Read the object at `path`
    async fn get(&self, path: &str) -> BlobDataResult<Bytes>;

    /// Delete the object at `path`; deleting a missing object is not an
    /// error
    async fn delete(&self, path: &str) -> BlobDataResult<()>;

    /// Delete every object under `prefix`, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> BlobDataResult<usize>;

    /// Whether an object exists at `path`
    async fn exists(&self, path: &str) -> BlobDataResult<bool>;
}

/// Blob store over an `object_store` backend
///
/// In-memory for dev/tests, local filesystem for the daemon; S3-compatible
/// backends slot in through the same trait object.
pub struct ObjectBlobStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectBlobStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    /// Volatile in-memory store
    pub fn memory() -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()))
    }

    /// Store rooted at a local directory
    ///
    /// # Errors
    ///
    /// Returns `BlobDataError::Storage` if the root does not exist or is
    /// not usable.
    pub fn local(root: &str) -> BlobDataResult<Self> {
        let fs = object_store::local::LocalFileSystem::new_with_prefix(root)
            .map_err(|e| BlobDataError::Storage(format!("Invalid blob root {root}: {e}")))?;
        Ok(Self::new(Arc::new(fs)))
    }

    /// Construct the backend selected by configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a local root is configured but unusable.
    pub fn from_config(config: &BlobConfig) -> BlobDataResult<Self> {
        match &config.backend {
            BlobBackend::Memory => Ok(Self::memory()),
            BlobBackend::Local { root } => Self::local(root),
        }
    }

    fn parse_path(path: &str) -> BlobDataResult<ObjectPath> {
        ObjectPath::parse(path).map_err(|e| BlobDataError::InvalidPath {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn put(&self, path: &str, bytes: Bytes, _content_type: &str) -> BlobDataResult<()> {
        let object_path = Self::parse_path(path)?;
        self.inner.put(&object_path, bytes.into()).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> BlobDataResult<Bytes> {
        let object_path = Self::parse_path(path)?;
        let result = self.inner.get(&object_path).await?;
        Ok(result.bytes().await?)
    }

    async fn delete(&self, path: &str) -> BlobDataResult<()> {
        let object_path = Self::parse_path(path)?;
        match self.inner.delete(&object_path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> BlobDataResult<usize> {
        let object_prefix = Self::parse_path(prefix.trim_end_matches('/'))?;

        let paths: Vec<ObjectPath> = self
            .inner
            .list(Some(&object_prefix))
            .map_ok(|meta| meta.location)
            .try_collect()
            .await?;

        let mut deleted = 0;
        for path in paths {
            match self.inner.delete(&path).await {
                Ok(()) => deleted += 1,
                Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(prefix = %prefix, deleted, "Deleted blob prefix");
        Ok(deleted)
    }

    async fn exists(&self, path: &str) -> BlobDataResult<bool> {
        let object_path = Self::parse_path(path)?;
        match self.inner.head(&object_path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
