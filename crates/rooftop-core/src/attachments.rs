//! Attachment storage for rooftop documents.
//!
//! Binary bytes go through the `AttachmentStore` port (filesystem now,
//! S3-compatible later); the metadata row lives in `DocumentStore`.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use crate::error::OnboardError;
use crate::ports::DocumentStore;
use crate::types::RooftopDocument;

/// Error type for attachment blob operations
#[derive(Debug, thiserror::Error)]
pub enum AttachmentStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid attachment ref: {0}")]
    InvalidRef(String),

    #[error("Attachment not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<AttachmentStoreError> for OnboardError {
    fn from(err: AttachmentStoreError) -> Self {
        match err {
            AttachmentStoreError::NotFound(r) => OnboardError::NotFound(format!("attachment {r}")),
            AttachmentStoreError::InvalidRef(r) => {
                OnboardError::Integrity(format!("invalid attachment ref {r}"))
            }
            AttachmentStoreError::Io(e) => OnboardError::Internal(e.into()),
            AttachmentStoreError::Storage(m) => OnboardError::Internal(anyhow::anyhow!(m)),
        }
    }
}

/// Abstract blob storage for attachment binaries
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Store binary content, return reference URI
    async fn store(&self, key: &str, content: &[u8]) -> Result<String, AttachmentStoreError>;

    /// Fetch binary content by reference
    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, AttachmentStoreError>;

    /// Delete binary content. Deleting a missing blob is a no-op.
    async fn delete(&self, blob_ref: &str) -> Result<(), AttachmentStoreError>;

    /// Check if blob exists
    async fn exists(&self, blob_ref: &str) -> Result<bool, AttachmentStoreError>;
}

// ── Filesystem adapter ─────────────────────────────────────────

/// Local filesystem implementation
pub struct LocalAttachmentStore {
    base_path: PathBuf,
}

impl LocalAttachmentStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn path_for_key(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    /// Extract path from blob_ref (file:// URI)
    fn path_from_ref(&self, blob_ref: &str) -> Result<PathBuf, AttachmentStoreError> {
        blob_ref
            .strip_prefix("file://")
            .map(PathBuf::from)
            .ok_or_else(|| {
                AttachmentStoreError::InvalidRef(format!("expected file:// prefix: {blob_ref}"))
            })
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn store(&self, key: &str, content: &[u8]) -> Result<String, AttachmentStoreError> {
        let path = self.path_for_key(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        Ok(format!("file://{}", path.display()))
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, AttachmentStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        if !path.exists() {
            return Err(AttachmentStoreError::NotFound(blob_ref.to_string()));
        }
        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), AttachmentStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        if path.exists() {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, AttachmentStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        Ok(path.exists())
    }
}

// ── In-memory adapter ──────────────────────────────────────────

/// In-memory blob store for tests and local development.
#[derive(Default, Clone)]
pub struct MemoryAttachmentStore {
    blobs: std::sync::Arc<tokio::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>>,
}

impl MemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn store(&self, key: &str, content: &[u8]) -> Result<String, AttachmentStoreError> {
        let blob_ref = format!("memory://{key}");
        let mut blobs = self.blobs.write().await;
        blobs.insert(blob_ref.clone(), content.to_vec());
        Ok(blob_ref)
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, AttachmentStoreError> {
        let blobs = self.blobs.read().await;
        blobs
            .get(blob_ref)
            .cloned()
            .ok_or_else(|| AttachmentStoreError::NotFound(blob_ref.to_string()))
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), AttachmentStoreError> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(blob_ref);
        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, AttachmentStoreError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.contains_key(blob_ref))
    }
}

// ── Service ────────────────────────────────────────────────────

/// Uploads, lists, downloads, and deletes rooftop documents, keeping the
/// blob store and the metadata rows in step.
pub struct AttachmentService<'a> {
    documents: &'a dyn DocumentStore,
    blobs: &'a dyn AttachmentStore,
}

impl<'a> AttachmentService<'a> {
    pub fn new(documents: &'a dyn DocumentStore, blobs: &'a dyn AttachmentStore) -> Self {
        Self { documents, blobs }
    }

    /// Store the bytes under `<rooftop_id>/<unix-millis>.<ext>`, then
    /// insert the metadata row pointing at the blob ref.
    pub async fn upload(
        &self,
        rooftop_id: Uuid,
        file_name: &str,
        file_type: &str,
        content: &[u8],
        uploaded_by: Option<Uuid>,
    ) -> crate::ports::Result<RooftopDocument> {
        let key = format!(
            "{}/{}.{}",
            rooftop_id,
            Utc::now().timestamp_millis(),
            extension_of(file_name)
        );
        let blob_ref = self.blobs.store(&key, content).await?;

        let doc = RooftopDocument {
            id: Uuid::new_v4(),
            rooftop_id,
            file_name: file_name.to_string(),
            file_path: blob_ref,
            file_type: file_type.to_string(),
            file_size: content.len() as i64,
            uploaded_at: Utc::now(),
            uploaded_by,
        };
        self.documents.insert_document(&doc).await?;
        info!(%rooftop_id, document_id = %doc.id, file = %doc.file_name, "uploaded document");
        Ok(doc)
    }

    pub async fn download(&self, document_id: Uuid) -> crate::ports::Result<Vec<u8>> {
        let doc = self.documents.get_document(document_id).await?;
        Ok(self.blobs.fetch(&doc.file_path).await?)
    }

    /// Delete blob first, then the row. A blob already gone does not
    /// block removing the row.
    pub async fn delete(&self, document_id: Uuid) -> crate::ports::Result<()> {
        let doc = self.documents.get_document(document_id).await?;
        self.blobs.delete(&doc.file_path).await?;
        self.documents.delete_document(document_id).await?;
        info!(document_id = %doc.id, file = %doc.file_name, "deleted document");
        Ok(())
    }

    pub async fn list(&self, rooftop_id: Uuid) -> crate::ports::Result<Vec<RooftopDocument>> {
        self.documents.list_documents(rooftop_id).await
    }
}

/// File extension for the blob key; falls back to `bin` when the name
/// carries none.
fn extension_of(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("bin")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_attachment_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp_dir.path());

        let content = b"Hello, World!";
        let key = "test/document.pdf";

        let blob_ref = store.store(key, content).await.unwrap();
        assert!(blob_ref.starts_with("file://"));
        assert!(store.exists(&blob_ref).await.unwrap());

        let fetched = store.fetch(&blob_ref).await.unwrap();
        assert_eq!(fetched, content);

        store.delete(&blob_ref).await.unwrap();
        assert!(!store.exists(&blob_ref).await.unwrap());
    }

    #[tokio::test]
    async fn test_local_store_creates_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp_dir.path());

        let blob_ref = store.store("a/b/c/deep/file.txt", b"nested").await.unwrap();
        assert_eq!(store.fetch(&blob_ref).await.unwrap(), b"nested");
    }

    #[tokio::test]
    async fn test_invalid_ref_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp_dir.path());
        let result = store.fetch("s3://bucket/key").await;
        assert!(matches!(result, Err(AttachmentStoreError::InvalidRef(_))));
    }

    #[tokio::test]
    async fn test_memory_store_not_found() {
        let store = MemoryAttachmentStore::new();
        let result = store.fetch("memory://nonexistent").await;
        assert!(matches!(result, Err(AttachmentStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn upload_download_delete_keeps_blob_and_row_in_step() {
        let rows = MemoryStore::new();
        let blobs = MemoryAttachmentStore::new();
        let svc = AttachmentService::new(&rows, &blobs);
        let rooftop_id = Uuid::new_v4();

        let doc = svc
            .upload(rooftop_id, "floor-plan.pdf", "application/pdf", b"pdf bytes", None)
            .await
            .unwrap();
        assert_eq!(doc.file_size, 9);
        assert!(doc.file_path.contains(&rooftop_id.to_string()));
        assert!(doc.file_path.ends_with(".pdf"));
        assert_eq!(svc.download(doc.id).await.unwrap(), b"pdf bytes");
        assert_eq!(svc.list(rooftop_id).await.unwrap().len(), 1);

        svc.delete(doc.id).await.unwrap();
        assert!(svc.list(rooftop_id).await.unwrap().is_empty());
        assert!(!blobs.exists(&doc.file_path).await.unwrap());
    }

    #[test]
    fn extension_falls_back_to_bin() {
        assert_eq!(extension_of("notes.txt"), "txt");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "bin");
        assert_eq!(extension_of("trailing."), "bin");
    }
}
