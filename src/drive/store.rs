// sitebackup/src/drive/store.rs
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::StoreError;

/// Folder listing constraints. All queries implicitly exclude trashed
/// folders; `parent: None` leaves the containment unconstrained, which is how
/// top-level path segments are looked up.
#[derive(Debug, Clone, Default)]
pub struct FolderQuery {
    pub name_equals: Option<String>,
    pub name_contains_any: Vec<String>,
    pub parent: Option<String>,
    pub modified_before: Option<DateTime<Utc>>,
    pub modified_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// Metadata sent with the deferred creation request that opens a resumable
/// upload.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub parent_folder_id: String,
    pub size: u64,
}

/// One in-flight resumable upload. Chunks are sent strictly in file order,
/// one outstanding at a time.
#[derive(Debug)]
pub struct UploadHandle {
    pub session_uri: String,
    pub bytes_sent: u64,
    pub total_size: u64,
}

#[derive(Debug)]
pub enum ChunkStatus {
    /// The store accepted the chunk but the file is not complete yet.
    Partial,
    /// The terminal chunk was accepted and the file now exists remotely.
    Complete(RemoteFile),
}

/// Capability surface of the remote object store. The production
/// implementation is [`http::GoogleDriveClient`](super::http::GoogleDriveClient);
/// tests run against an in-memory fake that records chunk boundaries.
#[allow(async_fn_in_trait)]
pub trait DriveStore {
    async fn list_folders(&self, query: &FolderQuery) -> Result<Vec<RemoteFolder>, StoreError>;

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String, StoreError>;

    async fn delete_file(&self, id: &str) -> Result<(), StoreError>;

    async fn begin_upload(&self, metadata: &FileMetadata) -> Result<UploadHandle, StoreError>;

    async fn send_chunk(
        &self,
        handle: &mut UploadHandle,
        bytes: &[u8],
    ) -> Result<ChunkStatus, StoreError>;
}
