// sitebackup/src/drive/fake.rs
//
// In-memory DriveStore used by unit tests: a folder tree with modified-time
// stamps, recorded chunk boundaries and injectable chunk failures.
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::Site;
use crate::drive::session::{Session, SessionProvider};
use crate::drive::store::{
    ChunkStatus, DriveStore, FileMetadata, FolderQuery, RemoteFile, RemoteFolder, UploadHandle,
};
use crate::errors::{AppError, StoreError};

#[derive(Debug, Clone)]
struct FakeFolder {
    id: String,
    name: String,
    parent: Option<String>,
    modified: DateTime<Utc>,
    trashed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeFile {
    pub id: String,
    pub name: String,
    pub parent: String,
    pub size: u64,
}

#[derive(Debug)]
struct PendingUpload {
    metadata: FileMetadata,
    received: u64,
    sends: usize,
}

#[derive(Debug, Default)]
struct Inner {
    folders: Vec<FakeFolder>,
    files: Vec<FakeFile>,
    uploads: HashMap<String, PendingUpload>,
    chunk_log: Vec<usize>,
    deleted: Vec<String>,
    folder_creations: usize,
    fail_chunk_at: Option<usize>,
    next_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FakeStore {
    inner: Arc<Mutex<Inner>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(inner: &mut Inner, prefix: &str) -> String {
        inner.next_id += 1;
        format!("{}-{}", prefix, inner.next_id)
    }

    pub fn seed_folder(
        &self,
        name: &str,
        parent: Option<&str>,
        modified: DateTime<Utc>,
    ) -> String {
        let mut inner = self.inner.lock().expect("fake store lock");
        let id = Self::next_id(&mut inner, "seeded");
        inner.folders.push(FakeFolder {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.map(str::to_string),
            modified,
            trashed: false,
        });
        id
    }

    /// Fails the Nth (0-based) chunk send of each upload.
    pub fn fail_chunk_at(&self, send_index: usize) {
        self.inner.lock().expect("fake store lock").fail_chunk_at = Some(send_index);
    }

    pub fn folder_creations(&self) -> usize {
        self.inner.lock().expect("fake store lock").folder_creations
    }

    pub fn chunk_log(&self) -> Vec<usize> {
        self.inner.lock().expect("fake store lock").chunk_log.clone()
    }

    pub fn files(&self) -> Vec<FakeFile> {
        self.inner.lock().expect("fake store lock").files.clone()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.inner.lock().expect("fake store lock").deleted.clone()
    }

    pub fn folder_name(&self, id: &str) -> Option<String> {
        let inner = self.inner.lock().expect("fake store lock");
        inner
            .folders
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.name.clone())
    }

    pub fn parent_of(&self, id: &str) -> Option<String> {
        let inner = self.inner.lock().expect("fake store lock");
        inner
            .folders
            .iter()
            .find(|f| f.id == id)
            .and_then(|f| f.parent.clone())
    }

    /// Walks parent links to the top of the tree.
    pub fn root_ancestor(&self, id: &str) -> String {
        let mut current = id.to_string();
        while let Some(parent) = self.parent_of(&current) {
            current = parent;
        }
        current
    }
}

fn matches_query(folder: &FakeFolder, query: &FolderQuery) -> bool {
    if folder.trashed {
        return false;
    }
    if let Some(name) = &query.name_equals {
        if &folder.name != name {
            return false;
        }
    }
    if !query.name_contains_any.is_empty()
        && !query
            .name_contains_any
            .iter()
            .any(|needle| folder.name.contains(needle.as_str()))
    {
        return false;
    }
    if let Some(parent) = &query.parent {
        if folder.parent.as_deref() != Some(parent.as_str()) {
            return false;
        }
    }
    if let Some(before) = query.modified_before {
        if folder.modified >= before {
            return false;
        }
    }
    if let Some(after) = query.modified_after {
        if folder.modified <= after {
            return false;
        }
    }
    true
}

impl DriveStore for FakeStore {
    async fn list_folders(&self, query: &FolderQuery) -> Result<Vec<RemoteFolder>, StoreError> {
        let inner = self.inner.lock().expect("fake store lock");
        Ok(inner
            .folders
            .iter()
            .filter(|folder| matches_query(folder, query))
            .map(|folder| RemoteFolder {
                id: folder.id.clone(),
                name: folder.name.clone(),
            })
            .collect())
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String, StoreError> {
        let mut inner = self.inner.lock().expect("fake store lock");
        let id = Self::next_id(&mut inner, "folder");
        inner.folders.push(FakeFolder {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.map(str::to_string),
            modified: Utc::now(),
            trashed: false,
        });
        inner.folder_creations += 1;
        Ok(id)
    }

    async fn delete_file(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("fake store lock");
        let Some(folder) = inner.folders.iter_mut().find(|f| f.id == id) else {
            return Err(StoreError::Api {
                status: 404,
                message: format!("no such file {id}"),
            });
        };
        folder.trashed = true;
        inner.deleted.push(id.to_string());
        Ok(())
    }

    async fn begin_upload(&self, metadata: &FileMetadata) -> Result<UploadHandle, StoreError> {
        let mut inner = self.inner.lock().expect("fake store lock");
        let session_uri = Self::next_id(&mut inner, "upload");
        inner.uploads.insert(
            session_uri.clone(),
            PendingUpload {
                metadata: metadata.clone(),
                received: 0,
                sends: 0,
            },
        );
        Ok(UploadHandle {
            session_uri,
            bytes_sent: 0,
            total_size: metadata.size,
        })
    }

    async fn send_chunk(
        &self,
        handle: &mut UploadHandle,
        bytes: &[u8],
    ) -> Result<ChunkStatus, StoreError> {
        let mut inner = self.inner.lock().expect("fake store lock");
        let fail_at = inner.fail_chunk_at;
        let Some(upload) = inner.uploads.get_mut(&handle.session_uri) else {
            return Err(StoreError::Protocol(format!(
                "unknown upload session {}",
                handle.session_uri
            )));
        };

        if fail_at == Some(upload.sends) {
            upload.sends += 1;
            return Err(StoreError::Api {
                status: 503,
                message: "injected chunk failure".to_string(),
            });
        }

        upload.sends += 1;
        upload.received += bytes.len() as u64;
        let received = upload.received;
        let total = upload.metadata.size;
        let name = upload.metadata.name.clone();
        let parent = upload.metadata.parent_folder_id.clone();
        handle.bytes_sent += bytes.len() as u64;
        inner.chunk_log.push(bytes.len());

        if received >= total {
            let id = Self::next_id(&mut inner, "file");
            inner.files.push(FakeFile {
                id: id.clone(),
                name: name.clone(),
                parent,
                size: total,
            });
            inner.uploads.remove(&handle.session_uri);
            return Ok(ChunkStatus::Complete(RemoteFile { id, name }));
        }
        Ok(ChunkStatus::Partial)
    }
}

/// Session provider over fake stores. With a single store every account
/// shares it; with one store per account each index gets its own view.
pub struct FakeSessionProvider {
    stores: Vec<FakeStore>,
}

impl FakeSessionProvider {
    pub fn shared(store: FakeStore) -> Self {
        FakeSessionProvider {
            stores: vec![store],
        }
    }

    pub fn per_account(stores: Vec<FakeStore>) -> Self {
        FakeSessionProvider { stores }
    }
}

impl SessionProvider for FakeSessionProvider {
    type Store = FakeStore;

    async fn open(
        &self,
        site: &Site,
        account_index: usize,
    ) -> Result<Session<FakeStore>, AppError> {
        let store = if self.stores.len() == 1 {
            self.stores[0].clone()
        } else {
            self.stores
                .get(account_index)
                .cloned()
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "site {}: no fake store for account {account_index}",
                        site.name
                    ))
                })?
        };
        Ok(Session {
            store,
            account_index,
        })
    }
}
