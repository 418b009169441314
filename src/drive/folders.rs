// sitebackup/src/drive/folders.rs
use crate::drive::store::{DriveStore, FolderQuery};
use crate::errors::StoreError;
use crate::utils::with_backoff;

/// Resolves a slash-delimited logical path to the id of its deepest folder,
/// creating missing folders along the way.
///
/// Segments resolve strictly left to right, each one under the previously
/// resolved id, so every segment is looked up exactly once. Folder names are
/// not unique in the store; when duplicates exist the first match wins and
/// shadows any later one.
pub async fn resolve_path<S: DriveStore>(store: &S, path: &str) -> Result<String, StoreError> {
    let mut parent: Option<String> = None;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let id = resolve_segment(store, segment, parent.as_deref()).await?;
        parent = Some(id);
    }
    parent.ok_or_else(|| StoreError::Protocol(format!("empty folder path {path:?}")))
}

async fn resolve_segment<S: DriveStore>(
    store: &S,
    name: &str,
    parent: Option<&str>,
) -> Result<String, StoreError> {
    let query = FolderQuery {
        name_equals: Some(name.to_string()),
        parent: parent.map(str::to_string),
        ..Default::default()
    };
    let matches = with_backoff("folder lookup", || store.list_folders(&query)).await?;
    if let Some(existing) = matches.into_iter().next() {
        return Ok(existing.id);
    }
    with_backoff("folder creation", || store.create_folder(name, parent)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::fake::FakeStore;

    #[tokio::test]
    async fn test_resolve_creates_chain_once_then_reuses_it() -> anyhow::Result<()> {
        let store = FakeStore::new();

        let first = resolve_path(&store, "acme/20260831120000").await?;
        assert_eq!(store.folder_creations(), 2);

        let second = resolve_path(&store, "acme/20260831120000").await?;
        assert_eq!(second, first);
        // Idempotent: no additional folders on the second resolution.
        assert_eq!(store.folder_creations(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_reuses_existing_prefix() -> anyhow::Result<()> {
        let store = FakeStore::new();
        let acme = store.seed_folder("acme", None, chrono::Utc::now());

        let resolved = resolve_path(&store, "acme/20260831120000/database").await?;

        // Only the two missing segments were created, both under the seeded root.
        assert_eq!(store.folder_creations(), 2);
        let parents = store.parent_of(&resolved);
        assert!(parents.is_some());
        assert_eq!(store.root_ancestor(&resolved), acme);
        Ok(())
    }

    #[tokio::test]
    async fn test_first_match_shadows_duplicate_folders() -> anyhow::Result<()> {
        let store = FakeStore::new();
        let older = store.seed_folder("acme", None, chrono::Utc::now());
        let _duplicate = store.seed_folder("acme", None, chrono::Utc::now());

        let resolved = resolve_path(&store, "acme").await?;
        assert_eq!(resolved, older);
        assert_eq!(store.folder_creations(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_path_is_an_error() {
        let store = FakeStore::new();
        assert!(resolve_path(&store, "").await.is_err());
    }
}
