// sitebackup/src/backup/retention.rs
use chrono::{DateTime, Utc};

use crate::config::Site;
use crate::drive::session::SessionProvider;
use crate::drive::store::{DriveStore, FolderQuery};
use crate::errors::AppError;
use crate::utils::with_backoff;

/// Decides whether a fresh backup is due for `site`, pruning expired remote
/// backup folders along the way when `remove_after` is configured.
///
/// Every configured account is evaluated and the per-account results are
/// combined with OR: the site is due as soon as any account reports due. An
/// account with no matching top-level folder reports due (nothing was ever
/// backed up there), as does any account when no `backup_every` policy is
/// set.
pub async fn is_backup_due<P: SessionProvider>(
    provider: &P,
    site: &Site,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    let mut due = false;
    for account in &site.accounts {
        due |= evaluate_account(provider, site, account.index, now).await?;
    }
    Ok(due)
}

async fn evaluate_account<P: SessionProvider>(
    provider: &P,
    site: &Site,
    account_index: usize,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    let session = provider.open(site, account_index).await?;
    let store = &session.store;

    let mut names = vec![site.name.clone()];
    if let Some(db) = &site.database {
        names.push(db.name.clone());
    }
    let top_query = FolderQuery {
        name_contains_any: names,
        ..Default::default()
    };
    let top_folders = with_backoff("site folder lookup", || store.list_folders(&top_query)).await?;
    let Some(site_folder) = top_folders.into_iter().next() else {
        // Nothing remote for this account yet.
        return Ok(true);
    };

    if let Some(remove_after) = site.remove_after {
        prune_expired(store, &site_folder.id, now - remove_after).await?;
    }

    if let Some(backup_every) = site.backup_every {
        let recent_query = FolderQuery {
            parent: Some(site_folder.id.clone()),
            modified_after: Some(now - backup_every),
            ..Default::default()
        };
        let recent =
            with_backoff("recent backup lookup", || store.list_folders(&recent_query)).await?;
        // A sub-folder younger than the policy window means this account
        // already holds a fresh backup.
        return Ok(recent.is_empty());
    }

    Ok(true)
}

/// Deletes sub-folders of the site folder last modified before `cutoff`.
/// Destructive and unconditional; each target is printed before deletion.
async fn prune_expired<S: DriveStore>(
    store: &S,
    site_folder_id: &str,
    cutoff: DateTime<Utc>,
) -> Result<(), AppError> {
    let expired_query = FolderQuery {
        parent: Some(site_folder_id.to_string()),
        modified_before: Some(cutoff),
        ..Default::default()
    };
    let expired =
        with_backoff("expired backup lookup", || store.list_folders(&expired_query)).await?;
    if expired.is_empty() {
        return Ok(());
    }

    println!("Removing expired backup folders:");
    for folder in expired {
        println!("{} ({})", folder.name, folder.id);
        with_backoff("backup folder deletion", || store.delete_file(&folder.id)).await?;
    }
    Ok(())
}
