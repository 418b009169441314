// sitebackup/src/backup/logic.rs
use anyhow::Result;
use chrono::Utc;
use std::fs;

use crate::backup::archive::{self, ArchiveOutput};
use crate::backup::{cleanup, retention, rotation};
use crate::config::{AppConfig, Site};
use crate::drive::folders;
use crate::drive::session::{DriveSessionProvider, SessionProvider};
use crate::drive::upload::ChunkUploader;
use crate::errors::AppError;

/// Top-level loop: sites are processed strictly one at a time. A failing
/// site is logged and skipped; the run continues with the next one.
pub async fn perform_backup_orchestration(
    config: &AppConfig,
    only_site: Option<&str>,
) -> Result<()> {
    let provider =
        DriveSessionProvider::new(config.credentials_dir.clone(), config.request_uri.clone());

    for (name, raw) in &config.sites {
        if only_site.is_some_and(|only| only != name.as_str()) {
            continue;
        }
        let site = match Site::from_raw(name, raw) {
            Ok(site) => site,
            Err(e) => {
                eprintln!("❌ Skipping site {name}: {e}");
                continue;
            }
        };

        match run_site(&provider, &site, config).await {
            Ok(true) => println!("Backup complete for {name}."),
            Ok(false) => println!("Backup for {name} is still fresh, skipping."),
            Err(e) => eprintln!("❌ Backup for {name} failed: {e}"),
        }
    }
    Ok(())
}

/// One site's pass through the state machine:
/// DueCheck -> Archiving -> Uploading -> Cleanup.
///
/// Returns `Ok(false)` when the due check decided to skip. On an upload
/// failure local artifacts are left in place (no cleanup), so nothing is
/// lost that was not confirmed remote.
async fn run_site<P: SessionProvider>(
    provider: &P,
    site: &Site,
    config: &AppConfig,
) -> Result<bool, AppError> {
    if !retention::is_backup_due(provider, site, Utc::now()).await? {
        return Ok(false);
    }
    println!("Starting backup for {}.", site.name);

    let output = archive::archive_site(site, config)?;
    upload_site(provider, site, &output).await?;
    cleanup::remove_stray_archives(&config.fileroot)?;
    Ok(true)
}

/// Remote destination for one backup run: `[parent_folder/]site/timestamp`.
fn destination_path(site: &Site, timestamp: &str) -> String {
    match &site.parent_folder {
        Some(parent) => format!("{parent}/{}/{timestamp}", site.name),
        None => format!("{}/{timestamp}", site.name),
    }
}

/// Uploading phase: every codebase part in discovery order through its
/// rotated account, then the database dump through account 0. A local part
/// is deleted only after its upload returned the terminal remote descriptor.
pub(crate) async fn upload_site<P: SessionProvider>(
    provider: &P,
    site: &Site,
    output: &ArchiveOutput,
) -> Result<(), AppError> {
    let destination = destination_path(site, &output.timestamp);
    let uploader = ChunkUploader::new();

    for (part_index, part) in output.parts.iter().enumerate() {
        let account = rotation::account_for(site, part_index)?;
        let session = provider.open(site, account.index).await?;
        let folder_id = folders::resolve_path(&session.store, &destination).await?;
        let remote = uploader.upload(&session.store, part, &folder_id).await?;
        println!(
            "✓ Uploaded {} as {} via account {}.",
            part.display(),
            remote.name,
            account.index
        );
        fs::remove_file(part)?;
    }

    if let Some(dump) = &output.db_dump {
        let session = provider.open(site, rotation::DATABASE_ACCOUNT).await?;
        let folder_id =
            folders::resolve_path(&session.store, &format!("{destination}/database")).await?;
        let remote = uploader.upload(&session.store, dump, &folder_id).await?;
        println!("✓ Uploaded database dump as {}.", remote.name);
        fs::remove_file(dump)?;
    }

    Ok(())
}
