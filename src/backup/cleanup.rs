// sitebackup/src/backup/cleanup.rs
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::errors::AppError;

/// Removes leftover `*.gz` archives anywhere under the working directory.
///
/// Split part files carry a `.part_xx` suffix and are never touched, so
/// parts stranded by an upload failure survive for the operator. The sweep
/// is blind to which site (or run) produced a file; overlapping runs sharing
/// a fileroot are unsupported.
pub fn remove_stray_archives(fileroot: &Path) -> Result<(), AppError> {
    if !fileroot.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(fileroot) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.ends_with(".gz") {
            println!("Removing stray archive {}", entry.path().display());
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
