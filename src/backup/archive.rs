// sitebackup/src/backup/archive.rs
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use which::which;

use crate::config::{AppConfig, DatabaseConfig, Site};
use crate::errors::AppError;

/// Local artifacts produced by the external archive step for one site at one
/// timestamp.
#[derive(Debug)]
pub struct ArchiveOutput {
    /// Split codebase parts in discovery (suffix) order. The position of a
    /// part decides which account uploads it.
    pub parts: Vec<PathBuf>,
    pub db_dump: Option<PathBuf>,
    pub timestamp: String,
}

/// Runs the external archive producer for one site: tar + gzip + size-limited
/// split for the codebase, mysqldump + gzip for the database. Blocking; a
/// long-running archive runs to completion or hard failure.
pub fn archive_site(site: &Site, config: &AppConfig) -> Result<ArchiveOutput, AppError> {
    let timestamp = Local::now().format("%Y%m%d%H%M%S").to_string();
    let workdir = config.fileroot.join(&site.name).join(&timestamp);
    fs::create_dir_all(&workdir)?;

    archive_codebase(site, config, &workdir, &timestamp)?;
    let parts = discover_parts(&workdir)?;
    if parts.is_empty() {
        return Err(AppError::Archive(format!(
            "no archive parts produced for site {} under {}",
            site.name,
            workdir.display()
        )));
    }
    println!(
        "✓ Codebase of {} archived into {} part(s).",
        site.name,
        parts.len()
    );

    let db_dump = match &site.database {
        Some(db) => Some(dump_database(db, config, &timestamp)?),
        None => None,
    };

    Ok(ArchiveOutput {
        parts,
        db_dump,
        timestamp,
    })
}

fn archive_codebase(
    site: &Site,
    config: &AppConfig,
    workdir: &Path,
    timestamp: &str,
) -> Result<(), AppError> {
    for tool in ["tar", "gzip", "split"] {
        find_tool(tool)?;
    }
    let part_prefix = workdir.join(format!("{}_{}.tar.gz.part_", site.name, timestamp));

    let mut command = format!("cd {} && tar", config.webroot);
    for exclusion in &site.exclude_paths {
        command.push_str(&format!(" --exclude {exclusion}"));
    }
    command.push_str(&format!(
        " -C {}/{} -cf - . | gzip -9 | split -b {} - {}",
        config.webroot,
        site.docroot,
        config.storage_limit,
        part_prefix.display()
    ));

    run_shell(&command)
}

fn dump_database(
    db: &DatabaseConfig,
    config: &AppConfig,
    timestamp: &str,
) -> Result<PathBuf, AppError> {
    for tool in ["mysqldump", "gzip"] {
        find_tool(tool)?;
    }
    let dump_path = config.fileroot.join(format!("{}_{}.sql.gz", db.name, timestamp));

    let mut command = format!("mysqldump -u{} -p'{}'", db.user, db.password);
    if let Some(host) = &db.host {
        command.push_str(&format!(" -h {host}"));
    }
    if let Some(port) = db.port {
        command.push_str(&format!(" --port {port}"));
    }
    command.push_str(&format!(" {} | gzip -9 > {}", db.name, dump_path.display()));

    run_shell(&command)?;
    println!("✓ Database {} dumped to {}.", db.name, dump_path.display());
    Ok(dump_path)
}

fn find_tool(name: &str) -> Result<PathBuf, AppError> {
    which(name).map_err(|e| {
        AppError::Archive(format!(
            "{name} executable not found in PATH ({e}); install it or adjust PATH"
        ))
    })
}

fn run_shell(command: &str) -> Result<(), AppError> {
    let sh = find_tool("sh")?;
    let output = Command::new(sh)
        .arg("-c")
        .arg(command)
        .output()
        .map_err(|e| AppError::Archive(format!("failed to run shell command: {e}")))?;

    if !output.status.success() {
        return Err(AppError::Archive(format!(
            "shell pipeline exited with {}\nStdout: {}\nStderr: {}",
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

/// Lists the produced part files in suffix order. `split` names parts with
/// lexicographically increasing suffixes, so a plain sort restores file
/// order.
fn discover_parts(workdir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut parts: Vec<PathBuf> = fs::read_dir(workdir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    parts.sort();
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_discover_parts_sorted_by_suffix() -> anyhow::Result<()> {
        let dir = tempdir()?;
        for suffix in ["ac", "aa", "ab"] {
            fs::write(
                dir.path().join(format!("acme_1.tar.gz.part_{suffix}")),
                b"x",
            )?;
        }

        let parts = discover_parts(dir.path())?;
        let names: Vec<String> = parts
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "acme_1.tar.gz.part_aa",
                "acme_1.tar.gz.part_ab",
                "acme_1.tar.gz.part_ac"
            ]
        );
        Ok(())
    }

    #[test]
    fn test_discover_parts_skips_directories() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("nested"))?;
        fs::write(dir.path().join("acme_1.tar.gz.part_aa"), b"x")?;

        let parts = discover_parts(dir.path())?;
        assert_eq!(parts.len(), 1);
        Ok(())
    }

    #[test]
    fn test_run_shell_reports_nonzero_exit() {
        let result = run_shell("exit 3");
        match result {
            Err(AppError::Archive(message)) => assert!(message.contains("exit")),
            other => panic!("expected Archive error, got {other:?}"),
        }
    }

    #[test]
    fn test_run_shell_success() -> anyhow::Result<()> {
        run_shell("true")?;
        Ok(())
    }
}
