//! Site Backup Tool
//!
//! Archives configured sites (codebase plus optional database), spreads the
//! split archives across multiple remote store accounts and prunes old
//! remote backups per site policy.

// sitebackup/src/main.rs
mod backup;
mod config;
mod drive;
mod errors;
mod utils;

use anyhow::{Context, Result};
use config::AppConfig;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// Main entry point for the backup tool
#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(_) => {
            println!("✅ All site backups processed.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // Expects config.json next to the executable or in the project root when
    // running with `cargo run`.
    let config_path = PathBuf::from("config.json");
    let app_config = AppConfig::load_from_json(&config_path).context(format!(
        "Failed to load application configuration from {}",
        config_path.display()
    ))?;

    // An optional first argument restricts the run to a single site.
    let args: Vec<String> = env::args().collect();
    let only_site = args.get(1).map(|s| s.trim().to_string());
    if let Some(name) = &only_site {
        if !app_config.sites.contains_key(name) {
            anyhow::bail!("Site {name:?} is not configured in config.json");
        }
        println!("🚀 Starting backup run for site {name}...");
    } else {
        println!("🚀 Starting backup run for {} site(s)...", app_config.sites.len());
    }

    backup::run_backup_flow(&app_config, only_site.as_deref())
        .await
        .context("Backup run failed")
}
