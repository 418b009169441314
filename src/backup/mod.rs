pub(crate) mod archive;
pub(crate) mod cleanup;
mod logic;
pub(crate) mod retention;
pub(crate) mod rotation;

use anyhow::Result;

use crate::config::AppConfig;

/// Public entry point for the backup run. Orchestrates every configured
/// site, or just `only_site` when one was selected on the command line.
pub async fn run_backup_flow(app_config: &AppConfig, only_site: Option<&str>) -> Result<()> {
    logic::perform_backup_orchestration(app_config, only_site).await
}
