// sitebackup/src/config/mod.rs
use anyhow::{Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::AppError;
use crate::utils::duration::parse_duration;

const DEFAULT_CREDENTIALS_DIR: &str = "./credentials";

// Structs for deserializing config.json
#[derive(Debug, Clone, Deserialize)]
pub struct RawAccountConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub auth_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDatabaseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSiteConfig {
    pub docroot: Option<String>,
    pub exclude_paths: Option<Vec<String>>,
    pub parent_folder: Option<String>,
    pub remove_after: Option<String>,
    pub backup_every: Option<String>,
    pub database: Option<RawDatabaseConfig>,
    pub accounts: Option<Vec<RawAccountConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    pub webroot: Option<String>,
    pub fileroot: Option<PathBuf>,
    pub request_uri: Option<String>,
    pub storage_limit: Option<String>,
    pub credentials_dir: Option<PathBuf>,
    pub sites: Option<BTreeMap<String, RawSiteConfig>>,
}

// Application's internal configuration structs
#[derive(Debug, Clone)]
pub struct Account {
    /// Stable position within the site's rotation; also routes uploads.
    pub index: usize,
    pub client_id: String,
    pub client_secret: String,
    pub auth_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Site {
    pub name: String,
    pub docroot: String,
    pub exclude_paths: Vec<String>,
    pub parent_folder: Option<String>,
    pub remove_after: Option<Duration>,
    pub backup_every: Option<Duration>,
    pub database: Option<DatabaseConfig>,
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub webroot: String,
    pub fileroot: PathBuf,
    pub request_uri: String,
    /// Passed verbatim to `split -b`, e.g. "500M". One remote account per part.
    pub storage_limit: String,
    pub credentials_dir: PathBuf,
    pub sites: BTreeMap<String, RawSiteConfig>,
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw: RawConfig = serde_json::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse JSON from config file at {}",
                config_path.display()
            )
        })?;

        let webroot = raw
            .webroot
            .filter(|s| !s.is_empty())
            .context("webroot must be set in config.json")?;
        let fileroot = raw
            .fileroot
            .filter(|p| !p.as_os_str().is_empty())
            .context("fileroot must be set in config.json")?;
        let request_uri = raw
            .request_uri
            .filter(|s| !s.is_empty())
            .context("request_uri must be set in config.json")?;
        let storage_limit = raw
            .storage_limit
            .filter(|s| !s.is_empty())
            .context("storage_limit must be set in config.json")?;
        let sites = raw.sites.unwrap_or_default();
        if sites.is_empty() {
            println!("Warning: no sites configured in config.json; nothing to back up.");
        }

        Ok(AppConfig {
            webroot,
            fileroot,
            request_uri,
            storage_limit,
            credentials_dir: raw
                .credentials_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_DIR)),
            sites,
        })
    }
}

impl Site {
    /// Validates one raw site entry. A failure here is fatal for that site
    /// only; the orchestrator logs it and moves on to the next site.
    pub fn from_raw(name: &str, raw: &RawSiteConfig) -> Result<Self, AppError> {
        let docroot = raw
            .docroot
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Config(format!("site {name}: docroot must be set")))?
            .clone();

        let accounts = parse_accounts(name, raw.accounts.as_deref().unwrap_or_default())?;
        if accounts.is_empty() {
            return Err(AppError::Config(format!(
                "site {name}: at least one account must be configured"
            )));
        }

        let database = match &raw.database {
            Some(db) => Some(parse_database(name, db)?),
            None => None,
        };

        let remove_after = raw
            .remove_after
            .as_deref()
            .map(|s| parse_site_duration(name, "remove_after", s))
            .transpose()?;
        let backup_every = raw
            .backup_every
            .as_deref()
            .map(|s| parse_site_duration(name, "backup_every", s))
            .transpose()?;

        Ok(Site {
            name: name.to_string(),
            docroot,
            exclude_paths: raw.exclude_paths.clone().unwrap_or_default(),
            parent_folder: raw.parent_folder.clone().filter(|s| !s.is_empty()),
            remove_after,
            backup_every,
            database,
            accounts,
        })
    }
}

fn parse_accounts(site: &str, raw: &[RawAccountConfig]) -> Result<Vec<Account>, AppError> {
    raw.iter()
        .enumerate()
        .map(|(index, account)| {
            let client_id = account
                .client_id
                .as_ref()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    AppError::Config(format!("site {site}: account {index} is missing client_id"))
                })?;
            let client_secret = account
                .client_secret
                .as_ref()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "site {site}: account {index} is missing client_secret"
                    ))
                })?;
            Ok(Account {
                index,
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                auth_code: account.auth_code.clone().filter(|s| !s.is_empty()),
            })
        })
        .collect()
}

// A database section must supply user, password and name together, or none.
fn parse_database(site: &str, raw: &RawDatabaseConfig) -> Result<DatabaseConfig, AppError> {
    match (
        raw.user.as_ref().filter(|s| !s.is_empty()),
        raw.password.as_ref().filter(|s| !s.is_empty()),
        raw.name.as_ref().filter(|s| !s.is_empty()),
    ) {
        (Some(user), Some(password), Some(name)) => Ok(DatabaseConfig {
            host: raw.host.clone().filter(|s| !s.is_empty()),
            port: raw.port,
            user: user.clone(),
            password: password.clone(),
            name: name.clone(),
        }),
        _ => Err(AppError::Config(format!(
            "site {site}: database section must supply user, password and name together"
        ))),
    }
}

fn parse_site_duration(site: &str, field: &str, value: &str) -> Result<Duration, AppError> {
    parse_duration(value)
        .map_err(|e| AppError::Config(format!("site {site}: invalid {field} {value:?}: {e}")))
}
