// sitebackup/src/drive/token.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::errors::AuthError;
use crate::utils::sanitize_client_id;

/// OAuth token as persisted per (site, account).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Merges a refresh response into this token. Providers may omit the
    /// refresh token from refresh responses; the previously stored one must
    /// never be lost.
    pub fn merged_with_refresh(self, previous_refresh_token: Option<String>) -> Token {
        Token {
            refresh_token: self.refresh_token.or(previous_refresh_token),
            ..self
        }
    }
}

/// One JSON token file per account under the credentials directory, keyed by
/// a filesystem-safe derivation of the client id.
#[derive(Debug, Clone)]
pub struct TokenStore {
    root: PathBuf,
}

impl TokenStore {
    pub fn new(root: PathBuf) -> Self {
        TokenStore { root }
    }

    fn path_for(&self, client_id: &str) -> PathBuf {
        self.root
            .join(format!("{}.json", sanitize_client_id(client_id)))
    }

    /// Reads the persisted token for an account. A missing file, a file whose
    /// body signals an authorization error, or an unparseable file all count
    /// as "no token": the caller falls back to a fresh authorization.
    pub fn load(&self, client_id: &str) -> Result<Option<Token>, AuthError> {
        let path = self.path_for(client_id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::TokenStore(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        if contents.contains("error_description") {
            println!(
                "Persisted token at {} signals an authorization error; discarding it.",
                path.display()
            );
            return Ok(None);
        }

        match serde_json::from_str(&contents) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                eprintln!(
                    "⚠ Persisted token at {} is unreadable ({}); discarding it.",
                    path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    pub fn save(&self, client_id: &str, token: &Token) -> Result<(), AuthError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            AuthError::TokenStore(format!(
                "failed to create credentials directory {}: {e}",
                self.root.display()
            ))
        })?;
        let path = self.path_for(client_id);
        let serialized = serde_json::to_string_pretty(token)
            .map_err(|e| AuthError::TokenStore(format!("failed to serialize token: {e}")))?;
        fs::write(&path, serialized).map_err(|e| {
            AuthError::TokenStore(format!("failed to write {}: {e}", path.display()))
        })?;
        Ok(())
    }

    #[cfg(test)]
    pub fn file_path(&self, client_id: &str) -> PathBuf {
        self.path_for(client_id)
    }
}
