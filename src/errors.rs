// sitebackup/src/errors.rs
use thiserror::Error;

/// Account-level authorization failures. Fatal for the account they occur on;
/// every operation that depends on that account's session aborts.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(
        "no authorization code configured for account {account_index} of site {site}; \
         add auth_code to the account entry in config.json"
    )]
    MissingAuthCode { site: String, account_index: usize },

    #[error("authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("token store error: {0}")]
    TokenStore(String),
}

/// Transient remote-store failures (network, API). Bounded retry with backoff
/// is applied around list/create/delete calls; chunk sends are never retried
/// at this level.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("store protocol error: {0}")]
    Protocol(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("remote store error: {0}")]
    Store(#[from] StoreError),

    #[error(
        "site {site} produced {parts} archive parts but only {accounts} account(s) are \
         configured; add accounts or raise the storage limit"
    )]
    QuotaExhausted {
        site: String,
        parts: usize,
        accounts: usize,
    },

    #[error("archive step failed: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
