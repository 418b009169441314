// sitebackup/src/drive/session.rs
use chrono::Utc;
use std::path::PathBuf;

use crate::config::{Account, Site};
use crate::drive::http::{GoogleDriveClient, GoogleOauthClient};
use crate::drive::store::DriveStore;
use crate::drive::token::{Token, TokenStore};
use crate::errors::{AppError, AuthError};

/// One authenticated connection to the remote store for a (site, account)
/// pair.
pub struct Session<S> {
    pub store: S,
    pub account_index: usize,
}

/// Token acquisition seam, implemented by [`GoogleOauthClient`] in
/// production.
#[allow(async_fn_in_trait)]
pub trait Authorizer {
    fn auth_url(&self) -> String;

    async fn exchange_code(&self, code: &str) -> Result<Token, AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthError>;
}

/// Opens sessions for (site, account-index) pairs. The orchestrator and the
/// retention evaluator only see this trait, which is what makes them
/// testable against an in-memory store.
#[allow(async_fn_in_trait)]
pub trait SessionProvider {
    type Store: DriveStore;

    async fn open(&self, site: &Site, account_index: usize) -> Result<Session<Self::Store>, AppError>;
}

/// Production provider: persisted tokens under the credentials directory,
/// OAuth against Google, Drive v3 for store calls.
pub struct DriveSessionProvider {
    tokens: TokenStore,
    redirect_uri: String,
}

impl DriveSessionProvider {
    pub fn new(credentials_dir: PathBuf, redirect_uri: String) -> Self {
        DriveSessionProvider {
            tokens: TokenStore::new(credentials_dir),
            redirect_uri,
        }
    }
}

impl SessionProvider for DriveSessionProvider {
    type Store = GoogleDriveClient;

    async fn open(
        &self,
        site: &Site,
        account_index: usize,
    ) -> Result<Session<GoogleDriveClient>, AppError> {
        let account = site.accounts.get(account_index).ok_or_else(|| {
            AppError::Config(format!(
                "site {}: account index {account_index} is not configured",
                site.name
            ))
        })?;
        let oauth = GoogleOauthClient::new(account, &self.redirect_uri);
        let token = resolve_token(&self.tokens, site, account, &oauth).await?;
        let store = GoogleDriveClient::new(token.access_token)?;
        Ok(Session {
            store,
            account_index,
        })
    }
}

/// Token resolution order: persisted file, then auth-code exchange, else
/// `MissingAuthCode`. Expired tokens are refreshed in place and re-persisted
/// with the original refresh token preserved even when the provider omits it
/// from the refresh response.
pub(crate) async fn resolve_token<A: Authorizer>(
    tokens: &TokenStore,
    site: &Site,
    account: &Account,
    auth: &A,
) -> Result<Token, AuthError> {
    let token = match tokens.load(&account.client_id)? {
        Some(token) => token,
        None => {
            let Some(code) = account.auth_code.as_deref() else {
                // Unattended mode: print the URL for the operator, then fail.
                println!(
                    "Account {} of site {} needs authorization. Open the following link, \
                     then put the verification code into the account's auth_code:\n{}",
                    account.index,
                    site.name,
                    auth.auth_url()
                );
                return Err(AuthError::MissingAuthCode {
                    site: site.name.clone(),
                    account_index: account.index,
                });
            };
            let token = auth.exchange_code(code).await?;
            tokens.save(&account.client_id, &token)?;
            println!(
                "Credentials saved for account {} of site {}.",
                account.index, site.name
            );
            token
        }
    };

    if !token.is_expired(Utc::now()) {
        return Ok(token);
    }

    let refresh_token = token.refresh_token.clone().ok_or_else(|| {
        AuthError::RefreshFailed(format!(
            "persisted token for account {} of site {} is expired and has no refresh token",
            account.index, site.name
        ))
    })?;
    let refreshed = auth
        .refresh(&refresh_token)
        .await?
        .merged_with_refresh(Some(refresh_token));
    tokens.save(&account.client_id, &refreshed)?;
    Ok(refreshed)
}
