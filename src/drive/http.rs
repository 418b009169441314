// sitebackup/src/drive/http.rs
use chrono::{Duration, Utc};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::config::Account;
use crate::drive::session::Authorizer;
use crate::drive::store::{
    ChunkStatus, DriveStore, FileMetadata, FolderQuery, RemoteFile, RemoteFolder, UploadHandle,
};
use crate::drive::token::Token;
use crate::errors::{AuthError, StoreError};

const API_BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const FOLDER_DESCRIPTION: &str = "Site backup directory.";

/// Full read/write scope on the store.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

// Drive uses 308 "Resume Incomplete" for accepted-but-unfinished chunks.
const RESUME_INCOMPLETE: u16 = 308;

/// Drive v3 client bound to one access token.
pub struct GoogleDriveClient {
    http: reqwest::Client,
    access_token: String,
    api_base: String,
    upload_base: String,
}

impl GoogleDriveClient {
    pub fn new(access_token: String) -> Result<Self, StoreError> {
        Self::with_bases(access_token, API_BASE.to_string(), UPLOAD_BASE.to_string())
    }

    pub fn with_bases(
        access_token: String,
        api_base: String,
        upload_base: String,
    ) -> Result<Self, StoreError> {
        // 308 chunk responses must reach us, not the redirect follower.
        let http = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()?;
        Ok(GoogleDriveClient {
            http,
            access_token,
            api_base,
            upload_base,
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Renders a [`FolderQuery`] as a Drive `q` expression. Every query pins the
/// folder MIME type and `trashed = false`.
fn build_query(query: &FolderQuery) -> String {
    let mut clauses = vec![
        format!("mimeType = '{FOLDER_MIME_TYPE}'"),
        "trashed = false".to_string(),
    ];
    if let Some(name) = &query.name_equals {
        clauses.push(format!("name = '{}'", escape_query_value(name)));
    }
    if !query.name_contains_any.is_empty() {
        let alternatives: Vec<String> = query
            .name_contains_any
            .iter()
            .map(|name| format!("name contains '{}'", escape_query_value(name)))
            .collect();
        clauses.push(format!("({})", alternatives.join(" or ")));
    }
    if let Some(parent) = &query.parent {
        clauses.push(format!("'{}' in parents", escape_query_value(parent)));
    }
    if let Some(before) = query.modified_before {
        clauses.push(format!("modifiedTime < '{}'", before.to_rfc3339()));
    }
    if let Some(after) = query.modified_after {
        clauses.push(format!("modifiedTime > '{}'", after.to_rfc3339()));
    }
    clauses.join(" and ")
}

async fn api_error(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    StoreError::Api { status, message }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFolder>,
}

#[derive(Debug, Deserialize)]
struct CreatedId {
    id: String,
}

impl DriveStore for GoogleDriveClient {
    async fn list_folders(&self, query: &FolderQuery) -> Result<Vec<RemoteFolder>, StoreError> {
        let response = self
            .http
            .get(format!("{}/files", self.api_base))
            .header("Authorization", self.bearer())
            .query(&[
                ("q", build_query(query)),
                ("fields", "files(id, name)".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let list: FileList = response.json().await?;
        Ok(list.files)
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String, StoreError> {
        let mut metadata = json!({
            "name": name,
            "description": FOLDER_DESCRIPTION,
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(parent) = parent {
            metadata["parents"] = json!([parent]);
        }

        let response = self
            .http
            .post(format!("{}/files", self.api_base))
            .header("Authorization", self.bearer())
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let created: CreatedId = response.json().await?;
        Ok(created.id)
    }

    async fn delete_file(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(format!("{}/files/{}", self.api_base, id))
            .header("Authorization", self.bearer())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    async fn begin_upload(&self, metadata: &FileMetadata) -> Result<UploadHandle, StoreError> {
        let body = json!({
            "name": metadata.name,
            "description": metadata.description,
            "mimeType": metadata.mime_type,
            "parents": [metadata.parent_folder_id],
        });

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .header("Authorization", self.bearer())
            .header("X-Upload-Content-Type", &metadata.mime_type)
            .header("X-Upload-Content-Length", metadata.size.to_string())
            .query(&[("uploadType", "resumable")])
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let session_uri = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                StoreError::Protocol(
                    "resumable upload initiation returned no Location header".to_string(),
                )
            })?
            .to_string();

        Ok(UploadHandle {
            session_uri,
            bytes_sent: 0,
            total_size: metadata.size,
        })
    }

    async fn send_chunk(
        &self,
        handle: &mut UploadHandle,
        bytes: &[u8],
    ) -> Result<ChunkStatus, StoreError> {
        let content_range = if handle.total_size == 0 {
            "bytes */0".to_string()
        } else {
            let start = handle.bytes_sent;
            let end = start + bytes.len() as u64 - 1;
            format!("bytes {}-{}/{}", start, end, handle.total_size)
        };

        let response = self
            .http
            .put(&handle.session_uri)
            .header("Authorization", self.bearer())
            .header(CONTENT_RANGE, content_range)
            .header(CONTENT_LENGTH, bytes.len().to_string())
            .header(CONTENT_TYPE, "application/gzip")
            .body(bytes.to_vec())
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == RESUME_INCOMPLETE {
            handle.bytes_sent += bytes.len() as u64;
            return Ok(ChunkStatus::Partial);
        }
        if status == StatusCode::OK || status == StatusCode::CREATED {
            handle.bytes_sent += bytes.len() as u64;
            let file: RemoteFile = response.json().await?;
            return Ok(ChunkStatus::Complete(file));
        }
        Err(api_error(response).await)
    }
}

/// OAuth client for one account's credentials, used by the session layer to
/// exchange authorization codes and refresh expired tokens.
pub struct GoogleOauthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_endpoint: String,
    token_endpoint: String,
}

impl GoogleOauthClient {
    pub fn new(account: &Account, redirect_uri: &str) -> Self {
        Self::with_endpoints(
            account,
            redirect_uri,
            AUTH_ENDPOINT.to_string(),
            TOKEN_ENDPOINT.to_string(),
        )
    }

    pub fn with_endpoints(
        account: &Account,
        redirect_uri: &str,
        auth_endpoint: String,
        token_endpoint: String,
    ) -> Self {
        GoogleOauthClient {
            http: reqwest::Client::new(),
            client_id: account.client_id.clone(),
            client_secret: account.client_secret.clone(),
            redirect_uri: redirect_uri.to_string(),
            auth_endpoint,
            token_endpoint,
        }
    }

    async fn request_token(
        &self,
        params: &[(&str, &str)],
    ) -> Result<Token, String> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("token endpoint returned {status}: {body}"));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            refresh_token: Option<String>,
            expires_in: i64,
        }

        let parsed: TokenResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(Token {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            expires_at: Utc::now() + Duration::seconds(parsed.expires_in),
        })
    }
}

impl Authorizer for GoogleOauthClient {
    fn auth_url(&self) -> String {
        let params = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", DRIVE_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("approval_prompt", "force")
            .finish();
        format!("{}?{}", self.auth_endpoint, params)
    }

    async fn exchange_code(&self, code: &str) -> Result<Token, AuthError> {
        self.request_token(&[
            ("code", code),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .await
        .map_err(AuthError::ExchangeFailed)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthError> {
        self.request_token(&[
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("grant_type", "refresh_token"),
        ])
        .await
        .map_err(AuthError::RefreshFailed)
    }
}
