pub mod duration;

use std::future::Future;
use std::time::Duration;

use crate::errors::StoreError;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Bounded retry with doubling backoff for remote-store calls.
///
/// Applied around list/create/delete operations; chunk sends are excluded,
/// their failure aborts the upload for the current file.
pub async fn with_backoff<T, F, Fut>(what: &str, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut delay = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_ATTEMPTS => {
                eprintln!(
                    "⚠ {} failed (attempt {}/{}): {}. Retrying in {:?}...",
                    what, attempt, MAX_ATTEMPTS, e, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Derives a filesystem-safe token-file key from an OAuth client id.
pub fn sanitize_client_id(client_id: &str) -> String {
    let trimmed = client_id
        .strip_suffix(".apps.googleusercontent.com")
        .unwrap_or(client_id);
    trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
