// sitebackup/src/drive/upload.rs
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use crate::drive::store::{ChunkStatus, DriveStore, FileMetadata, RemoteFile};
use crate::errors::{AppError, StoreError};

/// Upload chunk size. Each chunk is one transfer call against the store.
const CHUNK_SIZE: usize = 1024 * 1024;
/// Low-level read size; a single read is not guaranteed to fill the buffer.
const READ_SIZE: usize = 8 * 1024;

const ARCHIVE_MIME_TYPE: &str = "application/gzip";
const ARCHIVE_DESCRIPTION: &str = "Site backup archive.";

/// Resumable chunked uploader. Reads the local file in bounded low-level
/// reads, accumulates them into fixed-size chunks and sends the chunks
/// sequentially, one outstanding at a time. The remote descriptor is only
/// returned from the terminal chunk; any chunk failure aborts the upload and
/// leaves the local file in place. Chunk sends are not retried here; retry
/// policy belongs to the orchestrator.
pub struct ChunkUploader {
    chunk_size: usize,
    read_size: usize,
}

impl Default for ChunkUploader {
    fn default() -> Self {
        ChunkUploader {
            chunk_size: CHUNK_SIZE,
            read_size: READ_SIZE,
        }
    }
}

impl ChunkUploader {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_sizes(chunk_size: usize, read_size: usize) -> Self {
        ChunkUploader {
            chunk_size,
            read_size,
        }
    }

    pub async fn upload<S: DriveStore>(
        &self,
        store: &S,
        local_file: &Path,
        destination_folder_id: &str,
    ) -> Result<RemoteFile, AppError> {
        let size = fs::metadata(local_file)?.len();
        let name = local_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AppError::Archive(format!(
                    "archive part {} has no file name",
                    local_file.display()
                ))
            })?;

        let metadata = FileMetadata {
            name,
            description: ARCHIVE_DESCRIPTION.to_string(),
            mime_type: ARCHIVE_MIME_TYPE.to_string(),
            parent_folder_id: destination_folder_id.to_string(),
            size,
        };
        let mut handle = store.begin_upload(&metadata).await?;

        if size == 0 {
            return match store.send_chunk(&mut handle, &[]).await? {
                ChunkStatus::Complete(file) => Ok(file),
                ChunkStatus::Partial => Err(StoreError::Protocol(
                    "store returned a partial result for an empty file".to_string(),
                )
                .into()),
            };
        }

        let mut reader = File::open(local_file)?;
        loop {
            let chunk = read_full_chunk(&mut reader, self.chunk_size, self.read_size)?;
            if chunk.is_empty() {
                return Err(StoreError::Protocol(format!(
                    "{} ended after {} of {} bytes without a terminal result",
                    local_file.display(),
                    handle.bytes_sent,
                    handle.total_size
                ))
                .into());
            }
            match store.send_chunk(&mut handle, &chunk).await? {
                ChunkStatus::Partial => continue,
                ChunkStatus::Complete(file) => return Ok(file),
            }
        }
    }
}

// Keeps issuing low-level reads until the chunk threshold is met or EOF; a
// single read may return short.
fn read_full_chunk(
    reader: &mut impl Read,
    chunk_size: usize,
    read_size: usize,
) -> std::io::Result<Vec<u8>> {
    let mut chunk = Vec::with_capacity(chunk_size);
    let mut buf = vec![0u8; read_size];
    while chunk.len() < chunk_size {
        let wanted = read_size.min(chunk_size - chunk.len());
        let n = reader.read(&mut buf[..wanted])?;
        if n == 0 {
            break;
        }
        chunk.extend_from_slice(&buf[..n]);
    }
    Ok(chunk)
}
