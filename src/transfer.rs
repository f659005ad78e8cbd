//! Chunked HTTP-to-file copy with cooperative cancellation.
//!
//! The body is written in slices of at most `chunk_size` bytes and the
//! cancellation token is polled before every slice. A cancelled copy leaves
//! whatever was already written on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::TransferError;

/// Chunk size used when nothing else is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// One source URL and the file it lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub source: Url,
    pub destination: PathBuf,
}

impl TransferJob {
    /// Parses `url` and names the destination after its last path segment.
    ///
    /// Query string and fragment are ignored for the name. An existing file
    /// with the same name is overwritten when the job runs.
    pub fn new(url: &str, output_dir: &Path) -> Result<Self, TransferError> {
        let source = Url::parse(url).map_err(|source| TransferError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let file_name = file_name_from_url(&source)
            .ok_or_else(|| TransferError::NoFileName(url.to_string()))?;
        let destination = output_dir.join(file_name);
        Ok(Self {
            source,
            destination,
        })
    }
}

fn file_name_from_url(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
}

/// How a transfer ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed { bytes: u64 },
    /// Stopped at a chunk boundary; `bytes` remain on disk.
    Cancelled { bytes: u64 },
}

impl TransferOutcome {
    pub fn bytes(&self) -> u64 {
        match self {
            TransferOutcome::Completed { bytes } | TransferOutcome::Cancelled { bytes } => *bytes,
        }
    }
}

/// Streams remote resources to disk.
#[derive(Debug, Clone)]
pub struct Transfer {
    client: Client,
    chunk_size: usize,
}

impl Transfer {
    pub fn new(client: Client, chunk_size: usize) -> Self {
        Self {
            client,
            chunk_size: chunk_size.max(1),
        }
    }

    /// HTTP client with a connect timeout only.
    ///
    /// There is no read timeout: a source that stalls mid-body blocks the
    /// transfer until it is cancelled and the next chunk arrives.
    pub fn build_client(connect_timeout: Duration) -> Result<Client, reqwest::Error> {
        Client::builder().connect_timeout(connect_timeout).build()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Copies `job.source` into `job.destination`.
    ///
    /// `on_chunk` receives the running byte total after each write.
    pub async fn run<F>(
        &self,
        job: &TransferJob,
        cancel: &CancellationToken,
        mut on_chunk: F,
    ) -> Result<TransferOutcome, TransferError>
    where
        F: FnMut(u64),
    {
        if cancel.is_cancelled() {
            return Ok(TransferOutcome::Cancelled { bytes: 0 });
        }

        if let Some(parent) = job.destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        tracing::debug!(source = %job.source, destination = %job.destination.display(), "starting transfer");

        let mut response = self
            .client
            .get(job.source.clone())
            .send()
            .await?
            .error_for_status()?;
        let mut file = File::create(&job.destination).await?;
        let mut written: u64 = 0;

        while let Some(bytes) = response.chunk().await? {
            for piece in bytes.chunks(self.chunk_size) {
                if cancel.is_cancelled() {
                    file.flush().await?;
                    tracing::debug!(bytes = written, destination = %job.destination.display(), "transfer cancelled, keeping partial file");
                    return Ok(TransferOutcome::Cancelled { bytes: written });
                }
                file.write_all(piece).await?;
                written += piece.len() as u64;
                on_chunk(written);
            }
        }

        file.flush().await?;
        tracing::debug!(bytes = written, destination = %job.destination.display(), "transfer finished");
        Ok(TransferOutcome::Completed { bytes: written })
    }
}
