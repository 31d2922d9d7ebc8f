use std::{fmt::Display, path::{Path, PathBuf}, sync::Arc, time::Duration};

use futures::StreamExt;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;

use crate::archive;

/// Full attempts of the write sequence before a fetch is reported as failed.
pub const FETCH_ATTEMPTS: u32 = 3;
pub const TEMP_SUFFIX: &str = "tmp-download";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{}", DisplayReqwest(.0))]
    Reqwest(#[from] reqwest::Error),
    #[error("{url} responded with {status}")]
    HttpStatus {
        url: Arc<str>,
        status: StatusCode,
    },
    #[error("Empty download for {url}")]
    EmptyBody {
        url: Arc<str>,
    },
    #[error("Rejected download from {url}: {reason}")]
    Rejected {
        url: Arc<str>,
        reason: &'static str,
    },
}

impl FetchError {
    /// Client errors are answered the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpStatus { status, .. } => status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS,
            Self::Rejected { .. } => false,
            Self::Reqwest(error) => !error.is_builder(),
            Self::Io(_) | Self::EmptyBody { .. } => true,
        }
    }
}

struct DisplayReqwest<'a>(&'a reqwest::Error);

impl Display for DisplayReqwest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let error = self.0;
        if let Some(url) = error.url() {
            if error.is_connect() {
                return write!(f, "Unable to connect to {url}");
            } else if error.is_timeout() {
                return write!(f, "Connection to {url} timed out");
            } else if error.is_decode() || error.is_body() {
                return write!(f, "Unable to read response from {url}");
            } else if error.is_builder() {
                return write!(f, "Unexpected error while constructing request to {url}");
            }
        } else if error.is_connect() {
            return f.write_str("Unable to connect");
        } else if error.is_timeout() {
            return f.write_str("Connection timed out");
        }
        write!(f, "Network error: {error}")
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    #[error("No source available for {label}")]
    NoCandidates {
        label: Arc<str>,
    },
    #[error("Unable to download {label}: {last}")]
    Exhausted {
        label: Arc<str>,
        last: FetchError,
    },
}

/// Acceptance check run on a freshly written file before a candidate is accepted.
#[derive(Debug, Clone, Copy)]
pub enum Validation<'a> {
    None,
    /// Applied to `.jar`/`.zip` destinations only. Listed entries must exist with a non-zero size.
    Archive(&'a [&'a str]),
    Sha1([u8; 20]),
}

impl Validation<'_> {
    /// SHA-1 validation for a hex digest, or none when the digest is absent or malformed.
    pub fn sha1_hex(hash: Option<&str>) -> Validation<'static> {
        let mut expected = [0u8; 20];
        match hash.map(|hash| hex::decode_to_slice(hash, &mut expected)) {
            Some(Ok(())) => Validation::Sha1(expected),
            _ => Validation::None,
        }
    }

    async fn accepts(self, path: &Path) -> bool {
        match self {
            Validation::None => true,
            Validation::Archive(required) => {
                if !archive::is_archive_path(path) {
                    return true;
                }
                let path = path.to_path_buf();
                let required: Vec<String> = required.iter().map(|entry| entry.to_string()).collect();
                tokio::task::spawn_blocking(move || {
                    let required: Vec<&str> = required.iter().map(String::as_str).collect();
                    archive::is_valid_archive(&path, &required)
                }).await.unwrap_or(false)
            },
            Validation::Sha1(expected) => {
                let path = path.to_path_buf();
                tokio::task::spawn_blocking(move || crate::check_sha1_hash(&path, expected))
                    .await
                    .map(|result| result.unwrap_or(false))
                    .unwrap_or(false)
            },
        }
    }
}

/// Atomic single-URL fetcher with an ordered multi-URL fallback on top.
#[derive(Clone, Debug)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Downloads `url` to `dest` through a `.tmp-download` sibling, retrying transient failures.
    ///
    /// `dest` is only ever replaced by a complete, non-empty file.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let parent = dest.parent().ok_or_else(|| std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{dest:?} has no parent directory"),
        ))?;
        let temp = temp_path(dest);

        let mut attempt = 0;
        loop {
            match self.fetch_once(url, parent, dest, &temp).await {
                Ok(size) => return Ok(size),
                Err(error) => {
                    let _ = tokio::fs::remove_file(&temp).await;
                    attempt += 1;
                    if attempt >= FETCH_ATTEMPTS || !error.is_transient() {
                        return Err(error);
                    }
                    log::debug!("Retrying {url} after attempt {attempt} failed: {error}");
                    relax_permissions(parent);
                    tokio::time::sleep(Duration::from_millis(200 + (attempt as u64 - 1) * 150)).await;
                },
            }
        }
    }

    async fn fetch_once(&self, url: &str, parent: &Path, dest: &Path, temp: &Path) -> Result<u64, FetchError> {
        crate::ensure_dir(parent)?;
        relax_permissions(parent);

        if dest.is_dir() {
            tokio::fs::remove_dir_all(dest).await?;
        }
        crate::remove_path(temp)?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus { url: url.into(), status: response.status() });
        }

        let mut file = tokio::fs::File::create(temp).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if written == 0 {
            return Err(FetchError::EmptyBody { url: url.into() });
        }

        // The parent may have been swept away while streaming
        crate::ensure_dir(parent)?;
        if tokio::fs::rename(temp, dest).await.is_err() {
            tokio::fs::copy(temp, dest).await?;
            let _ = tokio::fs::remove_file(temp).await;
        }

        Ok(written)
    }

    /// Tries each candidate strictly in order until one yields a file that passes `validation`.
    ///
    /// A file failing validation is deleted and the next candidate is tried.
    pub async fn fetch_any<S: AsRef<str>>(&self, urls: &[S], dest: &Path, label: &str, validation: Validation<'_>) -> Result<(), DownloadError> {
        let mut last = None;
        for url in urls {
            let url = url.as_ref();
            match self.fetch(url, dest).await {
                Ok(_) => {
                    if validation.accepts(dest).await {
                        return Ok(());
                    }
                    log::warn!("Download of {label} from {url} failed validation");
                    let _ = crate::remove_path(dest);
                    last = Some(FetchError::Rejected { url: url.into(), reason: "content failed validation" });
                },
                Err(error) => {
                    log::debug!("Download of {label} from {url} failed: {error}");
                    last = Some(error);
                },
            }
        }

        match last {
            Some(last) => Err(DownloadError::Exhausted { label: label.into(), last }),
            None => Err(DownloadError::NoCandidates { label: label.into() }),
        }
    }
}

pub fn temp_path(dest: &Path) -> PathBuf {
    let mut temp = dest.to_path_buf();
    temp.add_extension(TEMP_SUFFIX);
    temp
}

/// Restores owner access to a directory that lost it.
fn relax_permissions(dir: &Path) {
    let Ok(metadata) = std::fs::metadata(dir) else {
        return;
    };
    let mut permissions = metadata.permissions();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if permissions.mode() & 0o700 == 0o700 {
            return;
        }
        permissions.set_mode(0o700);
    }
    #[cfg(not(unix))]
    {
        if !permissions.readonly() {
            return;
        }
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
    }

    if let Err(error) = std::fs::set_permissions(dir, permissions) {
        log::debug!("Unable to relax permissions of {dir:?}: {error}");
    }
}
