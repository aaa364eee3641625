//! Upload targets for finished feed files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload to {location} returned HTTP {status}")]
    UnexpectedStatus { location: String, status: u16 },

    #[error("invalid upload URL '{0}'")]
    InvalidUrl(String),
}

/// Destination for generated feed files, addressed by object key.
#[async_trait]
pub(crate) trait FeedStore: Send + Sync {
    /// Stores the file at `path` under `key`, returning where it landed.
    async fn put(&self, key: &str, path: &Path) -> Result<String, StoreError>;
}

/// Copies feeds into a local bucket directory.
pub(crate) struct FilesystemStore {
    bucket_dir: PathBuf,
}

impl FilesystemStore {
    pub(crate) fn new(bucket_dir: PathBuf) -> Self {
        Self { bucket_dir }
    }
}

#[async_trait]
impl FeedStore for FilesystemStore {
    async fn put(&self, key: &str, path: &Path) -> Result<String, StoreError> {
        tokio::fs::create_dir_all(&self.bucket_dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.bucket_dir.display().to_string(),
                source,
            })?;
        let target = self.bucket_dir.join(key);
        tokio::fs::copy(path, &target)
            .await
            .map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Ok(target.display().to_string())
    }
}

/// PUTs feeds to `<base_url>/<key>`.
pub(crate) struct HttpStore {
    client: Client,
    base_url: Url,
}

impl HttpStore {
    pub(crate) fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        let base_url =
            Url::parse(base_url).map_err(|_| StoreError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    fn object_url(&self, key: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(key);
        }
        url
    }
}

#[async_trait]
impl FeedStore for HttpStore {
    async fn put(&self, key: &str, path: &Path) -> Result<String, StoreError> {
        let body = tokio::fs::read(path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let url = self.object_url(key);
        let response = self
            .client
            .put(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus {
                location: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(url.to_string())
    }
}
