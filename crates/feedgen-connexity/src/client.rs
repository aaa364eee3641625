//! HTTP client for the Connexity publisher exports.
//!
//! Every export is a gzip file fetched with the publisher credentials in the
//! query string. Bodies are decompressed on the blocking pool and written
//! straight to disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::{Client, Url};

use crate::error::ConnexityError;
use crate::index::{FeedKind, OfferLink};

pub const MERCHANTS_FILE: &str = "merchants.json";
pub const MULTIPLIER_FILE: &str = "ecpc_multiplier_feed.csv";

const OFFER_INDEX_URL: &str = "http://publisherexports.connexity.com/feeds/mid/index.txt.gz";
const PLA_INDEX_URL: &str =
    "https://publisherexports-beta.connexity.com/feeds/mid/index_pla.txt.gz";
const MERCHANTS_URL: &str = "https://publisherexports.connexity.com/feeds/mid/merchants.json.gz";
const MULTIPLIER_URL: &str =
    "http://publisherexports.connexity.com/feeds/ecpc_multiplier_feed.csv.gz";

/// Export locations. [`ConnexityEndpoints::default`] points at production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnexityEndpoints {
    pub offer_index: String,
    pub pla_index: String,
    pub merchants: String,
    pub multiplier: String,
}

impl Default for ConnexityEndpoints {
    fn default() -> Self {
        Self {
            offer_index: OFFER_INDEX_URL.to_string(),
            pla_index: PLA_INDEX_URL.to_string(),
            merchants: MERCHANTS_URL.to_string(),
            multiplier: MULTIPLIER_URL.to_string(),
        }
    }
}

impl ConnexityEndpoints {
    /// All exports under one host, keeping the production paths. Used to
    /// point the client at a mock server.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            offer_index: format!("{base}/feeds/mid/index.txt.gz"),
            pla_index: format!("{base}/feeds/mid/index_pla.txt.gz"),
            merchants: format!("{base}/feeds/mid/merchants.json.gz"),
            multiplier: format!("{base}/feeds/ecpc_multiplier_feed.csv.gz"),
        }
    }

    fn index(&self, kind: FeedKind) -> &str {
        match kind {
            FeedKind::Default => &self.offer_index,
            FeedKind::Pla => &self.pla_index,
        }
    }
}

/// Client for the Connexity export host.
///
/// Use [`ConnexityClient::new`] for production or
/// [`ConnexityClient::with_endpoints`] to point at a mock server in tests.
pub struct ConnexityClient {
    client: Client,
    publisher_id: String,
    api_key: String,
    endpoints: ConnexityEndpoints,
}

impl ConnexityClient {
    /// Creates a client for the production exports.
    ///
    /// # Errors
    ///
    /// Returns [`ConnexityError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        publisher_id: &str,
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ConnexityError> {
        Self::with_endpoints(
            publisher_id,
            api_key,
            timeout_secs,
            user_agent,
            ConnexityEndpoints::default(),
        )
    }

    /// Creates a client with custom export locations.
    ///
    /// # Errors
    ///
    /// Returns [`ConnexityError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_endpoints(
        publisher_id: &str,
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        endpoints: ConnexityEndpoints,
    ) -> Result<Self, ConnexityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            publisher_id: publisher_id.to_owned(),
            api_key: api_key.to_owned(),
            endpoints,
        })
    }

    /// Downloads both index files into `root` as `index.txt` and
    /// `index_pla.txt`.
    ///
    /// # Errors
    ///
    /// Returns any [`ConnexityError`] raised while fetching or writing.
    pub async fn download_index_files(&self, root: &Path) -> Result<Vec<PathBuf>, ConnexityError> {
        let mut saved = Vec::with_capacity(2);
        for kind in [FeedKind::Default, FeedKind::Pla] {
            let destination = root.join(kind.index_file_name());
            self.download_gzipped(self.endpoints.index(kind), &destination)
                .await?;
            saved.push(destination);
        }
        Ok(saved)
    }

    /// Downloads `merchants.json` into `root`.
    ///
    /// # Errors
    ///
    /// Returns any [`ConnexityError`] raised while fetching or writing.
    pub async fn download_merchant_file(&self, root: &Path) -> Result<PathBuf, ConnexityError> {
        let destination = root.join(MERCHANTS_FILE);
        self.download_gzipped(&self.endpoints.merchants, &destination)
            .await?;
        Ok(destination)
    }

    /// Downloads the eCPC multiplier table into `root`.
    ///
    /// # Errors
    ///
    /// Returns any [`ConnexityError`] raised while fetching or writing.
    pub async fn download_multiplier(&self, root: &Path) -> Result<PathBuf, ConnexityError> {
        let destination = root.join(MULTIPLIER_FILE);
        self.download_gzipped(&self.endpoints.multiplier, &destination)
            .await?;
        Ok(destination)
    }

    /// Downloads each part into `feeds_dir` as `<name>.json` or `<name>.csv`,
    /// sequentially and in the given order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failed download.
    pub async fn download_offer_files(
        &self,
        links: &[OfferLink],
        feeds_dir: &Path,
    ) -> Result<Vec<PathBuf>, ConnexityError> {
        let mut saved = Vec::with_capacity(links.len());
        for link in links {
            let destination = feeds_dir.join(link.file_name());
            self.download_gzipped(&link.url, &destination).await?;
            tracing::debug!(part = %link.name, "offer part downloaded");
            saved.push(destination);
        }
        Ok(saved)
    }

    /// Appends the publisher credentials to `endpoint`.
    fn authorized_url(&self, endpoint: &str) -> Result<Url, ConnexityError> {
        let mut url = Url::parse(endpoint).map_err(|e| ConnexityError::InvalidUrl {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("publisherId", &self.publisher_id)
            .append_pair("apiKey", &self.api_key);
        Ok(url)
    }

    /// Fetches a gzip export and writes the decompressed body to `destination`.
    async fn download_gzipped(
        &self,
        endpoint: &str,
        destination: &Path,
    ) -> Result<(), ConnexityError> {
        let url = self.authorized_url(endpoint)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_ENCODING, "gzip, deflate")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnexityError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;

        let endpoint_owned = endpoint.to_string();
        let path = destination.to_path_buf();
        let written =
            tokio::task::spawn_blocking(move || gunzip_to_file(&body, &path, &endpoint_owned))
                .await??;

        tracing::info!(
            endpoint,
            destination = %destination.display(),
            bytes = written,
            "export downloaded"
        );
        Ok(())
    }
}

fn gunzip_to_file(body: &[u8], path: &Path, endpoint: &str) -> Result<u64, ConnexityError> {
    let file = File::create(path).map_err(|source| ConnexityError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    let decompress_err = |source| ConnexityError::Decompress {
        endpoint: endpoint.to_string(),
        path: path.display().to_string(),
        source,
    };
    let written = std::io::copy(&mut GzDecoder::new(body), &mut out).map_err(decompress_err)?;
    out.flush().map_err(decompress_err)?;
    Ok(written)
}
