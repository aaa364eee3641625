//! The regeneration pipeline run for each queued merchant.
//!
//! Status moves pending → regenerating → uploading → done; any error marks
//! the request failed. The webhook fires only after a successful upload.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use feedgen_connexity::{offer_links_from_index, ConnexityClient, FeedKind};
use feedgen_core::{AppConfig, RegenerateStatus};
use feedgen_engine::{combine_pla_feeds, prepare_feed_directories, PlacementResolver};
use uuid::Uuid;

use crate::feed::{build_merchant_feed, combined_source_path, FeedPaths};
use crate::history::History;
use crate::queue::{RegenerateRequest, RegenerateRunner};
use crate::store::{FeedStore, FilesystemStore, HttpStore};
use crate::webhook::Webhook;

pub(crate) struct Pipeline {
    config: Arc<AppConfig>,
    resolver: Arc<PlacementResolver>,
    connexity: Option<ConnexityClient>,
    store: Option<Box<dyn FeedStore>>,
    webhook: Option<Webhook>,
    history: History,
    refetch: bool,
}

impl Pipeline {
    /// Wires collaborators from configuration. Refetching requires Connexity
    /// credentials.
    pub(crate) fn from_config(
        config: Arc<AppConfig>,
        resolver: Arc<PlacementResolver>,
        history: History,
        refetch: bool,
    ) -> anyhow::Result<Self> {
        let connexity = if refetch {
            let (publisher_id, api_key) = config.connexity_credentials().context(
                "CNX_PUBLISHER_ID and CNX_API_KEY must be set to download exports; \
                 pass --no-refetch to rebuild from local files",
            )?;
            Some(ConnexityClient::new(
                publisher_id,
                api_key,
                config.http_timeout_secs,
                &config.user_agent,
            )?)
        } else {
            None
        };

        let store: Option<Box<dyn FeedStore>> = match (&config.upload_url, &config.upload_dir) {
            (Some(url), _) => Some(Box::new(HttpStore::new(
                url,
                config.http_timeout_secs,
                &config.user_agent,
            )?)),
            (None, Some(dir)) => Some(Box::new(FilesystemStore::new(dir.clone()))),
            (None, None) => None,
        };

        let webhook = config
            .webhook_url
            .as_deref()
            .map(|url| Webhook::new(url, config.http_timeout_secs, &config.user_agent))
            .transpose()?;

        Ok(Self {
            config,
            resolver,
            connexity,
            store,
            webhook,
            history,
            refetch,
        })
    }

    async fn regenerate_feed(&self, request: &RegenerateRequest) -> anyhow::Result<()> {
        let merchant_id = request.merchant_id.as_str();
        let request_id = self
            .history
            .record_request(merchant_id, &request.merchant_name)
            .await;

        match self.regenerate_and_upload(merchant_id, request_id).await {
            Ok(()) => {
                self.history
                    .set_status(request_id, RegenerateStatus::Done)
                    .await;
                self.notify(request).await;
                Ok(())
            }
            Err(e) => {
                self.history
                    .set_status(request_id, RegenerateStatus::Failed)
                    .await;
                Err(e)
            }
        }
    }

    async fn regenerate_and_upload(
        &self,
        merchant_id: &str,
        request_id: Option<Uuid>,
    ) -> anyhow::Result<()> {
        if let Some(client) = &self.connexity {
            self.fetch_merchant_exports(client, merchant_id).await?;
        } else {
            tracing::info!(merchant_id, refetch = self.refetch, "using local export files");
            prepare_feed_directories(&self.config.root_path, false)?;
        }

        self.history
            .set_status(request_id, RegenerateStatus::Regenerating)
            .await;
        let built = build_merchant_feed(
            &self.config,
            Arc::clone(&self.resolver),
            merchant_id,
            FeedPaths::default(),
        )
        .await?;

        self.history
            .set_status(request_id, RegenerateStatus::Uploading)
            .await;
        self.upload(&built.path).await
    }

    /// Downloads fresh exports for one merchant and combines its PLA parts.
    async fn fetch_merchant_exports(
        &self,
        client: &ConnexityClient,
        merchant_id: &str,
    ) -> anyhow::Result<()> {
        let root = &self.config.root_path;
        let feeds_dir = prepare_feed_directories(root, true)?;

        client.download_index_files(root).await?;
        client.download_merchant_file(root).await?;
        client.download_multiplier(root).await?;

        let offer_links = links_for(root, FeedKind::Default, merchant_id).await?;
        let pla_links = links_for(root, FeedKind::Pla, merchant_id).await?;
        if pla_links.is_empty() {
            anyhow::bail!("no PLA parts listed for merchant {merchant_id}");
        }
        tracing::info!(
            merchant_id,
            offer_parts = offer_links.len(),
            pla_parts = pla_links.len(),
            "downloading offer parts"
        );

        client.download_offer_files(&offer_links, &feeds_dir).await?;
        let pla_parts = client.download_offer_files(&pla_links, &feeds_dir).await?;

        let destination = combined_source_path(&self.config, merchant_id);
        let combined = tokio::task::spawn_blocking(move || combine_pla_feeds(&pla_parts, &destination))
            .await
            .context("PLA combine task panicked")??;
        tracing::info!(merchant_id, parts = combined, "combined PLA parts");
        Ok(())
    }

    async fn upload(&self, path: &Path) -> anyhow::Result<()> {
        let Some(store) = &self.store else {
            tracing::warn!(path = %path.display(), "no upload target configured; feed left in place");
            return Ok(());
        };
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("feed path {} has no file name", path.display()))?;
        let location = store.put(key, path).await?;
        tracing::info!(%location, "feed uploaded");
        Ok(())
    }

    async fn notify(&self, request: &RegenerateRequest) {
        let Some(webhook) = &self.webhook else { return };
        if let Err(e) = webhook
            .send_upload_hook(&request.merchant_name, &request.merchant_id)
            .await
        {
            tracing::warn!(merchant_id = %request.merchant_id, error = %e, "upload webhook failed");
        }
    }
}

async fn links_for(
    root: &Path,
    kind: FeedKind,
    merchant_id: &str,
) -> anyhow::Result<Vec<feedgen_connexity::OfferLink>> {
    let index_path: PathBuf = root.join(kind.index_file_name());
    let content = tokio::fs::read_to_string(&index_path)
        .await
        .with_context(|| format!("failed to read {}", index_path.display()))?;
    Ok(offer_links_from_index(&content, kind, merchant_id)?)
}

#[async_trait]
impl RegenerateRunner for Pipeline {
    async fn run(&self, request: &RegenerateRequest) -> anyhow::Result<()> {
        self.regenerate_feed(request).await
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
