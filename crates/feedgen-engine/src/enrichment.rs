//! Loader for per-merchant offer partition files (`<mid>_partNNN.json`).
//!
//! Partitions are parsed concurrently on the blocking pool and merged in
//! file-name order once every task has finished.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use feedgen_core::EnrichedOfferData;
use regex::Regex;
use serde::Deserialize;
use tokio::task::JoinSet;

use crate::error::FeedError;
use crate::sources::Scalar;

#[derive(Debug, Deserialize)]
struct PartitionFile {
    #[serde(default)]
    offers: OfferList,
}

#[derive(Debug, Default, Deserialize)]
struct OfferList {
    #[serde(default)]
    offer: Vec<RawOffer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOffer {
    #[serde(default)]
    id: Option<Scalar>,
    #[serde(default)]
    merchant_product_id: Option<Scalar>,
    #[serde(rename = "estimatedCPC", default)]
    estimated_cpc: Option<Integral>,
    #[serde(default)]
    url: Option<UrlValue>,
    #[serde(default)]
    ship_type: Option<String>,
    #[serde(default)]
    ship_amount: Option<Integral>,
    #[serde(default)]
    ecpc_multiplier_key: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct Integral {
    integral: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct UrlValue {
    #[serde(default)]
    value: Option<String>,
}

impl RawOffer {
    /// `None` when the offer lacks an ID or a usable CPC.
    fn into_enriched(self) -> Option<EnrichedOfferData> {
        let id = self.id?;
        let estimated_cpc = self
            .estimated_cpc
            .as_ref()
            .and_then(|c| c.integral.as_ref())
            .and_then(Scalar::as_f64)?;

        let known_ship_type = self
            .ship_type
            .as_deref()
            .is_some_and(|t| !t.is_empty() && !t.eq_ignore_ascii_case("unknown"));
        let shipping = if known_ship_type {
            self.ship_amount
                .as_ref()
                .and_then(|a| a.integral.as_ref())
                .and_then(Scalar::as_i64)
        } else {
            None
        };

        Some(EnrichedOfferData {
            id: id.into_string(),
            merchant_product_id: self
                .merchant_product_id
                .map(Scalar::into_string)
                .unwrap_or_default(),
            estimated_cpc,
            url: self.url.and_then(|u| u.value).unwrap_or_default(),
            shipping,
            ecpc_multiplier_key: self.ecpc_multiplier_key.map(Scalar::into_string),
        })
    }
}

/// Parses one partition document (`offers.offer[]`).
///
/// Offers without an ID or an estimated CPC are dropped; the latter surface
/// later as rejected IDs.
///
/// # Errors
///
/// Returns [`FeedError::Deserialize`] if the document is not valid JSON of
/// the expected shape.
pub fn parse_offer_partition<R: Read>(
    reader: R,
    context: &str,
) -> Result<Vec<EnrichedOfferData>, FeedError> {
    let parsed: PartitionFile =
        serde_json::from_reader(reader).map_err(|source| FeedError::Deserialize {
            context: context.to_string(),
            source,
        })?;

    let total = parsed.offers.offer.len();
    let offers: Vec<_> = parsed
        .offers
        .offer
        .into_iter()
        .filter_map(RawOffer::into_enriched)
        .collect();

    if offers.len() < total {
        tracing::warn!(
            partition = context,
            dropped = total - offers.len(),
            "offers without an ID or estimated CPC dropped"
        );
    }
    Ok(offers)
}

fn parse_partition_file(path: &Path) -> Result<Vec<EnrichedOfferData>, FeedError> {
    let file = File::open(path).map_err(|e| FeedError::io(path, e))?;
    parse_offer_partition(BufReader::new(file), &path.display().to_string())
}

/// Lists partition files for `merchant_id` in `dir`, sorted by name.
///
/// # Errors
///
/// Returns [`FeedError::Io`] if the directory cannot be read.
pub async fn partition_files(dir: &Path, merchant_id: &str) -> Result<Vec<PathBuf>, FeedError> {
    let pattern = Regex::new(&format!(r"^{}_part\d{{3}}\.json$", regex::escape(merchant_id)))?;

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| FeedError::io(dir, e))?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| FeedError::io(dir, e))? {
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| pattern.is_match(n)) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Loads every partition for `merchant_id` and indexes offers by ID.
///
/// When an ID appears in more than one partition the later file wins.
///
/// # Errors
///
/// Fails on the first partition that cannot be read or parsed; outstanding
/// tasks are aborted.
pub async fn load_enrichment(
    dir: &Path,
    merchant_id: &str,
) -> Result<HashMap<String, EnrichedOfferData>, FeedError> {
    let files = partition_files(dir, merchant_id).await?;
    if files.is_empty() {
        tracing::warn!(merchant_id, dir = %dir.display(), "no offer partitions found");
        return Ok(HashMap::new());
    }

    let mut tasks = JoinSet::new();
    for (index, path) in files.iter().cloned().enumerate() {
        tasks.spawn_blocking(move || (index, parse_partition_file(&path)));
    }

    let mut partitions: Vec<Option<Vec<EnrichedOfferData>>> = vec![None; files.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(offers))) => partitions[index] = Some(offers),
            Ok((_, Err(e))) => {
                tasks.abort_all();
                return Err(e);
            }
            Err(e) => {
                tasks.abort_all();
                return Err(e.into());
            }
        }
    }

    let mut merged = HashMap::new();
    for offer in partitions.into_iter().flatten().flatten() {
        merged.insert(offer.id.clone(), offer);
    }

    tracing::info!(
        merchant_id,
        partitions = files.len(),
        offers = merged.len(),
        "loaded offer enrichment"
    );
    Ok(merged)
}
