//! Builds one merchant's feed from the files already on disk under the
//! configured root path.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use feedgen_core::{AppConfig, MerchantInfo};
use feedgen_engine::{
    append_lines, create_feed_file, load_enrichment, load_merchants, load_multiplier_rows,
    AssembleReport, FeedContext, MappingContext, MultiplierIndex, PlacementResolver,
};

const MERCHANTS_FILE: &str = feedgen_connexity::MERCHANTS_FILE;
const MULTIPLIER_FILE: &str = feedgen_connexity::MULTIPLIER_FILE;
const REJECTED_MERCHANTS_FILE: &str = "rejected_merchants.txt";

/// Source and destination overrides for a feed build. `None` selects the
/// standard locations under `<root>/feeds`.
#[derive(Debug, Clone, Default)]
pub(crate) struct FeedPaths {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
}

#[derive(Debug)]
pub(crate) struct BuiltFeed {
    pub merchant: MerchantInfo,
    pub path: PathBuf,
    pub report: AssembleReport,
}

/// `<root>/feeds/combined_<mid>.csv`
pub(crate) fn combined_source_path(config: &AppConfig, merchant_id: &str) -> PathBuf {
    config
        .feeds_path()
        .join(format!("combined_{merchant_id}.csv"))
}

/// `<merchant name>.txt`, with path separators replaced so the file always
/// lands directly in the feeds directory. A blank name falls back to the ID.
fn feed_file_name(merchant: &MerchantInfo) -> String {
    let name = merchant.name.trim();
    let stem = if name.is_empty() { merchant.id.as_str() } else { name };
    let safe: String = stem
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    format!("{safe}.txt")
}

/// Assembles the feed for `merchant_id`.
///
/// A merchant missing from the merchants export is appended to
/// `<root>/logs/rejected_merchants.txt` and reported as an error.
pub(crate) async fn build_merchant_feed(
    config: &AppConfig,
    resolver: Arc<PlacementResolver>,
    merchant_id: &str,
    paths: FeedPaths,
) -> anyhow::Result<BuiltFeed> {
    let root = config.root_path.clone();
    let feeds_dir = config.feeds_path();

    let merchants = load_merchants(&root.join(MERCHANTS_FILE))?;
    let Some(merchant) = merchants.get(merchant_id).cloned() else {
        let log = config.logs_path().join(REJECTED_MERCHANTS_FILE);
        if let Err(e) = append_lines(&log, &[merchant_id]) {
            tracing::warn!(merchant_id, error = %e, "failed to record rejected merchant");
        }
        anyhow::bail!("merchant {merchant_id} is not in the merchants export");
    };

    let rows = load_multiplier_rows(&root.join(MULTIPLIER_FILE))?;
    let enrichment = load_enrichment(&feeds_dir, merchant_id).await?;

    let source = paths
        .source
        .unwrap_or_else(|| combined_source_path(config, merchant_id));
    let destination = paths
        .destination
        .unwrap_or_else(|| feeds_dir.join(feed_file_name(&merchant)));
    let rejects = root.join(format!("rejected-product-ids-{merchant_id}.txt"));
    let link_base = config.product_link_base.clone();

    let task_merchant = merchant.clone();
    let task_destination = destination.clone();
    let report = tokio::task::spawn_blocking(move || {
        let placements = resolver.resolve_placements(&task_merchant.id).to_vec();
        let multipliers = MultiplierIndex::for_merchant(&rows, &placements);
        let ctx = FeedContext {
            mapping: MappingContext {
                merchant: &task_merchant,
                resolver: &resolver,
                link_base: &link_base,
            },
            placements: &placements,
            multipliers: &multipliers,
            enrichment: &enrichment,
        };
        create_feed_file(&ctx, &source, &task_destination, &rejects)
    })
    .await
    .context("feed assembly task panicked")??;

    Ok(BuiltFeed {
        merchant,
        path: destination,
        report,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use feedgen_core::{parse_placements, Environment};

    use super::*;

    fn config(root: &std::path::Path) -> AppConfig {
        AppConfig {
            env: Environment::Test,
            log_level: "info".to_string(),
            root_path: root.to_path_buf(),
            placements_path: PathBuf::from("./config/placements.yaml"),
            publisher_id: None,
            api_key: None,
            http_timeout_secs: 30,
            user_agent: "feedgen-test".to_string(),
            product_link_base: "https://shop.example/product".to_string(),
            webhook_url: None,
            upload_dir: None,
            upload_url: None,
            database_url: None,
            db_max_connections: 1,
            db_min_connections: 1,
            db_acquire_timeout_secs: 1,
        }
    }

    fn write_fixture(root: &std::path::Path) {
        let feeds = root.join("feeds");
        fs::create_dir_all(&feeds).unwrap();
        fs::write(
            root.join(MERCHANTS_FILE),
            r#"{"merchant":[{"mid":24,"merchantInfo":{"name":"Shoe Barn"}}]}"#,
        )
        .unwrap();
        fs::write(
            root.join(MULTIPLIER_FILE),
            "placementId\tecpcMultiplierKey\tecpcMultiplier\nP1\tk1\t2\n",
        )
        .unwrap();
        fs::write(
            feeds.join("24_part000.json"),
            r#"{"offers":{"offer":[{"id":"A","merchantProductId":"mp","estimatedCPC":{"integral":30},
                "url":{"value":"https://r.example/A"},"ecpcMultiplierKey":"k1"}]}}"#,
        )
        .unwrap();
        fs::write(
            feeds.join("combined_24.csv"),
            "id\ttitle\nA\tRunner\nZ\tNo data\n",
        )
        .unwrap();
    }

    fn resolver() -> Arc<PlacementResolver> {
        let file = parse_placements("placements:\n  \"24\": [\"P1\"]\n").unwrap();
        Arc::new(PlacementResolver::new(file))
    }

    #[tokio::test]
    async fn builds_feed_at_default_location() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let config = config(dir.path());

        let built = build_merchant_feed(&config, resolver(), "24", FeedPaths::default())
            .await
            .unwrap();

        assert_eq!(built.merchant.name, "Shoe Barn");
        assert_eq!(built.path, dir.path().join("feeds").join("Shoe Barn.txt"));
        assert_eq!(built.report.rows_written, 1);
        assert_eq!(built.report.rejected_ids, vec!["Z".to_string()]);

        let feed = fs::read_to_string(&built.path).unwrap();
        let row: Vec<_> = feed.lines().nth(1).unwrap().split('\t').collect();
        assert_eq!(row[0], "A0");
        assert_eq!(row[3], "https://shop.example/product/24/mp");
        // 30 * 2 = 60
        assert_eq!(row[20], "$0.501 - $0.60");
        assert_eq!(
            fs::read_to_string(dir.path().join("rejected-product-ids-24.txt")).unwrap(),
            "Z\n"
        );
    }

    #[test]
    fn feed_file_name_strips_path_separators() {
        let merchant = |name: &str| MerchantInfo {
            id: "24".to_string(),
            name: name.to_string(),
        };
        assert_eq!(feed_file_name(&merchant("Shoe Barn")), "Shoe Barn.txt");
        assert_eq!(feed_file_name(&merchant("../../etc/x")), ".._.._etc_x.txt");
        assert_eq!(feed_file_name(&merchant("A\\B/C")), "A_B_C.txt");
        assert_eq!(feed_file_name(&merchant("  ")), "24.txt");
    }

    #[tokio::test]
    async fn merchant_name_cannot_escape_feeds_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        fs::write(
            dir.path().join(MERCHANTS_FILE),
            r#"{"merchant":[{"mid":24,"merchantInfo":{"name":"../Shoe/Barn"}}]}"#,
        )
        .unwrap();
        let config = config(dir.path());

        let built = build_merchant_feed(&config, resolver(), "24", FeedPaths::default())
            .await
            .unwrap();

        assert_eq!(built.path, dir.path().join("feeds").join(".._Shoe_Barn.txt"));
        assert!(built.path.exists());
    }

    #[tokio::test]
    async fn unknown_merchant_is_logged_and_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let config = config(dir.path());

        let err = build_merchant_feed(&config, resolver(), "77", FeedPaths::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("77"));
        assert_eq!(
            fs::read_to_string(dir.path().join("logs").join(REJECTED_MERCHANTS_FILE)).unwrap(),
            "77\n"
        );
    }

    #[tokio::test]
    async fn honours_explicit_paths() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let config = config(dir.path());
        let source = dir.path().join("custom.tsv");
        fs::write(&source, "id\ttitle\nA\tRunner\n").unwrap();
        let destination = dir.path().join("out.txt");

        let built = build_merchant_feed(
            &config,
            resolver(),
            "24",
            FeedPaths {
                source: Some(source),
                destination: Some(destination.clone()),
            },
        )
        .await
        .unwrap();

        assert_eq!(built.path, destination);
        assert!(destination.exists());
        assert!(built.report.rejected_ids.is_empty());
    }
}
