//! End-to-end feed assembly over on-disk fixtures.

use std::collections::HashMap;
use std::fs;

use feedgen_core::{parse_placements, EnrichedOfferData, MerchantInfo, MultiplierRow};
use feedgen_engine::{
    assemble_feed, create_feed_file, load_enrichment, FeedContext, FeedError, MappingContext,
    MultiplierIndex, PlacementResolver,
};

const LINK_BASE: &str = "https://onlinebazaar4u.com/product";

const PLACEMENTS_YAML: &str = r#"
placements:
  "24": ["P1", "P2", "P3"]
replacements:
  "190411":
    - check: "P1"
      replace_with: "R1"
label_groups:
  - name: Female_Desktop
    placement_ids: ["P2"]
"#;

fn merchant(id: &str) -> MerchantInfo {
    MerchantInfo {
        id: id.to_string(),
        name: "Shoe Barn".to_string(),
    }
}

fn enriched(id: &str, cpc: f64, key: Option<&str>) -> EnrichedOfferData {
    EnrichedOfferData {
        id: id.to_string(),
        merchant_product_id: format!("mp-{id}"),
        estimated_cpc: cpc,
        url: format!("https://r.example/{id}?a=1&af_placement_id=1"),
        shipping: Some(200),
        ecpc_multiplier_key: key.map(str::to_string),
    }
}

fn row(placement: &str, key: &str, multiplier: f64) -> MultiplierRow {
    MultiplierRow {
        placement_id: placement.to_string(),
        ecpc_multiplier_key: key.to_string(),
        ecpc_multiplier: multiplier,
    }
}

const SOURCE: &str = "id\ttitle\tbrand\tgtin\tgender\tprice\n\
                      A\tRunner \"X\"\tAcme\t0001\tmale\t50.00 USD\n\
                      B\tOrphan\t\t\tfemale\t10.00 USD\n\
                      C\tSandal\tAcme\t\tboys\t20.00 USD\n";

fn lines(output: &[u8]) -> Vec<Vec<String>> {
    String::from_utf8(output.to_vec())
        .unwrap()
        .lines()
        .map(|l| l.split('\t').map(str::to_string).collect())
        .collect()
}

#[test]
fn expands_each_offer_per_placement_in_order() {
    let resolver = PlacementResolver::new(parse_placements(PLACEMENTS_YAML).unwrap());
    let merchant = merchant("24");
    let placements = resolver.resolve_placements("24").to_vec();
    // P1 has an exact row for k1; P2 has a row for another key; P3 has none.
    let rows = vec![row("P1", "k1", 0.5), row("P2", "k9", 2.0), row("P2", "k1x", 3.0)];
    let multipliers = MultiplierIndex::for_merchant(&rows, &placements);
    let enrichment: HashMap<_, _> = [
        ("A".to_string(), enriched("A", 40.0, Some("k1"))),
        ("C".to_string(), enriched("C", 10.0, None)),
    ]
    .into_iter()
    .collect();

    let ctx = FeedContext {
        mapping: MappingContext {
            merchant: &merchant,
            resolver: &resolver,
            link_base: LINK_BASE,
        },
        placements: &placements,
        multipliers: &multipliers,
        enrichment: &enrichment,
    };

    let mut out = Vec::new();
    let report = assemble_feed(&ctx, SOURCE.as_bytes(), &mut out).unwrap();

    assert_eq!(report.offers_read, 3);
    assert_eq!(report.rows_written, 6);
    assert_eq!(report.rejected_ids, vec!["B".to_string()]);
    assert_eq!(report.adjustments.exact, 1);
    assert_eq!(report.adjustments.placement, 3);
    assert_eq!(report.adjustments.merchant_average, 2);
    assert_eq!(report.adjustments.fallback, 0);

    let lines = lines(&out);
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0][0], "id");
    assert!(lines.iter().all(|l| l.len() == 23));

    let ids: Vec<_> = lines[1..].iter().map(|l| l[0].as_str()).collect();
    assert_eq!(ids, vec!["A0", "A1", "A2", "C0", "C1", "C2"]);

    // A: base 40. P1 exact 0.5 -> 20; P2 first row 2.0 -> 80; P3 average (0.5+2+3)/3 -> 73.3
    assert_eq!(lines[1][20], "$0.101 - $0.20");
    assert_eq!(lines[2][20], "$0.701 - $0.80");
    assert_eq!(lines[3][20], "$0.701 - $0.80");
    // custom_label_3: raw id, label group, raw id
    assert_eq!(lines[1][22], "P1");
    assert_eq!(lines[2][22], "Female_Desktop");
    assert_eq!(lines[3][22], "P3");

    // Mapped attributes for A
    assert_eq!(lines[1][1], "Runner X");
    assert_eq!(lines[1][3], "https://onlinebazaar4u.com/product/24/mp-A");
    assert_eq!(lines[1][8], "male");
    assert_eq!(lines[1][15], "2 USD");
    assert_eq!(lines[1][16], "TRUE");
    assert_eq!(lines[1][18], "https://r.example/A?a=1");

    // C has no multiplier key: P1 falls to placement rung (0.5) -> 5
    assert_eq!(lines[4][20], "$0.01 - $0.05");
    assert_eq!(lines[4][8], "kids");
    assert_eq!(lines[4][16], "FALSE");
}

#[test]
fn merchant_without_placements_gets_one_unadjusted_row() {
    let resolver = PlacementResolver::new(parse_placements(PLACEMENTS_YAML).unwrap());
    let merchant = merchant("999");
    let multipliers = MultiplierIndex::for_merchant(&[], &[]);
    let enrichment: HashMap<_, _> = [("A".to_string(), enriched("A", 40.0, Some("k1")))]
        .into_iter()
        .collect();
    let ctx = FeedContext {
        mapping: MappingContext {
            merchant: &merchant,
            resolver: &resolver,
            link_base: LINK_BASE,
        },
        placements: resolver.resolve_placements("999"),
        multipliers: &multipliers,
        enrichment: &enrichment,
    };

    let mut out = Vec::new();
    let report = assemble_feed(&ctx, SOURCE.as_bytes(), &mut out).unwrap();

    assert_eq!(report.rows_written, 1);
    assert_eq!(report.rejected_ids, vec!["B".to_string(), "C".to_string()]);
    let lines = lines(&out);
    assert_eq!(lines[1][0], "A");
    assert_eq!(lines[1][20], "$0.301 - $0.40");
    assert_eq!(lines[1][22], "");
}

#[test]
fn merchant_with_no_multiplier_rows_uses_fallback() {
    let resolver = PlacementResolver::new(parse_placements(PLACEMENTS_YAML).unwrap());
    let merchant = merchant("24");
    let placements = resolver.resolve_placements("24").to_vec();
    let multipliers = MultiplierIndex::for_merchant(&[row("Z", "k1", 9.0)], &placements);
    let enrichment: HashMap<_, _> = [("A".to_string(), enriched("A", 40.0, Some("k1")))]
        .into_iter()
        .collect();
    let ctx = FeedContext {
        mapping: MappingContext {
            merchant: &merchant,
            resolver: &resolver,
            link_base: LINK_BASE,
        },
        placements: &placements,
        multipliers: &multipliers,
        enrichment: &enrichment,
    };

    let mut out = Vec::new();
    let report = assemble_feed(&ctx, SOURCE.as_bytes(), &mut out).unwrap();

    assert_eq!(report.adjustments.fallback, 3);
    let lines = lines(&out);
    for line in &lines[1..] {
        // 40 * 0.5 = 20
        assert_eq!(line[20], "$0.101 - $0.20");
    }
}

#[test]
fn empty_source_writes_header_only() {
    let resolver = PlacementResolver::default();
    let merchant = merchant("24");
    let multipliers = MultiplierIndex::default();
    let enrichment = HashMap::new();
    let ctx = FeedContext {
        mapping: MappingContext {
            merchant: &merchant,
            resolver: &resolver,
            link_base: LINK_BASE,
        },
        placements: &[],
        multipliers: &multipliers,
        enrichment: &enrichment,
    };

    let mut out = Vec::new();
    let report = assemble_feed(&ctx, "id\ttitle\n".as_bytes(), &mut out).unwrap();
    assert_eq!(report.rows_written, 0);
    assert_eq!(lines(&out).len(), 1);
}

#[tokio::test]
async fn create_feed_file_from_partitions_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let feeds = dir.path().join("feeds");
    fs::create_dir_all(&feeds).unwrap();

    fs::write(
        feeds.join("24_part000.json"),
        r#"{"offers":{"offer":[
            {"id": "A", "merchantProductId": "mp-A", "estimatedCPC": {"integral": 40},
             "url": {"value": "https://r.example/A&af_placement_id=1"},
             "shipType": "FLAT", "shipAmount": {"integral": 250}, "ecpcMultiplierKey": "k1"}
        ]}}"#,
    )
    .unwrap();
    // Belongs to merchant 124 and must not leak into merchant 24.
    fs::write(
        feeds.join("124_part000.json"),
        r#"{"offers":{"offer":[
            {"id": "B", "merchantProductId": "mp-B", "estimatedCPC": {"integral": 1},
             "url": {"value": "u"}}
        ]}}"#,
    )
    .unwrap();
    let source = feeds.join("combined_24.csv");
    fs::write(&source, SOURCE).unwrap();

    let enrichment = load_enrichment(&feeds, "24").await.unwrap();
    assert_eq!(enrichment.len(), 1);

    let resolver = PlacementResolver::new(parse_placements(PLACEMENTS_YAML).unwrap());
    let merchant = merchant("24");
    let placements = resolver.resolve_placements("24").to_vec();
    let multipliers = MultiplierIndex::for_merchant(&[row("P1", "k1", 1.0)], &placements);
    let ctx = FeedContext {
        mapping: MappingContext {
            merchant: &merchant,
            resolver: &resolver,
            link_base: LINK_BASE,
        },
        placements: &placements,
        multipliers: &multipliers,
        enrichment: &enrichment,
    };

    let destination = feeds.join("Shoe Barn.txt");
    let rejects = dir.path().join("rejected-product-ids-24.txt");
    fs::write(&rejects, "OLD\n").unwrap();

    let report = create_feed_file(&ctx, &source, &destination, &rejects).unwrap();

    assert_eq!(report.rows_written, 3);
    assert!(destination.exists());
    assert!(!feeds.join("Shoe Barn.txt.partial").exists());
    let written = fs::read_to_string(&destination).unwrap();
    assert_eq!(written.lines().count(), 4);
    assert!(written.contains("\t2.5 USD\t"));
    assert_eq!(fs::read_to_string(&rejects).unwrap(), "OLD\nB\nC\n");
}

#[test]
fn create_feed_file_missing_source_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = PlacementResolver::default();
    let merchant = merchant("24");
    let multipliers = MultiplierIndex::default();
    let enrichment = HashMap::new();
    let ctx = FeedContext {
        mapping: MappingContext {
            merchant: &merchant,
            resolver: &resolver,
            link_base: LINK_BASE,
        },
        placements: &[],
        multipliers: &multipliers,
        enrichment: &enrichment,
    };

    let destination = dir.path().join("out.txt");
    let err = create_feed_file(
        &ctx,
        &dir.path().join("missing.csv"),
        &destination,
        &dir.path().join("rejects.txt"),
    )
    .unwrap_err();

    assert!(matches!(err, FeedError::Io { .. }));
    assert!(!destination.exists());
}

#[test]
fn create_feed_file_keeps_previous_feed_on_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = PlacementResolver::default();
    let merchant = merchant("24");
    let multipliers = MultiplierIndex::default();
    let enrichment: HashMap<_, _> = [("A".to_string(), enriched("A", 40.0, None))]
        .into_iter()
        .collect();
    let ctx = FeedContext {
        mapping: MappingContext {
            merchant: &merchant,
            resolver: &resolver,
            link_base: LINK_BASE,
        },
        placements: &[],
        multipliers: &multipliers,
        enrichment: &enrichment,
    };

    let source = dir.path().join("combined_24.csv");
    // Invalid UTF-8 in a deserialized field is a source read failure.
    fs::write(&source, b"id\ttitle\nA\t\xff\xfe\n").unwrap();
    let destination = dir.path().join("out.txt");
    fs::write(&destination, "previous feed\n").unwrap();

    let err = create_feed_file(&ctx, &source, &destination, &dir.path().join("r.txt"))
        .unwrap_err();

    assert!(matches!(err, FeedError::SourceRead { .. }));
    assert_eq!(fs::read_to_string(&destination).unwrap(), "previous feed\n");
    assert!(!dir.path().join("out.txt.partial").exists());
}
