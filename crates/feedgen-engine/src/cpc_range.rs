//! Price-range buckets reported in `custom_label_1`.

const BELOW_ONE_CENT: &str = "< $0.01";

/// Lower bound (whole cents, inclusive) of each bucket, ascending. A value
/// belongs to the last bucket whose floor it reaches.
const CPC_BUCKETS: [(f64, &str); 13] = [
    (1.0, "$0.01 - $0.05"),
    (6.0, "$0.051 - $0.10"),
    (11.0, "$0.101 - $0.20"),
    (21.0, "$0.201 - $0.30"),
    (31.0, "$0.301 - $0.40"),
    (41.0, "$0.401 - $0.50"),
    (51.0, "$0.501 - $0.60"),
    (61.0, "$0.601 - $0.70"),
    (71.0, "$0.701 - $0.80"),
    (81.0, "$0.801 - $0.90"),
    (91.0, "$0.901 - $1.00"),
    (101.0, "$1.01 - $1.10"),
    (111.0, "$1.101"),
];

/// Maps an estimated CPC in cents to its label bucket.
///
/// Fractional cents are truncated toward zero before the lookup, so `5.9`
/// lands in the `1..=5` bucket. Non-finite input yields an empty label.
#[must_use]
pub fn cpc_range(value: f64) -> &'static str {
    if !value.is_finite() {
        return "";
    }
    let cents = value.trunc();
    CPC_BUCKETS
        .iter()
        .rev()
        .find(|(floor, _)| cents >= *floor)
        .map_or(BELOW_ONE_CENT, |&(_, label)| label)
}
