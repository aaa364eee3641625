//! Mapping from a raw offer plus its enrichment record to a [`FeedRow`].
//!
//! Mapping is total: missing source values become empty strings and nothing
//! here can fail.

use feedgen_core::{EnrichedOfferData, FeedRow, MerchantInfo, RawOfferRecord};

use crate::cpc_range::cpc_range;
use crate::placements::PlacementResolver;

/// Query parameter Connexity appends to redirect URLs; stripped from `ads_redirect`.
const PLACEMENT_PARAM: &str = "&af_placement_id=1";

/// Per-merchant inputs shared by every row of one feed.
#[derive(Debug, Clone, Copy)]
pub struct MappingContext<'a> {
    pub merchant: &'a MerchantInfo,
    pub resolver: &'a PlacementResolver,
    /// Product link prefix, without a trailing slash.
    pub link_base: &'a str,
}

/// Builds the output row for one offer and placement.
///
/// `offer_id` is the ID written to the `id` column (already suffixed with the
/// placement index by the caller). `enriched` carries the placement-adjusted
/// CPC, which drives `custom_label_1`. An empty `placement_id` is valid and
/// yields an empty `custom_label_3` unless a label matches it.
#[must_use]
pub fn map_attributes(
    ctx: &MappingContext<'_>,
    offer: &RawOfferRecord,
    offer_id: &str,
    enriched: &EnrichedOfferData,
    placement_id: &str,
) -> FeedRow {
    let merchant = ctx.merchant;
    let gender = normalize_gender(offer.gender.as_deref());

    FeedRow {
        id: offer_id.to_string(),
        title: strip_quotes(offer.title.as_deref()),
        description: strip_quotes(offer.description.as_deref()),
        link: format!(
            "{}/{}/{}",
            ctx.link_base, merchant.id, enriched.merchant_product_id
        ),
        image_link: copy(offer.image_link.as_deref()),
        price: copy(offer.price.as_deref()),
        sale_price: copy(offer.sale_price.as_deref()),
        product_category: copy(offer.google_product_category.as_deref()),
        gender: gender.to_string(),
        age_group: copy(offer.age_group.as_deref()),
        color: copy(offer.color.as_deref()),
        size: copy(offer.size.as_deref()),
        brand: copy(offer.brand.as_deref()),
        gtin: copy(offer.gtin.as_deref()),
        mpn: copy(offer.mpn.as_deref()),
        shipping: shipping_to_usd(enriched.shipping),
        identifier_exists: identifier_exists(offer).to_string(),
        seller_name: merchant.name.clone(),
        ads_redirect: strip_placement_param(&enriched.url),
        custom_label_0: merchant.name.clone(),
        custom_label_1: cpc_range(enriched.estimated_cpc).to_string(),
        custom_label_2: gender.to_string(),
        custom_label_3: ctx.resolver.custom_label_3(&merchant.id, placement_id),
    }
}

/// Collapses raw gender values to the feed vocabulary. Matching is
/// case-sensitive; anything unrecognised, including a missing value, is
/// `unknown`. `kids` is an output value only and maps to `unknown` itself.
#[must_use]
pub fn normalize_gender(raw: Option<&str>) -> &'static str {
    match raw {
        Some("boys" | "girls") => "kids",
        Some("male") => "male",
        Some("female") => "female",
        Some("unisex") => "unisex",
        _ => "unknown",
    }
}

/// Formats shipping cents as `"<dollars> USD"` using the shortest decimal
/// rendering. Zero and absent amounts are both empty.
#[must_use]
pub fn shipping_to_usd(cents: Option<i64>) -> String {
    match cents {
        None | Some(0) => String::new(),
        Some(cents) => {
            #[allow(clippy::cast_precision_loss)]
            let dollars = cents as f64 / 100.0;
            format!("{dollars} USD")
        }
    }
}

/// `"TRUE"` when the offer carries a brand together with a GTIN or an MPN.
#[must_use]
pub fn identifier_exists(offer: &RawOfferRecord) -> &'static str {
    let brand = present(offer.brand.as_deref());
    if brand && (present(offer.gtin.as_deref()) || present(offer.mpn.as_deref())) {
        "TRUE"
    } else {
        "FALSE"
    }
}

#[must_use]
pub fn strip_placement_param(url: &str) -> String {
    url.replace(PLACEMENT_PARAM, "")
}

fn strip_quotes(text: Option<&str>) -> String {
    text.map(|t| t.replace('"', "")).unwrap_or_default()
}

fn copy(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "attributes_test.rs"]
mod tests;
