use serde::{Deserialize, Serialize};

/// Output column names, in the order every feed row is written.
pub const FEED_ATTRIBUTES: [&str; 23] = [
    "id",
    "title",
    "description",
    "link",
    "image_link",
    "price",
    "sale_price",
    "product_category",
    "gender",
    "age_group",
    "color",
    "size",
    "brand",
    "gtin",
    "mpn",
    "shipping",
    "identifier_exists",
    "seller_name",
    "ads_redirect",
    "custom_label_0",
    "custom_label_1",
    "custom_label_2",
    "custom_label_3",
];

/// Merchant metadata from the Connexity `merchants.json` export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantInfo {
    pub id: String,
    /// Display name; used as seller name, label 0 and the feed file name.
    pub name: String,
}

/// One row of a merchant's combined PLA feed.
///
/// Empty cells decode as `None`; columns not listed here are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawOfferRecord {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_link: Option<String>,
    pub price: Option<String>,
    pub sale_price: Option<String>,
    pub google_product_category: Option<String>,
    pub gender: Option<String>,
    pub age_group: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub brand: Option<String>,
    pub gtin: Option<String>,
    pub mpn: Option<String>,
}

/// Bid and redirect metadata for one offer, keyed by the original offer ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedOfferData {
    pub id: String,
    pub merchant_product_id: String,
    /// Estimated cost-per-click in integral cents.
    pub estimated_cpc: f64,
    /// Connexity redirect URL.
    pub url: String,
    /// Shipping cost in integral cents; `None` when the shipping type is unknown.
    pub shipping: Option<i64>,
    pub ecpc_multiplier_key: Option<String>,
}

impl EnrichedOfferData {
    /// Returns a placement-specific copy carrying `estimated_cpc`.
    ///
    /// The receiver keeps the base CPC so every placement adjusts from the
    /// same starting value.
    #[must_use]
    pub fn with_estimated_cpc(&self, estimated_cpc: f64) -> Self {
        Self {
            estimated_cpc,
            ..self.clone()
        }
    }
}

/// A row of the eCPC multiplier table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierRow {
    pub placement_id: String,
    pub ecpc_multiplier_key: String,
    pub ecpc_multiplier: f64,
}

/// A fully mapped output row. Field order matches [`FEED_ATTRIBUTES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub image_link: String,
    pub price: String,
    pub sale_price: String,
    pub product_category: String,
    pub gender: String,
    pub age_group: String,
    pub color: String,
    pub size: String,
    pub brand: String,
    pub gtin: String,
    pub mpn: String,
    pub shipping: String,
    pub identifier_exists: String,
    pub seller_name: String,
    pub ads_redirect: String,
    pub custom_label_0: String,
    pub custom_label_1: String,
    pub custom_label_2: String,
    pub custom_label_3: String,
}

impl FeedRow {
    /// Column values in [`FEED_ATTRIBUTES`] order.
    #[must_use]
    pub fn values(&self) -> [&str; 23] {
        [
            self.id.as_str(),
            self.title.as_str(),
            self.description.as_str(),
            self.link.as_str(),
            self.image_link.as_str(),
            self.price.as_str(),
            self.sale_price.as_str(),
            self.product_category.as_str(),
            self.gender.as_str(),
            self.age_group.as_str(),
            self.color.as_str(),
            self.size.as_str(),
            self.brand.as_str(),
            self.gtin.as_str(),
            self.mpn.as_str(),
            self.shipping.as_str(),
            self.identifier_exists.as_str(),
            self.seller_name.as_str(),
            self.ads_redirect.as_str(),
            self.custom_label_0.as_str(),
            self.custom_label_1.as_str(),
            self.custom_label_2.as_str(),
            self.custom_label_3.as_str(),
        ]
    }

    /// Tab-joined, newline-terminated line.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = self.values().join("\t");
        line.push('\n');
        line
    }

    /// Header line for a feed file.
    #[must_use]
    pub fn header_line() -> String {
        let mut line = FEED_ATTRIBUTES.join("\t");
        line.push('\n');
        line
    }
}

/// Lifecycle of one regeneration request as recorded in the history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegenerateStatus {
    Pending,
    Regenerating,
    Uploading,
    Done,
    Failed,
}

impl RegenerateStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RegenerateStatus::Pending => "pending",
            RegenerateStatus::Regenerating => "regenerating",
            RegenerateStatus::Uploading => "uploading",
            RegenerateStatus::Done => "done",
            RegenerateStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RegenerateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
