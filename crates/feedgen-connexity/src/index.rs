//! Offer part discovery from the downloaded index files.

use regex::Regex;

use crate::error::ConnexityError;

/// The two offer exports published per merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Offer JSON partitions carrying bid and redirect data.
    Default,
    /// Tab-delimited product listing partitions.
    Pla,
}

impl FeedKind {
    /// Local file name of this kind's index.
    #[must_use]
    pub fn index_file_name(self) -> &'static str {
        match self {
            FeedKind::Default => "index.txt",
            FeedKind::Pla => "index_pla.txt",
        }
    }

    /// Extension given to downloaded parts.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            FeedKind::Default => "json",
            FeedKind::Pla => "csv",
        }
    }

    fn part_pattern(self, merchant_id: &str) -> Result<Regex, regex::Error> {
        let mid = regex::escape(merchant_id);
        let stem = match self {
            FeedKind::Default => format!(r"{mid}_part\d{{3}}"),
            FeedKind::Pla => format!(r"{mid}_pla_part\d{{3}}"),
        };
        Regex::new(&format!(r"/({stem})\.(?:json|csv)\.gz$"))
    }
}

/// One downloadable part listed in an index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferLink {
    /// Part stem, e.g. `24_part003`; the saved file is `<name>.<ext>`.
    pub name: String,
    pub url: String,
    pub merchant_id: String,
    pub kind: FeedKind,
}

impl OfferLink {
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.kind.extension())
    }
}

/// Extracts the parts belonging to `merchant_id` from index `content`, in
/// index order.
///
/// # Errors
///
/// Returns [`ConnexityError::Pattern`] if the part pattern cannot be built.
pub fn offer_links_from_index(
    content: &str,
    kind: FeedKind,
    merchant_id: &str,
) -> Result<Vec<OfferLink>, ConnexityError> {
    let pattern = kind.part_pattern(merchant_id)?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            let caps = pattern.captures(line)?;
            Some(OfferLink {
                name: caps[1].to_string(),
                url: line.to_string(),
                merchant_id: merchant_id.to_string(),
                kind,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = "\
http://exports.example/feeds/mid/24_part000.json.gz
http://exports.example/feeds/mid/24_part001.json.gz\r
http://exports.example/feeds/mid/124_part000.json.gz
http://exports.example/feeds/mid/24_pla_part000.csv.gz
http://exports.example/feeds/mid/24_part002.json

http://exports.example/feeds/mid/24_pla_part001.csv.gz
";

    #[test]
    fn default_links_match_exact_merchant() {
        let links = offer_links_from_index(INDEX, FeedKind::Default, "24").unwrap();
        let names: Vec<_> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["24_part000", "24_part001"]);
        assert_eq!(
            links[1].url,
            "http://exports.example/feeds/mid/24_part001.json.gz"
        );
        assert_eq!(links[0].file_name(), "24_part000.json");
        assert_eq!(links[0].merchant_id, "24");
    }

    #[test]
    fn pla_links_use_pla_stem() {
        let links = offer_links_from_index(INDEX, FeedKind::Pla, "24").unwrap();
        let names: Vec<_> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["24_pla_part000", "24_pla_part001"]);
        assert_eq!(links[0].file_name(), "24_pla_part000.csv");
        assert_eq!(links[0].kind, FeedKind::Pla);
    }

    #[test]
    fn unknown_merchant_yields_no_links() {
        let links = offer_links_from_index(INDEX, FeedKind::Default, "999").unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn index_file_names() {
        assert_eq!(FeedKind::Default.index_file_name(), "index.txt");
        assert_eq!(FeedKind::Pla.index_file_name(), "index_pla.txt");
    }
}
