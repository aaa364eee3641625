//! Lookups over the static placement taxonomy.

use std::collections::HashMap;

use feedgen_core::{PlacementsFile, ReplacementRule};

/// Read-only view of [`PlacementsFile`] indexed for per-offer lookups.
#[derive(Debug, Clone, Default)]
pub struct PlacementResolver {
    placements: HashMap<String, Vec<String>>,
    replacements: HashMap<String, Vec<ReplacementRule>>,
    /// placement id -> label group name
    label_groups: HashMap<String, String>,
}

impl PlacementResolver {
    #[must_use]
    pub fn new(file: PlacementsFile) -> Self {
        let label_groups = file
            .label_groups
            .into_iter()
            .flat_map(|group| {
                let name = group.name;
                group
                    .placement_ids
                    .into_iter()
                    .map(move |id| (id, name.clone()))
            })
            .collect();

        Self {
            placements: file.placements,
            replacements: file.replacements,
            label_groups,
        }
    }

    /// Ordered placement IDs for a merchant. Merchants without an entry get
    /// an empty slice.
    #[must_use]
    pub fn resolve_placements(&self, merchant_id: &str) -> &[String] {
        self.placements
            .get(merchant_id)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Returns `true` when the merchant has a replacement entry, even an empty one.
    #[must_use]
    pub fn has_replacements(&self, merchant_id: &str) -> bool {
        self.replacements.contains_key(merchant_id)
    }

    /// Replacement for `placement_id` under the merchant's rules, or the
    /// input unchanged.
    #[must_use]
    pub fn resolve_replacement<'a>(&'a self, merchant_id: &str, placement_id: &'a str) -> &'a str {
        self.replacements
            .get(merchant_id)
            .and_then(|rules| rules.iter().find(|rule| rule.check == placement_id))
            .map_or(placement_id, |rule| rule.replace_with.as_str())
    }

    #[must_use]
    pub fn label_group(&self, placement_id: &str) -> Option<&str> {
        self.label_groups.get(placement_id).map(String::as_str)
    }

    /// Value of `custom_label_3` for a merchant/placement pair.
    ///
    /// Merchants with replacement rules only ever see the replacement or the
    /// raw ID; label groups apply to the remaining merchants.
    #[must_use]
    pub fn custom_label_3(&self, merchant_id: &str, placement_id: &str) -> String {
        if self.has_replacements(merchant_id) {
            return self
                .resolve_replacement(merchant_id, placement_id)
                .to_string();
        }
        self.label_group(placement_id)
            .unwrap_or(placement_id)
            .to_string()
    }
}
