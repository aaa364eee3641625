//! eCPC multiplier resolution.
//!
//! [`MultiplierIndex`] is built once per merchant per run. Each lookup walks
//! the ladder exact match → placement match → merchant average → fixed
//! fallback.

use std::collections::HashMap;

use feedgen_core::MultiplierRow;

/// Multiplier used when the table has no rows for any of the merchant's placements.
pub const FALLBACK_MULTIPLIER: f64 = 0.5;

/// Which rung of the ladder produced a multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiplierSource {
    /// Placement and multiplier key both matched.
    Exact,
    /// Placement matched; first row for it in table order.
    Placement,
    /// Mean of all rows for the merchant's placements.
    MerchantAverage,
    /// [`FALLBACK_MULTIPLIER`].
    Fallback,
}

#[derive(Debug, Clone, Default)]
pub struct MultiplierIndex {
    /// Rows per placement, in table order.
    by_placement: HashMap<String, Vec<MultiplierRow>>,
    merchant_average: Option<f64>,
}

impl MultiplierIndex {
    /// Indexes the rows that belong to `placements`.
    #[must_use]
    pub fn for_merchant(rows: &[MultiplierRow], placements: &[String]) -> Self {
        let mut by_placement: HashMap<String, Vec<MultiplierRow>> = HashMap::new();
        let mut sum = 0.0;
        let mut count = 0u32;

        for row in rows.iter().filter(|r| placements.contains(&r.placement_id)) {
            sum += row.ecpc_multiplier;
            count += 1;
            by_placement
                .entry(row.placement_id.clone())
                .or_default()
                .push(row.clone());
        }

        let merchant_average = (count > 0).then(|| sum / f64::from(count));

        Self {
            by_placement,
            merchant_average,
        }
    }

    #[must_use]
    pub fn merchant_average(&self) -> Option<f64> {
        self.merchant_average
    }

    /// Resolves the multiplier for one placement and offer key.
    ///
    /// An offer without a multiplier key never takes the exact-match rung.
    #[must_use]
    pub fn lookup(&self, placement_id: &str, multiplier_key: Option<&str>) -> (f64, MultiplierSource) {
        if let Some(rows) = self.by_placement.get(placement_id) {
            if let Some(key) = multiplier_key {
                if let Some(row) = rows.iter().find(|r| r.ecpc_multiplier_key == key) {
                    return (row.ecpc_multiplier, MultiplierSource::Exact);
                }
            }
            if let Some(first) = rows.first() {
                return (first.ecpc_multiplier, MultiplierSource::Placement);
            }
        }

        match self.merchant_average {
            Some(avg) => (avg, MultiplierSource::MerchantAverage),
            None => (FALLBACK_MULTIPLIER, MultiplierSource::Fallback),
        }
    }

    /// Applies the resolved multiplier to `base_cpc`. The product is not rounded.
    #[must_use]
    pub fn adjust_cpc(
        &self,
        base_cpc: f64,
        placement_id: &str,
        multiplier_key: Option<&str>,
    ) -> (f64, MultiplierSource) {
        let (multiplier, source) = self.lookup(placement_id, multiplier_key);
        (base_cpc * multiplier, source)
    }
}
