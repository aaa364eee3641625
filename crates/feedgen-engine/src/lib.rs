pub mod assemble;
pub mod attributes;
pub mod cpc_range;
pub mod enrichment;
pub mod error;
pub mod multiplier;
pub mod placements;
pub mod sources;

pub use assemble::{assemble_feed, create_feed_file, AdjustmentCounts, AssembleReport, FeedContext};
pub use attributes::{map_attributes, MappingContext};
pub use cpc_range::cpc_range;
pub use enrichment::{load_enrichment, parse_offer_partition};
pub use error::FeedError;
pub use multiplier::{MultiplierIndex, MultiplierSource, FALLBACK_MULTIPLIER};
pub use placements::PlacementResolver;
pub use sources::{
    append_lines, combine_pla_feeds, load_merchants, load_multiplier_rows,
    parse_multiplier_rows, prepare_feed_directories,
};
