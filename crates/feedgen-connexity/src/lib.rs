pub mod client;
pub mod error;
pub mod index;

pub use client::{ConnexityClient, ConnexityEndpoints, MERCHANTS_FILE, MULTIPLIER_FILE};
pub use error::ConnexityError;
pub use index::{offer_links_from_index, FeedKind, OfferLink};
