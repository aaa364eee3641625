pub mod app_config;
pub mod config;
pub mod models;
pub mod placements;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use models::{
    EnrichedOfferData, FeedRow, MerchantInfo, MultiplierRow, RawOfferRecord, RegenerateStatus,
    FEED_ATTRIBUTES,
};
pub use placements::{load_placements, parse_placements, LabelGroup, PlacementsFile, ReplacementRule};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read placements file {path}: {source}")]
    PlacementsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse placements file: {0}")]
    PlacementsFileParse(#[source] serde_yaml::Error),

    #[error("placements validation failed: {0}")]
    Validation(String),
}
