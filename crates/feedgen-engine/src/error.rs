use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read source rows from {context}: {source}")]
    SourceRead {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context} is missing required column \"{column}\"")]
    MissingColumn { context: String, column: String },

    #[error("failed to write feed output: {0}")]
    Write(#[source] std::io::Error),

    #[error("partition reader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("invalid partition file pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl FeedError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        FeedError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
