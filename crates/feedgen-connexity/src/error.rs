use thiserror::Error;

/// Errors returned by the Connexity export client.
#[derive(Debug, Error)]
pub enum ConnexityError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The export host answered with a non-2xx status.
    #[error("unexpected HTTP status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("invalid endpoint URL '{endpoint}': {reason}")]
    InvalidUrl { endpoint: String, reason: String },

    /// The body was not a valid gzip stream, or the decoded output could not
    /// be written.
    #[error("failed to decompress {endpoint} into {path}: {source}")]
    Decompress {
        endpoint: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("decompression task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("invalid index pattern: {0}")]
    Pattern(#[from] regex::Error),
}
