use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Working directory for downloads, generated feeds and reject logs.
    pub root_path: PathBuf,
    pub placements_path: PathBuf,
    pub publisher_id: Option<String>,
    pub api_key: Option<String>,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    /// Base of the product `link` attribute; merchant and product IDs are appended.
    pub product_link_base: String,
    pub webhook_url: Option<String>,
    pub upload_dir: Option<PathBuf>,
    pub upload_url: Option<String>,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl AppConfig {
    /// Directory holding downloaded offer parts and generated feed files.
    #[must_use]
    pub fn feeds_path(&self) -> PathBuf {
        self.root_path.join("feeds")
    }

    /// Directory for the plain-text audit logs (rejected merchants).
    #[must_use]
    pub fn logs_path(&self) -> PathBuf {
        self.root_path.join("logs")
    }

    /// Returns the Connexity publisher ID and API key when both are configured.
    #[must_use]
    pub fn connexity_credentials(&self) -> Option<(&str, &str)> {
        match (&self.publisher_id, &self.api_key) {
            (Some(id), Some(key)) => Some((id.as_str(), key.as_str())),
            _ => None,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("root_path", &self.root_path)
            .field("placements_path", &self.placements_path)
            .field("publisher_id", &self.publisher_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("product_link_base", &self.product_link_base)
            .field("webhook_url", &self.webhook_url)
            .field("upload_dir", &self.upload_dir)
            .field("upload_url", &self.upload_url)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
