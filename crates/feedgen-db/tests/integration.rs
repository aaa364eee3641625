//! Offline unit tests for feedgen-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::path::PathBuf;

use feedgen_core::{AppConfig, Environment, RegenerateStatus};
use feedgen_db::{PoolConfig, RegenerateHistoryRow};

fn app_config() -> AppConfig {
    AppConfig {
        env: Environment::Test,
        log_level: "info".to_string(),
        root_path: PathBuf::from("/var/lib/feedgen"),
        placements_path: PathBuf::from("./config/placements.yaml"),
        publisher_id: None,
        api_key: None,
        http_timeout_secs: 300,
        user_agent: "feedgen".to_string(),
        product_link_base: "https://onlinebazaar4u.com/product".to_string(),
        webhook_url: None,
        upload_dir: None,
        upload_url: None,
        database_url: Some("postgres://example".to_string()),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[tokio::test]
async fn connect_without_url_is_missing_database_url() {
    let config = AppConfig {
        database_url: None,
        ..app_config()
    };
    let err = feedgen_db::connect_from_app_config(&config).await.unwrap_err();
    assert!(matches!(err, feedgen_db::DbError::MissingDatabaseUrl));
}

/// Compile-time smoke test: confirm that [`RegenerateHistoryRow`] has all
/// expected fields with the correct types. No database required.
#[test]
fn regenerate_history_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let now = Utc::now();
    let row = RegenerateHistoryRow {
        id: 1_i64,
        request_id: Uuid::new_v4(),
        merchant_id: "24".to_string(),
        merchant_name: "Shoe Barn".to_string(),
        status: RegenerateStatus::Pending.to_string(),
        requested_at: now,
        created_at: now,
        updated_at: now,
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.merchant_id, "24");
    assert_eq!(row.status, "pending");
}
