//! Database operations for `regenerate_history`.

use chrono::{DateTime, Utc};
use feedgen_core::RegenerateStatus;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const HISTORY_COLUMNS: &str = "id, request_id, merchant_id, merchant_name, status, \
                               requested_at, created_at, updated_at";

/// A row from the `regenerate_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegenerateHistoryRow {
    pub id: i64,
    pub request_id: Uuid,
    pub merchant_id: String,
    pub merchant_name: String,
    /// One of the [`RegenerateStatus`] values, lowercase.
    pub status: String,
    pub requested_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Records a new request in `pending` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_regenerate_request(
    pool: &PgPool,
    merchant_id: &str,
    merchant_name: &str,
) -> Result<RegenerateHistoryRow, DbError> {
    let row = sqlx::query_as::<_, RegenerateHistoryRow>(&format!(
        "INSERT INTO regenerate_history (request_id, merchant_id, merchant_name, status) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {HISTORY_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(merchant_id)
    .bind(merchant_name)
    .bind(RegenerateStatus::Pending.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Sets the status of the request identified by `request_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row carries `request_id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_regenerate_status(
    pool: &PgPool,
    request_id: Uuid,
    status: RegenerateStatus,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE regenerate_history \
         SET status = $1, updated_at = NOW() \
         WHERE request_id = $2",
    )
    .bind(status.as_str())
    .bind(request_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound(request_id.to_string()));
    }

    Ok(())
}

/// Lists the most recent requests, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_regenerations(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<RegenerateHistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, RegenerateHistoryRow>(&format!(
        "SELECT {HISTORY_COLUMNS} FROM regenerate_history \
         ORDER BY requested_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
