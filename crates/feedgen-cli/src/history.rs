//! Best-effort recording of regeneration status.
//!
//! History is an audit trail only. Failures are logged and never change the
//! outcome of a run, and without a pool every call is a no-op. Status updates
//! address the row created for this run by its request ID; when that insert
//! failed the run is simply not tracked.

use feedgen_core::RegenerateStatus;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone, Default)]
pub(crate) struct History {
    pool: Option<PgPool>,
}

impl History {
    pub(crate) fn new(pool: Option<PgPool>) -> Self {
        Self { pool }
    }

    /// Inserts a `pending` row and returns its request ID.
    pub(crate) async fn record_request(&self, merchant_id: &str, merchant_name: &str) -> Option<Uuid> {
        let pool = self.pool.as_ref()?;
        match feedgen_db::insert_regenerate_request(pool, merchant_id, merchant_name).await {
            Ok(row) => Some(row.request_id),
            Err(e) => {
                tracing::warn!(merchant_id, error = %e, "failed to record regeneration request");
                None
            }
        }
    }

    pub(crate) async fn set_status(&self, request_id: Option<Uuid>, status: RegenerateStatus) {
        let (Some(pool), Some(request_id)) = (&self.pool, request_id) else {
            return;
        };
        if let Err(e) = feedgen_db::update_regenerate_status(pool, request_id, status).await {
            tracing::warn!(%request_id, %status, error = %e, "failed to update regeneration status");
        }
    }
}
