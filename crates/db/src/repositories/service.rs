use crate::models::DbService;
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_service_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbService>> {
    tracing::debug!("Getting service by id: {}", id);

    let service = sqlx::query_as::<_, DbService>(
        r#"
        SELECT id, name, kind, time, job_ids, count_staff, staff_ids, is_deleted, created_at
        FROM services
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(service)
}

/// Non-deleted services matching `ids`. Postgres returns them in arbitrary
/// order; callers needing the request order (job resolution) reorder by id.
pub async fn get_services_by_ids(pool: &Pool<Postgres>, ids: &[Uuid]) -> Result<Vec<DbService>> {
    tracing::debug!("Getting {} services by id", ids.len());

    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let services = sqlx::query_as::<_, DbService>(
        r#"
        SELECT id, name, kind, time, job_ids, count_staff, staff_ids, is_deleted, created_at
        FROM services
        WHERE id = ANY($1) AND is_deleted = FALSE
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(services)
}
