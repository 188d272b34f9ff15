use crate::models::DbStaff;
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_staff_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbStaff>> {
    tracing::debug!("Getting staff member by id: {}", id);

    let staff = sqlx::query_as::<_, DbStaff>(
        r#"
        SELECT id, name, role, active, schedule, is_deleted, created_at
        FROM staff
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(staff)
}

/// Active, non-deleted staff of one role, in creation order. Creation order
/// is what the auto-assigner walks, so it is fixed here rather than left to
/// the planner.
pub async fn get_schedulable_staff_by_role(
    pool: &Pool<Postgres>,
    role: &str,
) -> Result<Vec<DbStaff>> {
    tracing::debug!("Getting schedulable staff with role: {}", role);

    let staff = sqlx::query_as::<_, DbStaff>(
        r#"
        SELECT id, name, role, active, schedule, is_deleted, created_at
        FROM staff
        WHERE role = $1 AND active = TRUE AND is_deleted = FALSE
        ORDER BY created_at ASC
        "#,
    )
    .bind(role)
    .fetch_all(pool)
    .await?;

    Ok(staff)
}
