use crate::models::DbCustomer;
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_customer_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbCustomer>> {
    tracing::debug!("Getting customer by id: {}", id);

    let customer = sqlx::query_as::<_, DbCustomer>(
        r#"
        SELECT id, name, phone, is_deleted, created_at
        FROM customers
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(customer)
}
