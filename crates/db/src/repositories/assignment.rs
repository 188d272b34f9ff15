use crate::models::DbStaffAssignment;
use crate::repositories::booking::day_bounds;
use crate::repositories::guards::{self, db_err};
use booksync_core::errors::{BookingError, BookingResult};
use booksync_core::models::assignment::{AssignmentPlan, StaffAssignment};
use booksync_core::models::booking::Booking;
use chrono::{DateTime, NaiveDate, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_assignments_for_booking(
    pool: &Pool<Postgres>,
    booking_id: Uuid,
) -> Result<Vec<DbStaffAssignment>> {
    tracing::debug!("Getting assignments for booking: {}", booking_id);

    let assignments = sqlx::query_as::<_, DbStaffAssignment>(
        r#"
        SELECT id, booking_id, staff_id, service_ids, time_start, time_end, created_at
        FROM staff_assignments
        WHERE booking_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(booking_id)
    .fetch_all(pool)
    .await?;

    Ok(assignments)
}

/// One staff member's assignments overlapping `[from, until)`. The
/// assignment side ignores booking status: a cancelled booking's
/// assignments still hold the staff member's time until removed.
pub async fn get_assignments_for_staff(
    pool: &Pool<Postgres>,
    staff_id: Uuid,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<DbStaffAssignment>> {
    tracing::debug!("Getting assignments for staff: {}", staff_id);

    let assignments = sqlx::query_as::<_, DbStaffAssignment>(
        r#"
        SELECT id, booking_id, staff_id, service_ids, time_start, time_end, created_at
        FROM staff_assignments
        WHERE staff_id = $1
          AND time_start < $3 AND time_end > $2
        ORDER BY time_start ASC
        "#,
    )
    .bind(staff_id)
    .bind(from)
    .bind(until)
    .fetch_all(pool)
    .await?;

    Ok(assignments)
}

/// All assignments overlapping the given day, the technician-occupancy
/// source for the grid and the daily schedule.
pub async fn get_assignments_for_date(
    pool: &Pool<Postgres>,
    date: NaiveDate,
) -> Result<Vec<DbStaffAssignment>> {
    tracing::debug!("Getting assignments for date: {}", date);
    let (day_start, day_end) = day_bounds(date);

    let assignments = sqlx::query_as::<_, DbStaffAssignment>(
        r#"
        SELECT id, booking_id, staff_id, service_ids, time_start, time_end, created_at
        FROM staff_assignments
        WHERE time_start < $2 AND time_end > $1
        ORDER BY time_start ASC
        "#,
    )
    .bind(day_start)
    .bind(day_end)
    .fetch_all(pool)
    .await?;

    Ok(assignments)
}

/// Adds one planned assignment to an existing booking.
///
/// Idempotent per (booking, staff): when the staff member is already
/// assigned to this booking the existing assignment is returned unchanged.
/// Otherwise the window is re-validated under the staff row lock, the
/// assignment inserted, and its id appended to the booking's assignment
/// list, all in one transaction.
pub async fn add_staff_to_booking(
    pool: &Pool<Postgres>,
    booking: &Booking,
    plan: &AssignmentPlan,
) -> BookingResult<StaffAssignment> {
    tracing::debug!(
        "Adding staff {} to booking {}",
        plan.staff_id,
        booking.id
    );

    let mut tx = pool.begin().await.map_err(db_err)?;

    guards::lock_staff_rows(&mut *tx, &[plan.staff_id]).await?;

    let existing = sqlx::query_as::<_, DbStaffAssignment>(
        r#"
        SELECT id, booking_id, staff_id, service_ids, time_start, time_end, created_at
        FROM staff_assignments
        WHERE booking_id = $1 AND staff_id = $2
        "#,
    )
    .bind(booking.id)
    .bind(plan.staff_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_err)?;

    if let Some(row) = existing {
        tx.commit().await.map_err(db_err)?;
        tracing::debug!("Staff {} already assigned, returning as-is", plan.staff_id);
        return Ok(row.into_model());
    }

    guards::ensure_staff_free(
        &mut *tx,
        plan.staff_id,
        Some(booking.id),
        plan.window.start,
        plan.window.end,
    )
    .await?;

    let row = sqlx::query_as::<_, DbStaffAssignment>(
        r#"
        INSERT INTO staff_assignments (id, booking_id, staff_id, service_ids,
                                       time_start, time_end, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, booking_id, staff_id, service_ids, time_start, time_end, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(booking.id)
    .bind(plan.staff_id)
    .bind(&plan.service_ids)
    .bind(plan.window.start)
    .bind(plan.window.end)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    sqlx::query(
        r#"
        UPDATE bookings SET staff_assignments = array_append(staff_assignments, $2)
        WHERE id = $1
        "#,
    )
    .bind(booking.id)
    .bind(row.id)
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;

    tx.commit().await.map_err(db_err)?;
    Ok(row.into_model())
}

/// Removes one staff member's assignment from a booking and unlinks its id.
/// `NotFound` when the staff member is not assigned.
pub async fn remove_staff_from_booking(
    pool: &Pool<Postgres>,
    booking_id: Uuid,
    staff_id: Uuid,
) -> BookingResult<StaffAssignment> {
    tracing::debug!("Removing staff {} from booking {}", staff_id, booking_id);

    let mut tx = pool.begin().await.map_err(db_err)?;

    let row = sqlx::query_as::<_, DbStaffAssignment>(
        r#"
        DELETE FROM staff_assignments
        WHERE booking_id = $1 AND staff_id = $2
        RETURNING id, booking_id, staff_id, service_ids, time_start, time_end, created_at
        "#,
    )
    .bind(booking_id)
    .bind(staff_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_err)?
    .ok_or_else(|| {
        BookingError::NotFound(format!(
            "no assignment for staff {} on booking {}",
            staff_id, booking_id
        ))
    })?;

    sqlx::query(
        r#"
        UPDATE bookings SET staff_assignments = array_remove(staff_assignments, $2)
        WHERE id = $1
        "#,
    )
    .bind(booking_id)
    .bind(row.id)
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;

    tx.commit().await.map_err(db_err)?;
    Ok(row.into_model())
}
