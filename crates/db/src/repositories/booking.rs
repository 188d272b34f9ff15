use crate::models::{DbBooking, NewBooking};
use crate::repositories::guards::{self, db_err};
use booksync_core::errors::{BookingError, BookingResult};
use booksync_core::models::assignment::AssignmentPlan;
use booksync_core::models::booking::Booking;
use booksync_core::models::service::ServiceKind;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use eyre::{eyre, Result};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

/// The UTC day window `[00:00, +24h)` containing `date`.
pub(crate) fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

pub async fn get_booking_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbBooking>> {
    tracing::debug!("Getting booking by id: {}", id);

    let booking = sqlx::query_as::<_, DbBooking>(
        r#"
        SELECT id, customer_id, service_id, doctor_id, appointment_date, time_end,
               doctor_date, status, priority, coming_time, doing_time, complete_time,
               cancel_reason, staff_assignments, is_deleted, created_at
        FROM bookings
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(booking)
}

/// Live (non-deleted, non-cancelled) bookings overlapping the given day,
/// earliest first.
pub async fn get_bookings_for_date(
    pool: &Pool<Postgres>,
    date: NaiveDate,
) -> Result<Vec<DbBooking>> {
    tracing::debug!("Getting bookings for date: {}", date);
    let (day_start, day_end) = day_bounds(date);

    let bookings = sqlx::query_as::<_, DbBooking>(
        r#"
        SELECT id, customer_id, service_id, doctor_id, appointment_date, time_end,
               doctor_date, status, priority, coming_time, doing_time, complete_time,
               cancel_reason, staff_assignments, is_deleted, created_at
        FROM bookings
        WHERE is_deleted = FALSE
          AND status <> 'CANCELLED'
          AND appointment_date < $2 AND time_end > $1
        ORDER BY appointment_date ASC
        "#,
    )
    .bind(day_start)
    .bind(day_end)
    .fetch_all(pool)
    .await?;

    Ok(bookings)
}

/// Live TRICK bookings overlapping the given day; the doctor-occupancy
/// source for the availability grid.
pub async fn get_trick_bookings_for_date(
    pool: &Pool<Postgres>,
    date: NaiveDate,
) -> Result<Vec<DbBooking>> {
    tracing::debug!("Getting TRICK bookings for date: {}", date);
    let (day_start, day_end) = day_bounds(date);

    let bookings = sqlx::query_as::<_, DbBooking>(
        r#"
        SELECT b.id, b.customer_id, b.service_id, b.doctor_id, b.appointment_date,
               b.time_end, b.doctor_date, b.status, b.priority, b.coming_time,
               b.doing_time, b.complete_time, b.cancel_reason, b.staff_assignments,
               b.is_deleted, b.created_at
        FROM bookings b
        JOIN services s ON s.id = b.service_id
        WHERE s.kind = 'TRICK'
          AND b.is_deleted = FALSE
          AND b.status <> 'CANCELLED'
          AND b.appointment_date < $2 AND b.time_end > $1
        ORDER BY b.appointment_date ASC
        "#,
    )
    .bind(day_start)
    .bind(day_end)
    .fetch_all(pool)
    .await?;

    Ok(bookings)
}

/// A doctor's live bookings overlapping `[from, until)`, for the advisory
/// conflict check before the transaction.
pub async fn get_bookings_for_doctor(
    pool: &Pool<Postgres>,
    doctor_id: Uuid,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<DbBooking>> {
    tracing::debug!("Getting bookings for doctor: {}", doctor_id);

    let bookings = sqlx::query_as::<_, DbBooking>(
        r#"
        SELECT id, customer_id, service_id, doctor_id, appointment_date, time_end,
               doctor_date, status, priority, coming_time, doing_time, complete_time,
               cancel_reason, staff_assignments, is_deleted, created_at
        FROM bookings
        WHERE doctor_id = $1
          AND is_deleted = FALSE
          AND status <> 'CANCELLED'
          AND appointment_date < $3 AND time_end > $2
        ORDER BY appointment_date ASC
        "#,
    )
    .bind(doctor_id)
    .bind(from)
    .bind(until)
    .fetch_all(pool)
    .await?;

    Ok(bookings)
}

/// Creates a booking and its planned assignments as one unit.
///
/// Everything runs in a single transaction: the affected staff rows are
/// locked `FOR UPDATE` (sorted ids, fixed order), every planned window is
/// re-validated against committed assignments, and for a TRICK booking the
/// doctor's own calendar and origin-slot capacity are re-checked. Only then
/// are the booking and assignment rows inserted and the assignment ids
/// linked back onto the booking. Any failed check returns the typed error
/// and rolls the whole transaction back.
pub async fn create_booking_with_assignments(
    pool: &Pool<Postgres>,
    new: &NewBooking,
    plans: &[AssignmentPlan],
) -> BookingResult<Booking> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    tracing::debug!(
        "Creating booking: id={}, service={}, kind={}, plans={}",
        id,
        new.service_id,
        new.kind,
        plans.len()
    );

    let mut tx = pool.begin().await.map_err(db_err)?;

    let mut lock_ids: Vec<Uuid> = plans.iter().map(|plan| plan.staff_id).collect();
    if let Some(doctor_id) = new.doctor_id {
        lock_ids.push(doctor_id);
    }
    guards::lock_staff_rows(&mut *tx, &lock_ids).await?;

    for plan in plans {
        guards::ensure_staff_free(&mut *tx, plan.staff_id, None, plan.window.start, plan.window.end)
            .await?;
    }

    if new.kind == ServiceKind::Trick {
        let doctor_id = new.doctor_id.ok_or_else(|| {
            BookingError::Validation("a TRICK booking requires a doctor".to_string())
        })?;
        guards::ensure_doctor_free(&mut *tx, doctor_id, None, new.appointment_date, new.time_end)
            .await?;
        guards::ensure_slot_capacity(&mut *tx, doctor_id, new.appointment_date).await?;
    }

    let mut booking = sqlx::query_as::<_, DbBooking>(
        r#"
        INSERT INTO bookings (id, customer_id, service_id, doctor_id, appointment_date,
                              time_end, doctor_date, status, priority, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'BOOKED', $8, $9)
        RETURNING id, customer_id, service_id, doctor_id, appointment_date, time_end,
                  doctor_date, status, priority, coming_time, doing_time, complete_time,
                  cancel_reason, staff_assignments, is_deleted, created_at
        "#,
    )
    .bind(id)
    .bind(new.customer_id)
    .bind(new.service_id)
    .bind(new.doctor_id)
    .bind(new.appointment_date)
    .bind(new.time_end)
    .bind(new.doctor_date)
    .bind(new.priority)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    let mut assignment_ids = Vec::with_capacity(plans.len());
    for plan in plans {
        let assignment_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO staff_assignments (id, booking_id, staff_id, service_ids,
                                           time_start, time_end, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(plan.staff_id)
        .bind(&plan.service_ids)
        .bind(plan.window.start)
        .bind(plan.window.end)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        assignment_ids.push(assignment_id);
    }

    if !assignment_ids.is_empty() {
        booking = sqlx::query_as::<_, DbBooking>(
            r#"
            UPDATE bookings SET staff_assignments = $2
            WHERE id = $1
            RETURNING id, customer_id, service_id, doctor_id, appointment_date, time_end,
                      doctor_date, status, priority, coming_time, doing_time, complete_time,
                      cancel_reason, staff_assignments, is_deleted, created_at
            "#,
        )
        .bind(id)
        .bind(&assignment_ids)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
    }

    tx.commit().await.map_err(db_err)?;

    tracing::debug!("Booking created: id={}, assignments={}", id, assignment_ids.len());
    Ok(booking.into_model()?)
}

/// Persists the status fields mutated by the state machine. Assignments are
/// untouched.
pub async fn update_booking_status(pool: &Pool<Postgres>, booking: &Booking) -> Result<DbBooking> {
    tracing::debug!(
        "Updating booking status: id={}, status={}",
        booking.id,
        booking.status
    );

    let updated = sqlx::query_as::<_, DbBooking>(
        r#"
        UPDATE bookings
        SET status = $2, coming_time = $3, doing_time = $4, complete_time = $5,
            cancel_reason = $6
        WHERE id = $1
        RETURNING id, customer_id, service_id, doctor_id, appointment_date, time_end,
                  doctor_date, status, priority, coming_time, doing_time, complete_time,
                  cancel_reason, staff_assignments, is_deleted, created_at
        "#,
    )
    .bind(booking.id)
    .bind(booking.status.as_str())
    .bind(booking.coming_time)
    .bind(booking.doing_time)
    .bind(booking.complete_time)
    .bind(booking.cancel_reason.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(updated)
}

/// Marks the booking deleted and removes its assignments, freeing the staff
/// time they held.
pub async fn soft_delete_booking(pool: &Pool<Postgres>, id: Uuid) -> Result<DbBooking> {
    tracing::debug!("Soft-deleting booking: id={}", id);

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM staff_assignments WHERE booking_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let booking = sqlx::query_as::<_, DbBooking>(
        r#"
        UPDATE bookings SET is_deleted = TRUE, staff_assignments = '{}'
        WHERE id = $1
        RETURNING id, customer_id, service_id, doctor_id, appointment_date, time_end,
                  doctor_date, status, priority, coming_time, doing_time, complete_time,
                  cancel_reason, staff_assignments, is_deleted, created_at
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| eyre!("Booking not found"))?;

    tx.commit().await?;
    Ok(booking)
}

/// Removes the booking row and its assignments entirely.
pub async fn hard_delete_booking(pool: &Pool<Postgres>, id: Uuid) -> Result<()> {
    tracing::debug!("Hard-deleting booking: id={}", id);

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM staff_assignments WHERE booking_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
