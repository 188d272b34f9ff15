//! In-transaction validation guards. Pre-transaction checks in handlers and
//! planners are advisory; these run after the staff row locks are held and
//! are the authoritative word on conflicts and capacity.

use booksync_core::errors::{BookingError, BookingResult};
use booksync_core::models::interval::TimeInterval;
use booksync_engine::grid::TRICK_SLOT_CAPACITY;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

pub(crate) fn db_err(err: sqlx::Error) -> BookingError {
    BookingError::Database(err.into())
}

/// Locks the given staff rows `FOR UPDATE` so concurrent writers touching
/// the same staff serialize. Ids are sorted and deduplicated first; taking
/// the locks in one fixed order avoids deadlock between two bookings that
/// share staff.
pub(crate) async fn lock_staff_rows(conn: &mut PgConnection, ids: &[Uuid]) -> BookingResult<()> {
    let mut ids: Vec<Uuid> = ids.to_vec();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        SELECT id FROM staff
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;

    Ok(())
}

/// Conflict re-check for one staff member: no committed assignment may
/// overlap `[start, end)`. `exclude_booking` ignores assignments belonging
/// to the booking being updated.
pub(crate) async fn ensure_staff_free(
    conn: &mut PgConnection,
    staff_id: Uuid,
    exclude_booking: Option<Uuid>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> BookingResult<()> {
    let clash = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
        r#"
        SELECT time_start, time_end FROM staff_assignments
        WHERE staff_id = $1
          AND time_start < $3 AND $2 < time_end
          AND ($4::uuid IS NULL OR booking_id <> $4)
        LIMIT 1
        "#,
    )
    .bind(staff_id)
    .bind(start)
    .bind(end)
    .bind(exclude_booking)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;

    if let Some((taken_start, taken_end)) = clash {
        return Err(BookingError::Conflict(format!(
            "staff {} is already assigned between {} and {}",
            staff_id, taken_start, taken_end
        )));
    }
    Ok(())
}

/// Conflict re-check for a doctor: no live booking of theirs may overlap
/// `[start, end)`. Cancelled and soft-deleted bookings hold no time.
pub(crate) async fn ensure_doctor_free(
    conn: &mut PgConnection,
    doctor_id: Uuid,
    exclude_booking: Option<Uuid>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> BookingResult<()> {
    let clash = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
        r#"
        SELECT appointment_date, time_end FROM bookings
        WHERE doctor_id = $1
          AND is_deleted = FALSE
          AND status <> 'CANCELLED'
          AND appointment_date < $3 AND $2 < time_end
          AND ($4::uuid IS NULL OR id <> $4)
        LIMIT 1
        "#,
    )
    .bind(doctor_id)
    .bind(start)
    .bind(end)
    .bind(exclude_booking)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;

    if let Some((taken_start, taken_end)) = clash {
        return Err(BookingError::Conflict(format!(
            "doctor {} already has a booking between {} and {}",
            doctor_id, taken_start, taken_end
        )));
    }
    Ok(())
}

/// Origin-slot capacity re-check: a doctor may have at most
/// [`TRICK_SLOT_CAPACITY`] live TRICK bookings starting in one 30-minute
/// slot.
pub(crate) async fn ensure_slot_capacity(
    conn: &mut PgConnection,
    doctor_id: Uuid,
    appointment_date: DateTime<Utc>,
) -> BookingResult<()> {
    let slot = TimeInterval::enclosing_half_hour(appointment_date);

    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM bookings b
        JOIN services s ON s.id = b.service_id
        WHERE b.doctor_id = $1
          AND s.kind = 'TRICK'
          AND b.is_deleted = FALSE
          AND b.status <> 'CANCELLED'
          AND b.appointment_date >= $2 AND b.appointment_date < $3
        "#,
    )
    .bind(doctor_id)
    .bind(slot.start)
    .bind(slot.end)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_err)?;

    if count >= TRICK_SLOT_CAPACITY as i64 {
        return Err(BookingError::Capacity(format!(
            "doctor at slot capacity: {} bookings already start between {} and {}",
            count, slot.start, slot.end
        )));
    }
    Ok(())
}
