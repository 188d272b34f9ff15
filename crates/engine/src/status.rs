//! Booking lifecycle state machine.
//!
//! The expected path is `BOOKED → ARRIVED → IN_PROGRESS → COMPLETED`, with
//! `CANCELLED` reachable from any non-terminal state. Only the "already
//! cancelled" guard rejects a transition; skipping ahead in the forward
//! order is allowed but captures no intermediate timestamps.

use booksync_core::errors::{BookingError, BookingResult};
use booksync_core::models::booking::{Booking, BookingStatus};
use chrono::{DateTime, Utc};

use crate::clock::Clock;

/// Applies a requested status change to the booking in place.
///
/// The three forward transitions each capture their event timestamp, taken
/// from `timestamp` when the caller supplies one and from the clock
/// otherwise:
///
/// - `BOOKED → ARRIVED` sets `coming_time`
/// - `ARRIVED → IN_PROGRESS` sets `doing_time`
/// - `IN_PROGRESS → COMPLETED` sets `complete_time`
///
/// Cancelling requires a non-empty `reason` and records it; re-cancelling an
/// already-cancelled booking is a no-op. Any other transition out of
/// `CANCELLED` is a `StateTransition` error. Pairs not listed above (e.g.
/// `BOOKED → COMPLETED` directly) go through with the status change only.
///
/// The caller persists the mutated booking; assignments are untouched.
pub fn apply_transition(
    booking: &mut Booking,
    requested: BookingStatus,
    timestamp: Option<DateTime<Utc>>,
    reason: Option<&str>,
    clock: &dyn Clock,
) -> BookingResult<()> {
    if booking.status == BookingStatus::Cancelled {
        if requested == BookingStatus::Cancelled {
            return Ok(());
        }
        return Err(BookingError::StateTransition(format!(
            "booking {} is cancelled and cannot move to {}",
            booking.id, requested
        )));
    }

    if requested == BookingStatus::Cancelled {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                BookingError::Validation("a cancellation reason is required".to_string())
            })?;
        booking.status = BookingStatus::Cancelled;
        booking.cancel_reason = Some(reason.to_string());
        return Ok(());
    }

    let at = timestamp.unwrap_or_else(|| clock.now());
    match (booking.status, requested) {
        (BookingStatus::Booked, BookingStatus::Arrived) => booking.coming_time = Some(at),
        (BookingStatus::Arrived, BookingStatus::InProgress) => booking.doing_time = Some(at),
        (BookingStatus::InProgress, BookingStatus::Completed) => booking.complete_time = Some(at),
        // Every other pair passes through without timestamp capture.
        _ => {}
    }
    booking.status = requested;
    Ok(())
}
