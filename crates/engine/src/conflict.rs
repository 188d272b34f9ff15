//! Interval conflict checking.
//!
//! The overlap predicate itself lives on [`TimeInterval`]; this module adds
//! the set forms used by the two conflict call sites:
//!
//! 1. Staff-assignment conflicts, where the existing intervals are every
//!    assignment already committed for one staff member.
//! 2. Doctor-booking conflicts, where the existing intervals are a doctor's
//!    live (non-deleted, non-cancelled) bookings.
//!
//! Nothing here raises errors or writes anything; callers translate a hit
//! into a `Conflict` error with context.

use booksync_core::models::{
    assignment::StaffAssignment, booking::Booking, interval::TimeInterval,
};
use uuid::Uuid;

/// True when `candidate` overlaps any interval in `existing`.
pub fn overlaps_any(existing: &[TimeInterval], candidate: &TimeInterval) -> bool {
    existing.iter().any(|interval| interval.overlaps(candidate))
}

/// The first interval in `existing` that overlaps `candidate`, for error
/// messages that name the offending window.
pub fn find_overlap<'a>(
    existing: &'a [TimeInterval],
    candidate: &TimeInterval,
) -> Option<&'a TimeInterval> {
    existing.iter().find(|interval| interval.overlaps(candidate))
}

/// Intervals occupied by a staff member's committed assignments.
///
/// `exclude_booking` drops one booking's own assignments so an update can
/// re-check against everyone else's without colliding with itself.
pub fn assignment_intervals(
    assignments: &[StaffAssignment],
    exclude_booking: Option<Uuid>,
) -> Vec<TimeInterval> {
    assignments
        .iter()
        .filter(|a| exclude_booking.is_none_or(|excluded| a.booking_id != excluded))
        .map(|a| a.interval())
        .collect()
}

/// Intervals occupied by a doctor's bookings. Cancelled and soft-deleted
/// bookings hold no time.
pub fn booking_intervals(bookings: &[Booking], exclude_booking: Option<Uuid>) -> Vec<TimeInterval> {
    bookings
        .iter()
        .filter(|b| !b.is_deleted && !b.is_cancelled())
        .filter(|b| exclude_booking.is_none_or(|excluded| b.id != excluded))
        .map(|b| b.interval())
        .collect()
}
