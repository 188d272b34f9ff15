//! # Availability Grid Construction
//!
//! Builds the per-day, per-staff grid a caller picks a booking slot from.
//! The day is divided into fixed 30-minute slots from 08:00 through 22:00;
//! every eligible staff member gets one row classifying each slot.
//!
//! ## Algorithm
//!
//! 1. Staff eligibility: keep candidates who can legally perform the target
//!    service (role STAFF for JOB; role DOCTOR, and on the allow-list when
//!    one exists, for TRICK), are active and not deleted, and have a
//!    non-empty shift for the target weekday.
//! 2. Span construction: each TRICK booking (keyed by its doctor) and each
//!    assignment (keyed by its staff) on the date becomes a display span
//!    locating the slots containing its start and end. The literal end
//!    instant is preserved because it may fall inside the end slot rather
//!    than on a boundary.
//! 3. Cell classification, service-type dependent:
//!    - JOB target: a slot fully covered by a span is occupied outright; a
//!      span ending inside the slot leaves the remainder selectable.
//!    - TRICK target: capacity counts the TRICK spans whose *start* falls
//!      inside the slot, capped at three. JOB spans never consume TRICK
//!      capacity; doctors and technicians are different resource pools.
//!    - Working-hours and past-time filters override occupancy.
//! 4. Start resolution: a selectable cell proposes the trailing end of the
//!    predecessor span when one dies inside the slot, otherwise the slot
//!    boundary, plus the service's total duration for the end.
//!
//! The grid reads a one-shot snapshot and is advisory only: booking
//! creation re-validates conflicts authoritatively at commit time.

use booksync_core::models::{
    assignment::StaffAssignment,
    booking::Booking,
    service::{Service, ServiceKind},
    staff::{DaySchedule, Staff, StaffRole},
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;

/// First slot starts at 08:00.
pub const GRID_OPEN_MINUTE: u16 = 8 * 60;
/// Slot width in minutes.
pub const SLOT_MINUTES: u16 = 30;
/// 08:00 through 22:00 inclusive.
pub const SLOT_COUNT: usize = 29;
/// TRICK bookings allowed to originate in one slot.
pub const TRICK_SLOT_CAPACITY: usize = 3;

/// One 30-minute bucket of the day grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSlot {
    pub index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Boundaries in minutes from midnight, for shift containment checks.
    pub start_min: u16,
    pub end_min: u16,
}

/// The occupancy representation of one booking or assignment across the
/// slots it touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySpan {
    pub staff_id: Uuid,
    pub booking_id: Uuid,
    pub kind: ServiceKind,
    pub start_slot: usize,
    pub end_slot: usize,
    pub actual_start: DateTime<Utc>,
    /// Literal end instant; may fall inside the end slot rather than on a
    /// slot boundary.
    pub actual_end: DateTime<Utc>,
    /// Consecutive slots the span fully consumes when rendered.
    pub row_span: usize,
}

/// Classification of one (staff, slot) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    /// Outside the staff member's shift for this weekday.
    OutOfHours,
    /// The slot's start has already elapsed today.
    Past,
    Free,
    /// A span covers the slot through its end.
    OccupiedExclusive,
    /// A span ends inside the slot; the remainder is selectable.
    OccupiedWithRoom,
    /// The slot already hosts the maximum TRICK bookings.
    AtCapacity,
}

impl CellState {
    pub fn is_selectable(&self) -> bool {
        matches!(self, CellState::Free | CellState::OccupiedWithRoom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridCell {
    pub slot_index: usize,
    pub state: CellState,
    /// Booking start proposed when this cell is picked; absent on
    /// non-selectable cells.
    pub proposed_start: Option<DateTime<Utc>>,
    pub proposed_end: Option<DateTime<Utc>>,
    /// TRICK bookings originating in this slot.
    pub trick_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRow {
    pub staff_id: Uuid,
    pub staff_name: String,
    pub role: StaffRole,
    pub cells: Vec<GridCell>,
    pub spans: Vec<DisplaySpan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityGrid {
    pub date: NaiveDate,
    pub service_id: Uuid,
    pub kind: ServiceKind,
    /// Seconds a booking started from this grid will run for: the service's
    /// own time, plus the combined prep-job time for TRICK.
    pub total_duration: i64,
    pub slots: Vec<GridSlot>,
    pub rows: Vec<StaffRow>,
}

/// Snapshot of the day handed to the builder. `trick_bookings` holds the
/// date's live TRICK bookings; `assignments` the technician assignments of
/// live bookings.
#[derive(Debug, Clone)]
pub struct GridRequest<'a> {
    pub date: NaiveDate,
    pub service: &'a Service,
    /// Resolved prep jobs in `service.job_ids` order; empty for JOB.
    pub jobs: &'a [Service],
    /// Candidate staff in creation order.
    pub staff: &'a [Staff],
    pub trick_bookings: &'a [Booking],
    pub assignments: &'a [StaffAssignment],
}

/// Builds the grid for one date and target service.
pub fn build_grid(request: &GridRequest<'_>, clock: &dyn Clock) -> AvailabilityGrid {
    let slots = build_slots(request.date);
    let weekday = request.date.weekday();

    let total_duration = match request.service.kind {
        ServiceKind::Job => request.service.time,
        ServiceKind::Trick => {
            request.service.time + request.jobs.iter().map(|job| job.time).sum::<i64>()
        }
    };

    // Past-time filtering only applies when the grid is for today.
    let now = clock.now();
    let cutoff = (now.date_naive() == request.date).then_some(now);

    let spans = build_spans(&slots, request.trick_bookings, request.assignments);

    let rows = request
        .staff
        .iter()
        .filter(|staff| is_eligible(request.service, staff, weekday))
        .map(|staff| {
            let own_spans: Vec<DisplaySpan> = spans
                .iter()
                .filter(|span| span.staff_id == staff.id)
                .cloned()
                .collect();
            let cells = classify_row(
                request.service.kind,
                &slots,
                &own_spans,
                staff.schedule.day(weekday),
                cutoff,
                Duration::seconds(total_duration),
            );
            StaffRow {
                staff_id: staff.id,
                staff_name: staff.name.clone(),
                role: staff.role,
                cells,
                spans: own_spans,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "Built availability grid: date={}, service={}, rows={}, spans={}",
        request.date,
        request.service.id,
        rows.len(),
        spans.len()
    );

    AvailabilityGrid {
        date: request.date,
        service_id: request.service.id,
        kind: request.service.kind,
        total_duration,
        slots,
        rows,
    }
}

/// The fixed slot sequence for one date: 29 half-hour buckets starting at
/// 08:00, the last at 22:00.
pub fn build_slots(date: NaiveDate) -> Vec<GridSlot> {
    let midnight = date.and_time(NaiveTime::MIN).and_utc();
    (0..SLOT_COUNT)
        .map(|index| {
            let start_min = GRID_OPEN_MINUTE + index as u16 * SLOT_MINUTES;
            let start = midnight + Duration::minutes(i64::from(start_min));
            GridSlot {
                index,
                start,
                end: start + Duration::minutes(i64::from(SLOT_MINUTES)),
                start_min,
                end_min: start_min + SLOT_MINUTES,
            }
        })
        .collect()
}

/// Index of the slot containing `instant`. Slots are half-open, so a
/// boundary instant belongs to the later slot.
pub fn slot_index_of(slots: &[GridSlot], instant: DateTime<Utc>) -> Option<usize> {
    slots
        .iter()
        .find(|slot| slot.start <= instant && instant < slot.end)
        .map(|slot| slot.index)
}

/// Converts the date's bookings and assignments into display spans. TRICK
/// bookings are keyed by their doctor, assignments by their staff member;
/// anything entirely outside the grid window produces no span.
pub fn build_spans(
    slots: &[GridSlot],
    trick_bookings: &[Booking],
    assignments: &[StaffAssignment],
) -> Vec<DisplaySpan> {
    let mut spans = Vec::new();

    for booking in trick_bookings {
        if booking.is_deleted || booking.is_cancelled() {
            continue;
        }
        let Some(doctor_id) = booking.doctor_id else {
            continue;
        };
        if let Some(span) = make_span(
            slots,
            doctor_id,
            booking.id,
            ServiceKind::Trick,
            booking.appointment_date,
            booking.time_end,
        ) {
            spans.push(span);
        }
    }

    for assignment in assignments {
        if let Some(span) = make_span(
            slots,
            assignment.staff_id,
            assignment.booking_id,
            ServiceKind::Job,
            assignment.time_start,
            assignment.time_end,
        ) {
            spans.push(span);
        }
    }

    spans
}

fn make_span(
    slots: &[GridSlot],
    staff_id: Uuid,
    booking_id: Uuid,
    kind: ServiceKind,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<DisplaySpan> {
    let grid_start = slots.first()?.start;
    let grid_end = slots.last()?.end;
    if end <= grid_start || start >= grid_end {
        return None;
    }

    // Out-of-window boundaries clamp to the edge slots.
    let start_slot = slot_index_of(slots, start).unwrap_or(0);
    let end_slot = slot_index_of(slots, end).unwrap_or(slots.len() - 1);
    let row_span = walk_row_span(slots, start_slot, end_slot, end);

    Some(DisplaySpan {
        staff_id,
        booking_id,
        kind,
        start_slot,
        end_slot,
        actual_start: start,
        actual_end: end,
        row_span,
    })
}

/// Counts the slots a span fully consumes: walk forward from the start slot
/// and stop at the first slot whose end the literal end instant does not
/// reach. A span that dies inside its own start slot still occupies that
/// one cell.
fn walk_row_span(
    slots: &[GridSlot],
    start_slot: usize,
    end_slot: usize,
    actual_end: DateTime<Utc>,
) -> usize {
    let mut consumed = 0;
    for index in start_slot..=end_slot {
        if actual_end < slots[index].end {
            break;
        }
        consumed += 1;
    }
    consumed.max(1)
}

/// Role and shift eligibility for one staff member against the target
/// service.
fn is_eligible(service: &Service, staff: &Staff, weekday: chrono::Weekday) -> bool {
    if !staff.is_schedulable() {
        return false;
    }
    let role_ok = match service.kind {
        ServiceKind::Job => staff.role == StaffRole::Staff,
        ServiceKind::Trick => staff.role == StaffRole::Doctor && service.allows_doctor(staff.id),
    };
    role_ok && !staff.schedule.day(weekday).is_empty()
}

fn classify_row(
    target: ServiceKind,
    slots: &[GridSlot],
    spans: &[DisplaySpan],
    day: &DaySchedule,
    cutoff: Option<DateTime<Utc>>,
    total: Duration,
) -> Vec<GridCell> {
    slots
        .iter()
        .map(|slot| {
            let trick_count = spans
                .iter()
                .filter(|span| span.kind == ServiceKind::Trick)
                .filter(|span| slot.start <= span.actual_start && span.actual_start < slot.end)
                .count();

            // Working-hours and past-time filters override occupancy.
            let state = if !day.covers(slot.start_min, slot.end_min) {
                CellState::OutOfHours
            } else if cutoff.is_some_and(|now| slot.start < now) {
                CellState::Past
            } else {
                match target {
                    ServiceKind::Job => classify_job_cell(slot, spans),
                    ServiceKind::Trick => {
                        if trick_count >= TRICK_SLOT_CAPACITY {
                            CellState::AtCapacity
                        } else {
                            CellState::Free
                        }
                    }
                }
            };

            let (proposed_start, proposed_end) = if state.is_selectable() {
                let start = resolve_start(slot, spans);
                (Some(start), Some(start + total))
            } else {
                (None, None)
            };

            GridCell {
                slot_index: slot.index,
                state,
                proposed_start,
                proposed_end,
                trick_count,
            }
        })
        .collect()
}

/// JOB cells are exclusive per technician: a span reaching the slot's end
/// blocks it outright; one dying inside the slot leaves the tail bookable.
fn classify_job_cell(slot: &GridSlot, spans: &[DisplaySpan]) -> CellState {
    let fully_covered = spans
        .iter()
        .any(|span| span.actual_start < slot.end && span.actual_end >= slot.end);
    if fully_covered {
        return CellState::OccupiedExclusive;
    }

    let ends_inside = spans
        .iter()
        .any(|span| slot.start < span.actual_end && span.actual_end < slot.end);
    if ends_inside {
        return CellState::OccupiedWithRoom;
    }

    CellState::Free
}

/// Proposed start for a selectable cell: the trailing end of the latest
/// same-staff span dying within the slot (boundary included, so a span
/// running to the slot's exact end pushes the proposal past itself),
/// otherwise the slot boundary.
fn resolve_start(slot: &GridSlot, spans: &[DisplaySpan]) -> DateTime<Utc> {
    spans
        .iter()
        .map(|span| span.actual_end)
        .filter(|end| slot.start <= *end && *end <= slot.end)
        .max()
        .unwrap_or(slot.start)
}
