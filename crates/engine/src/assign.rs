//! Staff auto-assignment planning.
//!
//! A TRICK procedure needs `count_staff` technicians for the combined
//! duration of its prep jobs before the doctor takes over. Planning walks
//! the candidate pool in creation order and accepts the first conflict-free
//! members; the plans are then committed atomically with the booking by the
//! persistence layer, which re-runs these checks under row locks.

use booksync_core::errors::{BookingError, BookingResult};
use booksync_core::models::{
    assignment::{AssignmentPlan, StaffAssignment},
    interval::TimeInterval,
    service::Service,
    staff::Staff,
};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::conflict;

/// A staff member considered for assignment, together with the assignments
/// already committed against them.
#[derive(Debug, Clone)]
pub struct CandidateStaff {
    pub staff: Staff,
    pub assignments: Vec<StaffAssignment>,
}

/// Combined duration of a TRICK's linked prep jobs, in seconds.
pub fn combined_job_seconds(jobs: &[Service]) -> i64 {
    jobs.iter().map(|job| job.time).sum()
}

/// Plans `service.count_staff` technician assignments covering the full
/// combined window of `jobs`, starting at `appointment_date`.
///
/// The pool is walked in the order given (creation order); each candidate
/// whose existing assignments leave the window free is accepted until the
/// headcount is met. `exclude_booking` lets a re-plan for an existing
/// booking ignore that booking's own assignments.
///
/// Returns `Capacity` when the pool is empty or the headcount cannot be
/// met; in that case nothing may be committed, including the booking the
/// plans were meant for.
pub fn plan_trick_assignments(
    service: &Service,
    jobs: &[Service],
    appointment_date: DateTime<Utc>,
    pool: &[CandidateStaff],
    exclude_booking: Option<Uuid>,
) -> BookingResult<Vec<AssignmentPlan>> {
    let required = service.count_staff.max(0) as usize;
    if required == 0 || jobs.is_empty() {
        return Ok(Vec::new());
    }

    let total = combined_job_seconds(jobs);
    let window = TimeInterval::new(appointment_date, appointment_date + Duration::seconds(total))?;

    if pool.is_empty() {
        return Err(BookingError::Capacity("no staff available".to_string()));
    }

    let service_ids: Vec<Uuid> = jobs.iter().map(|job| job.id).collect();
    let mut plans = Vec::with_capacity(required);
    for candidate in pool {
        if plans.len() == required {
            break;
        }
        let taken = conflict::assignment_intervals(&candidate.assignments, exclude_booking);
        if !conflict::overlaps_any(&taken, &window) {
            plans.push(AssignmentPlan {
                staff_id: candidate.staff.id,
                service_ids: service_ids.clone(),
                window,
            });
        }
    }

    if plans.len() < required {
        return Err(BookingError::Capacity(format!(
            "service requires {} staff but only {} free between {} and {}",
            required,
            plans.len(),
            window.start,
            window.end,
        )));
    }

    debug!(
        "Planned {} assignments for service {} over {}..{}",
        plans.len(),
        service.id,
        window.start,
        window.end
    );
    Ok(plans)
}

/// Plans a single caller-chosen staff assignment over `window`, the path
/// used for JOB bookings and for adding staff to an existing booking.
///
/// Same conflict discipline as auto-assignment, headcount fixed at one.
pub fn plan_direct_assignment(
    service: &Service,
    candidate: &CandidateStaff,
    window: TimeInterval,
    exclude_booking: Option<Uuid>,
) -> BookingResult<AssignmentPlan> {
    let taken = conflict::assignment_intervals(&candidate.assignments, exclude_booking);
    if let Some(hit) = conflict::find_overlap(&taken, &window) {
        return Err(BookingError::Conflict(format!(
            "staff {} is already assigned between {} and {}",
            candidate.staff.id, hit.start, hit.end
        )));
    }

    let service_ids = if service.job_ids.is_empty() {
        vec![service.id]
    } else {
        service.job_ids.clone()
    };
    Ok(AssignmentPlan {
        staff_id: candidate.staff.id,
        service_ids,
        window,
    })
}
