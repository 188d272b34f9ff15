//! # Booking Handlers
//!
//! Request processing for the booking lifecycle: creation with atomic staff
//! assignment, status transitions, manual staff add/remove, and deletion.
//!
//! Handlers validate and orchestrate. They load the relevant state through
//! `booksync_db`, ask `booksync_engine` for decisions (conflict checks,
//! assignment plans, status transitions), then persist the outcome. The
//! conflict checks run here are advisory; the transactional guards inside
//! the repositories re-validate everything under row locks and are what
//! actually protect the invariants under concurrency.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use booksync_core::{
    errors::BookingError,
    models::{
        assignment::{AssignmentPlan, RemoveStaffResponse, StaffAssignment},
        booking::{
            AddStaffRequest, Booking, BookingDetail, BookingStatus, CreateBookingRequest,
            DeleteBookingResponse, UpdateBookingStatusRequest,
        },
        customer::Customer,
        interval::TimeInterval,
        service::{Service, ServiceKind},
        staff::{Staff, StaffRole},
    },
};
use booksync_engine::{assign, conflict};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{middleware::error_handling::AppError, ApiState};

/// Query parameters for the delete booking endpoint
#[derive(Debug, Deserialize)]
pub struct DeleteBookingQuery {
    /// When true the booking row is removed outright instead of tombstoned
    pub hard: Option<bool>,
}

/// Creates a booking together with its staff assignments
///
/// # Endpoint
///
/// ```text
/// POST /api/bookings
/// ```
///
/// The service kind picks the path: TRICK bookings are auto-assigned their
/// technician headcount over the combined prep-job window and conflict-check
/// the chosen doctor; JOB bookings bind the single caller-supplied
/// technician over the booking window. Booking and assignments commit in one
/// transaction or not at all.
#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<BookingDetail>, AppError> {
    let window = TimeInterval::new(payload.appointment_date, payload.time_end)?;

    let customer = fetch_customer(&state, payload.customer_id).await?;
    let service = fetch_service(&state, payload.service_id).await?;

    let booking = match service.kind {
        ServiceKind::Trick => create_trick_booking(&state, &payload, &service, window).await?,
        ServiceKind::Job => create_job_booking(&state, &payload, &service, window).await?,
    };

    let assignments = fetch_assignments(&state, booking.id).await?;

    Ok(Json(BookingDetail {
        booking,
        customer,
        service,
        assignments,
    }))
}

/// Creates a TRICK booking: validates the doctor, advisory-checks their
/// calendar, plans technician assignments over the prep window, and commits.
async fn create_trick_booking(
    state: &ApiState,
    payload: &CreateBookingRequest,
    service: &Service,
    window: TimeInterval,
) -> Result<Booking, AppError> {
    let doctor_id = payload.doctor_id.ok_or_else(|| {
        BookingError::Validation("a TRICK booking requires a doctor_id".to_string())
    })?;

    let doctor = fetch_staff(state, doctor_id).await?;
    if doctor.role != StaffRole::Doctor {
        return Err(AppError(BookingError::Validation(format!(
            "staff {} does not have the DOCTOR role",
            doctor_id
        ))));
    }
    if !doctor.is_schedulable() {
        return Err(AppError(BookingError::Validation(format!(
            "doctor {} is not schedulable",
            doctor_id
        ))));
    }
    if !service.allows_doctor(doctor_id) {
        return Err(AppError(BookingError::Validation(format!(
            "doctor {} is not eligible for service {}",
            doctor_id, service.id
        ))));
    }

    // Advisory calendar check; the transaction re-validates under the lock.
    let doctor_bookings =
        booksync_db::repositories::booking::get_bookings_for_doctor(
            &state.db_pool,
            doctor_id,
            window.start,
            window.end,
        )
        .await
        .map_err(BookingError::Database)?
        .into_iter()
        .map(|row| row.into_model())
        .collect::<Result<Vec<_>, _>>()
        .map_err(BookingError::Database)?;

    let taken = conflict::booking_intervals(&doctor_bookings, None);
    if let Some(hit) = conflict::find_overlap(&taken, &window) {
        return Err(AppError(BookingError::Conflict(format!(
            "doctor {} already has a booking between {} and {}",
            doctor_id, hit.start, hit.end
        ))));
    }

    let jobs = resolve_jobs(state, service).await?;
    let plans = plan_for_trick(state, service, &jobs, payload.appointment_date).await?;

    let new = booksync_db::models::NewBooking {
        customer_id: payload.customer_id,
        service_id: service.id,
        doctor_id: Some(doctor_id),
        appointment_date: payload.appointment_date,
        time_end: payload.time_end,
        doctor_date: Some(payload.time_end - service.duration()),
        priority: payload.priority,
        kind: ServiceKind::Trick,
    };

    let booking = booksync_db::repositories::booking::create_booking_with_assignments(
        &state.db_pool,
        &new,
        &plans,
    )
    .await?;

    Ok(booking)
}

/// Creates a JOB booking bound to the caller-supplied technician. The
/// technician rides in on `doctor_id` but lands in the assignment row; the
/// booking's own doctor column stays empty.
async fn create_job_booking(
    state: &ApiState,
    payload: &CreateBookingRequest,
    service: &Service,
    window: TimeInterval,
) -> Result<Booking, AppError> {
    let staff_id = payload.doctor_id.ok_or_else(|| {
        BookingError::Validation(
            "a JOB booking requires the technician in doctor_id".to_string(),
        )
    })?;

    let staff = fetch_staff(state, staff_id).await?;
    if staff.role != StaffRole::Staff {
        return Err(AppError(BookingError::Validation(format!(
            "staff {} does not have the STAFF role",
            staff_id
        ))));
    }
    if !staff.is_schedulable() {
        return Err(AppError(BookingError::Validation(format!(
            "staff {} is not schedulable",
            staff_id
        ))));
    }

    let candidate = load_candidate(state, staff, window).await?;
    let plan = assign::plan_direct_assignment(service, &candidate, window, None)?;

    let new = booksync_db::models::NewBooking {
        customer_id: payload.customer_id,
        service_id: service.id,
        doctor_id: None,
        appointment_date: payload.appointment_date,
        time_end: payload.time_end,
        doctor_date: None,
        priority: payload.priority,
        kind: ServiceKind::Job,
    };

    let booking = booksync_db::repositories::booking::create_booking_with_assignments(
        &state.db_pool,
        &new,
        &[plan],
    )
    .await?;

    Ok(booking)
}

/// Fetches one populated booking
///
/// # Endpoint
///
/// ```text
/// GET /api/bookings/:id
/// ```
#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDetail>, AppError> {
    let booking = fetch_booking(&state, id).await?;
    let customer = fetch_customer(&state, booking.customer_id).await?;
    let service = fetch_service(&state, booking.service_id).await?;
    let assignments = fetch_assignments(&state, booking.id).await?;

    Ok(Json(BookingDetail {
        booking,
        customer,
        service,
        assignments,
    }))
}

/// Applies a status transition to a booking
///
/// # Endpoint
///
/// ```text
/// PUT /api/bookings/:id/status
/// ```
///
/// The requested status arrives as its wire name and is parsed, not
/// trusted. Forward transitions capture their event timestamp (explicit or
/// clock-now); cancelling requires a reason.
#[axum::debug_handler]
pub async fn update_booking_status(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let requested: BookingStatus = payload.status.parse()?;

    let mut booking = fetch_booking(&state, id).await?;
    booksync_engine::status::apply_transition(
        &mut booking,
        requested,
        payload.timestamp,
        payload.reason.as_deref(),
        state.clock.as_ref(),
    )?;

    let updated = booksync_db::repositories::booking::update_booking_status(
        &state.db_pool,
        &booking,
    )
    .await
    .map_err(BookingError::Database)?
    .into_model()
    .map_err(BookingError::Database)?;

    Ok(Json(updated))
}

/// Adds a staff member to an existing booking
///
/// # Endpoint
///
/// ```text
/// POST /api/bookings/:id/staff
/// ```
///
/// Idempotent per (booking, staff): re-adding an already-assigned member
/// returns the existing assignment unchanged.
#[axum::debug_handler]
pub async fn add_staff_to_booking(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddStaffRequest>,
) -> Result<Json<StaffAssignment>, AppError> {
    let window = TimeInterval::new(payload.time_start, payload.time_end)?;

    let booking = fetch_booking(&state, id).await?;
    let service = fetch_service(&state, booking.service_id).await?;

    let staff = fetch_staff(&state, payload.staff_id).await?;
    if !staff.is_schedulable() {
        return Err(AppError(BookingError::Validation(format!(
            "staff {} is not schedulable",
            payload.staff_id
        ))));
    }

    // Excluding this booking keeps an existing assignment from colliding
    // with itself; the repository then resolves it idempotently.
    let candidate = load_candidate(&state, staff, window).await?;
    let plan = assign::plan_direct_assignment(&service, &candidate, window, Some(booking.id))?;

    let assignment = booksync_db::repositories::assignment::add_staff_to_booking(
        &state.db_pool,
        &booking,
        &plan,
    )
    .await?;

    Ok(Json(assignment))
}

/// Removes a staff member's assignment from a booking
///
/// # Endpoint
///
/// ```text
/// DELETE /api/bookings/:id/staff/:staff_id
/// ```
#[axum::debug_handler]
pub async fn remove_staff_from_booking(
    State(state): State<Arc<ApiState>>,
    Path((id, staff_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RemoveStaffResponse>, AppError> {
    let booking = fetch_booking(&state, id).await?;

    let assignment = booksync_db::repositories::assignment::remove_staff_from_booking(
        &state.db_pool,
        booking.id,
        staff_id,
    )
    .await?;

    Ok(Json(RemoveStaffResponse {
        booking_id: assignment.booking_id,
        staff_id: assignment.staff_id,
        removed_at: state.clock.now(),
    }))
}

/// Deletes a booking
///
/// # Endpoint
///
/// ```text
/// DELETE /api/bookings/:id?hard=true
/// ```
///
/// Soft delete by default: the booking is tombstoned and releases its
/// assignments. `?hard=true` removes the rows outright.
#[axum::debug_handler]
pub async fn delete_booking(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteBookingQuery>,
) -> Result<Json<DeleteBookingResponse>, AppError> {
    let booking = fetch_booking(&state, id).await?;
    let hard = query.hard.unwrap_or(false);

    if hard {
        booksync_db::repositories::booking::hard_delete_booking(&state.db_pool, booking.id)
            .await
            .map_err(BookingError::Database)?;
    } else {
        booksync_db::repositories::booking::soft_delete_booking(&state.db_pool, booking.id)
            .await
            .map_err(BookingError::Database)?;
    }

    Ok(Json(DeleteBookingResponse {
        id: booking.id,
        deleted_at: state.clock.now(),
        hard,
    }))
}

/// Fetches a live booking or reports it missing. Soft-deleted bookings are
/// indistinguishable from absent ones to callers.
async fn fetch_booking(state: &ApiState, id: Uuid) -> Result<Booking, AppError> {
    let booking = booksync_db::repositories::booking::get_booking_by_id(&state.db_pool, id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| BookingError::NotFound(format!("Booking with ID {} not found", id)))?
        .into_model()
        .map_err(BookingError::Database)?;

    if booking.is_deleted {
        return Err(AppError(BookingError::NotFound(format!(
            "Booking with ID {} not found",
            id
        ))));
    }
    Ok(booking)
}

async fn fetch_customer(state: &ApiState, id: Uuid) -> Result<Customer, AppError> {
    let customer = booksync_db::repositories::customer::get_customer_by_id(&state.db_pool, id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| BookingError::NotFound(format!("Customer with ID {} not found", id)))?
        .into_model();

    if customer.is_deleted {
        return Err(AppError(BookingError::NotFound(format!(
            "Customer with ID {} not found",
            id
        ))));
    }
    Ok(customer)
}

pub(crate) async fn fetch_service(state: &ApiState, id: Uuid) -> Result<Service, AppError> {
    let service = booksync_db::repositories::service::get_service_by_id(&state.db_pool, id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| BookingError::NotFound(format!("Service with ID {} not found", id)))?
        .into_model()
        .map_err(BookingError::Database)?;

    if service.is_deleted {
        return Err(AppError(BookingError::NotFound(format!(
            "Service with ID {} not found",
            id
        ))));
    }
    Ok(service)
}

async fn fetch_staff(state: &ApiState, id: Uuid) -> Result<Staff, AppError> {
    let staff = booksync_db::repositories::staff::get_staff_by_id(&state.db_pool, id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| BookingError::NotFound(format!("Staff with ID {} not found", id)))?
        .into_model()
        .map_err(BookingError::Database)?;

    Ok(staff)
}

async fn fetch_assignments(
    state: &ApiState,
    booking_id: Uuid,
) -> Result<Vec<StaffAssignment>, AppError> {
    let assignments = booksync_db::repositories::assignment::get_assignments_for_booking(
        &state.db_pool,
        booking_id,
    )
    .await
    .map_err(BookingError::Database)?
    .into_iter()
    .map(|row| row.into_model())
    .collect();

    Ok(assignments)
}

/// Resolves a service's prep jobs, preserving `job_ids` order. A missing or
/// soft-deleted job is a `NotFound`; the repository already filters deleted
/// rows out.
pub(crate) async fn resolve_jobs(
    state: &ApiState,
    service: &Service,
) -> Result<Vec<Service>, AppError> {
    if service.job_ids.is_empty() {
        return Ok(Vec::new());
    }

    let fetched = booksync_db::repositories::service::get_services_by_ids(
        &state.db_pool,
        &service.job_ids,
    )
    .await
    .map_err(BookingError::Database)?;

    let mut by_id = HashMap::with_capacity(fetched.len());
    for row in fetched {
        let job = row.into_model().map_err(BookingError::Database)?;
        by_id.insert(job.id, job);
    }

    let mut jobs = Vec::with_capacity(service.job_ids.len());
    for job_id in &service.job_ids {
        let job = by_id.remove(job_id).ok_or_else(|| {
            BookingError::NotFound(format!(
                "Prep job {} of service {} not found",
                job_id, service.id
            ))
        })?;
        jobs.push(job);
    }
    Ok(jobs)
}

/// Plans the technician assignments for a TRICK booking: loads the STAFF
/// pool in creation order together with each member's assignments over the
/// prep window, then hands the decision to the planner.
async fn plan_for_trick(
    state: &ApiState,
    service: &Service,
    jobs: &[Service],
    appointment_date: DateTime<Utc>,
) -> Result<Vec<AssignmentPlan>, AppError> {
    if service.count_staff <= 0 || jobs.is_empty() {
        return Ok(Vec::new());
    }

    let prep_end = appointment_date + Duration::seconds(assign::combined_job_seconds(jobs));

    let rows = booksync_db::repositories::staff::get_schedulable_staff_by_role(
        &state.db_pool,
        StaffRole::Staff.as_str(),
    )
    .await
    .map_err(BookingError::Database)?;

    let mut pool = Vec::with_capacity(rows.len());
    for row in rows {
        let member = row.into_model().map_err(BookingError::Database)?;
        let window = TimeInterval {
            start: appointment_date,
            end: prep_end,
        };
        let candidate = load_candidate(state, member, window).await?;
        pool.push(candidate);
    }

    let plans = assign::plan_trick_assignments(service, jobs, appointment_date, &pool, None)?;
    Ok(plans)
}

/// Pairs a staff member with their assignments overlapping `window`, the
/// shape the planner consumes.
async fn load_candidate(
    state: &ApiState,
    staff: Staff,
    window: TimeInterval,
) -> Result<assign::CandidateStaff, AppError> {
    let assignments = booksync_db::repositories::assignment::get_assignments_for_staff(
        &state.db_pool,
        staff.id,
        window.start,
        window.end,
    )
    .await
    .map_err(BookingError::Database)?
    .into_iter()
    .map(|row| row.into_model())
    .collect();

    Ok(assign::CandidateStaff { staff, assignments })
}
