use axum::Json;
use booksync_core::{
    errors::BookingError,
    models::{
        assignment::StaffAssignment,
        booking::{
            AddStaffRequest, Booking, BookingStatus, CreateBookingRequest,
            UpdateBookingStatusRequest,
        },
        interval::TimeInterval,
        service::ServiceKind,
        staff::{StaffRole, WeekSchedule},
    },
};
use booksync_db::models::{
    DbBooking, DbCustomer, DbService, DbStaff, DbStaffAssignment, NewBooking,
};
use booksync_engine::{
    assign,
    clock::{Clock, FixedClock},
    conflict,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use mockall::predicate;
use std::collections::HashMap;
use uuid::Uuid;

use crate::test_utils::TestContext;
use booksync_api::middleware::error_handling::AppError;

fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, hour, min, 0).unwrap()
}

fn db_customer(id: Uuid) -> DbCustomer {
    DbCustomer {
        id,
        name: "Ana Petrova".to_string(),
        phone: Some("555-0100".to_string()),
        is_deleted: false,
        created_at: at(8, 0),
    }
}

fn db_staff(id: Uuid, role: &str) -> DbStaff {
    DbStaff {
        id,
        name: format!("staff-{}", id),
        role: role.to_string(),
        active: true,
        schedule: sqlx::types::Json(WeekSchedule::default()),
        is_deleted: false,
        created_at: at(8, 0),
    }
}

fn db_trick_service(id: Uuid, job_ids: Vec<Uuid>, count_staff: i32) -> DbService {
    DbService {
        id,
        name: "Laser package".to_string(),
        kind: "TRICK".to_string(),
        time: 1800,
        job_ids,
        count_staff,
        staff_ids: vec![],
        is_deleted: false,
        created_at: at(8, 0),
    }
}

fn db_job_service(id: Uuid, time: i64) -> DbService {
    DbService {
        id,
        name: "Prep".to_string(),
        kind: "JOB".to_string(),
        time,
        job_ids: vec![],
        count_staff: 0,
        staff_ids: vec![],
        is_deleted: false,
        created_at: at(8, 0),
    }
}

fn db_booking(id: Uuid, status: &str) -> DbBooking {
    DbBooking {
        id,
        customer_id: Uuid::new_v4(),
        service_id: Uuid::new_v4(),
        doctor_id: None,
        appointment_date: at(10, 0),
        time_end: at(11, 0),
        doctor_date: None,
        status: status.to_string(),
        priority: false,
        coming_time: None,
        doing_time: None,
        complete_time: None,
        cancel_reason: None,
        staff_assignments: vec![],
        is_deleted: false,
        created_at: at(8, 0),
    }
}

fn db_assignment(
    booking_id: Uuid,
    staff_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> DbStaffAssignment {
    DbStaffAssignment {
        id: Uuid::new_v4(),
        booking_id,
        staff_id,
        service_ids: vec![Uuid::new_v4()],
        time_start: start,
        time_end: end,
        created_at: at(8, 0),
    }
}

fn db_from_booking(booking: &Booking) -> DbBooking {
    DbBooking {
        id: booking.id,
        customer_id: booking.customer_id,
        service_id: booking.service_id,
        doctor_id: booking.doctor_id,
        appointment_date: booking.appointment_date,
        time_end: booking.time_end,
        doctor_date: booking.doctor_date,
        status: booking.status.as_str().to_string(),
        priority: booking.priority,
        coming_time: booking.coming_time,
        doing_time: booking.doing_time,
        complete_time: booking.complete_time,
        cancel_reason: booking.cancel_reason.clone(),
        staff_assignments: booking.staff_assignments.clone(),
        is_deleted: booking.is_deleted,
        created_at: booking.created_at,
    }
}

fn booking_from_new(id: Uuid, new: &NewBooking) -> Booking {
    Booking {
        id,
        customer_id: new.customer_id,
        service_id: new.service_id,
        doctor_id: new.doctor_id,
        appointment_date: new.appointment_date,
        time_end: new.time_end,
        doctor_date: new.doctor_date,
        status: BookingStatus::Booked,
        priority: new.priority,
        coming_time: None,
        doing_time: None,
        complete_time: None,
        cancel_reason: None,
        staff_assignments: vec![],
        is_deleted: false,
        created_at: at(9, 0),
    }
}

// Create test wrappers for handlers that directly test what we want

// Mirrors the TRICK creation flow with the repositories swapped for mocks.
async fn test_create_trick_wrapper(
    ctx: &mut TestContext,
    payload: CreateBookingRequest,
) -> Result<Json<Booking>, AppError> {
    let window = TimeInterval::new(payload.appointment_date, payload.time_end)?;

    let customer = ctx
        .customer_repo
        .get_customer_by_id(payload.customer_id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| {
            BookingError::NotFound(format!("Customer with ID {} not found", payload.customer_id))
        })?
        .into_model();
    if customer.is_deleted {
        return Err(AppError(BookingError::NotFound(format!(
            "Customer with ID {} not found",
            payload.customer_id
        ))));
    }

    let service = ctx
        .service_repo
        .get_service_by_id(payload.service_id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| {
            BookingError::NotFound(format!("Service with ID {} not found", payload.service_id))
        })?
        .into_model()
        .map_err(BookingError::Database)?;

    let doctor_id = payload.doctor_id.ok_or_else(|| {
        BookingError::Validation("a TRICK booking requires a doctor_id".to_string())
    })?;
    let doctor = ctx
        .staff_repo
        .get_staff_by_id(doctor_id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| {
            BookingError::NotFound(format!("Staff with ID {} not found", doctor_id))
        })?
        .into_model()
        .map_err(BookingError::Database)?;
    if doctor.role != StaffRole::Doctor {
        return Err(AppError(BookingError::Validation(format!(
            "staff {} does not have the DOCTOR role",
            doctor_id
        ))));
    }
    if !service.allows_doctor(doctor_id) {
        return Err(AppError(BookingError::Validation(format!(
            "doctor {} is not eligible for service {}",
            doctor_id, service.id
        ))));
    }

    let doctor_bookings = ctx
        .booking_repo
        .get_bookings_for_doctor(doctor_id, window.start, window.end)
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

    // Resolve prep jobs in declared order
    let jobs = if service.job_ids.is_empty() {
        Vec::new()
    } else {
        let fetched = ctx
            .service_repo
            .get_services_by_ids(service.job_ids.clone())
            .await
            .map_err(BookingError::Database)?;
        let mut by_id = HashMap::new();
        for row in fetched {
            let job = row.into_model().map_err(BookingError::Database)?;
            by_id.insert(job.id, job);
        }
        let mut jobs = Vec::new();
        for job_id in &service.job_ids {
            jobs.push(by_id.remove(job_id).ok_or_else(|| {
                BookingError::NotFound(format!("Prep job {} not found", job_id))
            })?);
        }
        jobs
    };

    // Plan technician assignments over the combined prep window
    let plans = if service.count_staff > 0 && !jobs.is_empty() {
        let prep_end =
            payload.appointment_date + Duration::seconds(assign::combined_job_seconds(&jobs));
        let rows = ctx
            .staff_repo
            .get_schedulable_staff_by_role("STAFF")
            .await
            .map_err(BookingError::Database)?;
        let mut pool = Vec::new();
        for row in rows {
            let member = row.into_model().map_err(BookingError::Database)?;
            let assignments = ctx
                .assignment_repo
                .get_assignments_for_staff(member.id, payload.appointment_date, prep_end)
                .await
                .map_err(BookingError::Database)?
                .into_iter()
                .map(|a| a.into_model())
                .collect();
            pool.push(assign::CandidateStaff {
                staff: member,
                assignments,
            });
        }
        assign::plan_trick_assignments(&service, &jobs, payload.appointment_date, &pool, None)?
    } else {
        Vec::new()
    };

    let new = NewBooking {
        customer_id: payload.customer_id,
        service_id: service.id,
        doctor_id: Some(doctor_id),
        appointment_date: payload.appointment_date,
        time_end: payload.time_end,
        doctor_date: Some(payload.time_end - service.duration()),
        priority: payload.priority,
        kind: ServiceKind::Trick,
    };
    let booking = ctx
        .booking_repo
        .create_booking_with_assignments(new, plans)
        .await?;

    Ok(Json(booking))
}

// Mirrors the JOB creation flow: single caller-chosen technician over the
// booking window.
async fn test_create_job_wrapper(
    ctx: &mut TestContext,
    payload: CreateBookingRequest,
) -> Result<Json<Booking>, AppError> {
    let window = TimeInterval::new(payload.appointment_date, payload.time_end)?;

    let service = ctx
        .service_repo
        .get_service_by_id(payload.service_id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| {
            BookingError::NotFound(format!("Service with ID {} not found", payload.service_id))
        })?
        .into_model()
        .map_err(BookingError::Database)?;

    let staff_id = payload.doctor_id.ok_or_else(|| {
        BookingError::Validation("a JOB booking requires the technician in doctor_id".to_string())
    })?;
    let staff = ctx
        .staff_repo
        .get_staff_by_id(staff_id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| BookingError::NotFound(format!("Staff with ID {} not found", staff_id)))?
        .into_model()
        .map_err(BookingError::Database)?;
    if staff.role != StaffRole::Staff {
        return Err(AppError(BookingError::Validation(format!(
            "staff {} does not have the STAFF role",
            staff_id
        ))));
    }

    let assignments = ctx
        .assignment_repo
        .get_assignments_for_staff(staff.id, window.start, window.end)
        .await
        .map_err(BookingError::Database)?
        .into_iter()
        .map(|a| a.into_model())
        .collect();
    let candidate = assign::CandidateStaff { staff, assignments };
    let plan = assign::plan_direct_assignment(&service, &candidate, window, None)?;

    let new = NewBooking {
        customer_id: payload.customer_id,
        service_id: service.id,
        doctor_id: None,
        appointment_date: payload.appointment_date,
        time_end: payload.time_end,
        doctor_date: None,
        priority: payload.priority,
        kind: ServiceKind::Job,
    };
    let booking = ctx
        .booking_repo
        .create_booking_with_assignments(new, vec![plan])
        .await?;

    Ok(Json(booking))
}

// Mirrors the status update flow.
async fn test_update_status_wrapper(
    ctx: &mut TestContext,
    id: Uuid,
    payload: UpdateBookingStatusRequest,
    clock: &dyn Clock,
) -> Result<Json<Booking>, AppError> {
    let requested: BookingStatus = payload.status.parse()?;

    let mut booking = ctx
        .booking_repo
        .get_booking_by_id(id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| BookingError::NotFound(format!("Booking with ID {} not found", id)))?
        .into_model()
        .map_err(BookingError::Database)?;

    booksync_engine::status::apply_transition(
        &mut booking,
        requested,
        payload.timestamp,
        payload.reason.as_deref(),
        clock,
    )?;

    let updated = ctx
        .booking_repo
        .update_booking_status(booking)
        .await
        .map_err(BookingError::Database)?
        .into_model()
        .map_err(BookingError::Database)?;

    Ok(Json(updated))
}

// Mirrors the add-staff flow, excluding the target booking from the
// conflict check so re-adding reaches the idempotent repository path.
async fn test_add_staff_wrapper(
    ctx: &mut TestContext,
    id: Uuid,
    payload: AddStaffRequest,
) -> Result<Json<StaffAssignment>, AppError> {
    let window = TimeInterval::new(payload.time_start, payload.time_end)?;

    let booking = ctx
        .booking_repo
        .get_booking_by_id(id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| BookingError::NotFound(format!("Booking with ID {} not found", id)))?
        .into_model()
        .map_err(BookingError::Database)?;

    let service = ctx
        .service_repo
        .get_service_by_id(booking.service_id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| {
            BookingError::NotFound(format!("Service with ID {} not found", booking.service_id))
        })?
        .into_model()
        .map_err(BookingError::Database)?;

    let staff = ctx
        .staff_repo
        .get_staff_by_id(payload.staff_id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| {
            BookingError::NotFound(format!("Staff with ID {} not found", payload.staff_id))
        })?
        .into_model()
        .map_err(BookingError::Database)?;

    let assignments = ctx
        .assignment_repo
        .get_assignments_for_staff(staff.id, window.start, window.end)
        .await
        .map_err(BookingError::Database)?
        .into_iter()
        .map(|a| a.into_model())
        .collect();
    let candidate = assign::CandidateStaff { staff, assignments };
    let plan = assign::plan_direct_assignment(&service, &candidate, window, Some(booking.id))?;

    let assignment = ctx
        .assignment_repo
        .add_staff_to_booking(booking, plan)
        .await?;

    Ok(Json(assignment))
}

#[tokio::test]
async fn test_create_trick_booking_success() {
    let mut ctx = TestContext::new();
    let customer_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let job_a = Uuid::new_v4();
    let job_b = Uuid::new_v4();
    let staff_a = Uuid::new_v4();
    let staff_b = Uuid::new_v4();
    let booking_id = Uuid::new_v4();

    ctx.customer_repo
        .expect_get_customer_by_id()
        .with(predicate::eq(customer_id))
        .returning(move |id| Ok(Some(db_customer(id))));

    ctx.service_repo
        .expect_get_service_by_id()
        .with(predicate::eq(service_id))
        .returning(move |id| Ok(Some(db_trick_service(id, vec![job_a, job_b], 2))));

    ctx.staff_repo
        .expect_get_staff_by_id()
        .with(predicate::eq(doctor_id))
        .returning(move |id| Ok(Some(db_staff(id, "DOCTOR"))));

    ctx.booking_repo
        .expect_get_bookings_for_doctor()
        .with(
            predicate::eq(doctor_id),
            predicate::always(),
            predicate::always(),
        )
        .returning(|_, _, _| Ok(vec![]));

    ctx.service_repo
        .expect_get_services_by_ids()
        .with(predicate::eq(vec![job_a, job_b]))
        .returning(move |_| Ok(vec![db_job_service(job_a, 1800), db_job_service(job_b, 1800)]));

    ctx.staff_repo
        .expect_get_schedulable_staff_by_role()
        .with(predicate::eq("STAFF"))
        .returning(move |_| Ok(vec![db_staff(staff_a, "STAFF"), db_staff(staff_b, "STAFF")]));

    ctx.assignment_repo
        .expect_get_assignments_for_staff()
        .times(2)
        .returning(|_, _, _| Ok(vec![]));

    // Two plans, creation order, both carrying every job over the full
    // 10:00-11:00 prep window; doctor slice 11:00-11:30.
    ctx.booking_repo
        .expect_create_booking_with_assignments()
        .withf(move |new, plans| {
            new.doctor_id == Some(doctor_id)
                && new.doctor_date == Some(at(11, 0))
                && new.kind == ServiceKind::Trick
                && plans.len() == 2
                && plans[0].staff_id == staff_a
                && plans[1].staff_id == staff_b
                && plans.iter().all(|p| {
                    p.service_ids == vec![job_a, job_b]
                        && p.window.start == at(10, 0)
                        && p.window.end == at(11, 0)
                })
        })
        .returning(move |new, _| Ok(booking_from_new(booking_id, &new)));

    let payload = CreateBookingRequest {
        customer_id,
        service_id,
        appointment_date: at(10, 0),
        time_end: at(11, 30),
        priority: false,
        doctor_id: Some(doctor_id),
    };

    let result = test_create_trick_wrapper(&mut ctx, payload).await;

    assert!(result.is_ok());
    let booking = result.unwrap().0;
    assert_eq!(booking.id, booking_id);
    assert_eq!(booking.doctor_id, Some(doctor_id));
    assert_eq!(booking.status, BookingStatus::Booked);
}

#[tokio::test]
async fn test_create_trick_booking_requires_doctor() {
    let mut ctx = TestContext::new();
    let customer_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();

    ctx.customer_repo
        .expect_get_customer_by_id()
        .returning(move |id| Ok(Some(db_customer(id))));

    ctx.service_repo
        .expect_get_service_by_id()
        .returning(move |id| Ok(Some(db_trick_service(id, vec![], 0))));

    let payload = CreateBookingRequest {
        customer_id,
        service_id,
        appointment_date: at(10, 0),
        time_end: at(10, 30),
        priority: false,
        doctor_id: None,
    };

    let result = test_create_trick_wrapper(&mut ctx, payload).await;

    assert!(result.is_err());
    match result.unwrap_err().0 {
        BookingError::Validation(_) => {} // Expected
        e => panic!("Expected Validation error, got: {:?}", e),
    }
}

#[tokio::test]
async fn test_create_trick_booking_doctor_conflict() {
    let mut ctx = TestContext::new();
    let customer_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    ctx.customer_repo
        .expect_get_customer_by_id()
        .returning(move |id| Ok(Some(db_customer(id))));

    ctx.service_repo
        .expect_get_service_by_id()
        .returning(move |id| Ok(Some(db_trick_service(id, vec![], 0))));

    ctx.staff_repo
        .expect_get_staff_by_id()
        .returning(move |id| Ok(Some(db_staff(id, "DOCTOR"))));

    // Existing live booking 10:00-11:00 against the requested 10:30-11:30
    ctx.booking_repo
        .expect_get_bookings_for_doctor()
        .returning(move |doctor, _, _| {
            let mut existing = db_booking(Uuid::new_v4(), "BOOKED");
            existing.doctor_id = Some(doctor);
            Ok(vec![existing])
        });

    ctx.booking_repo
        .expect_create_booking_with_assignments()
        .times(0)
        .returning(|_, _| panic!("Should not be called"));

    let payload = CreateBookingRequest {
        customer_id,
        service_id,
        appointment_date: at(10, 30),
        time_end: at(11, 30),
        priority: false,
        doctor_id: Some(doctor_id),
    };

    let result = test_create_trick_wrapper(&mut ctx, payload).await;

    assert!(result.is_err());
    match result.unwrap_err().0 {
        BookingError::Conflict(_) => {} // Expected
        e => panic!("Expected Conflict error, got: {:?}", e),
    }
}

#[tokio::test]
async fn test_create_trick_booking_capacity_shortfall() {
    let mut ctx = TestContext::new();
    let customer_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let job_a = Uuid::new_v4();
    let staff_a = Uuid::new_v4();
    let staff_b = Uuid::new_v4();

    ctx.customer_repo
        .expect_get_customer_by_id()
        .returning(move |id| Ok(Some(db_customer(id))));

    ctx.service_repo
        .expect_get_service_by_id()
        .returning(move |id| Ok(Some(db_trick_service(id, vec![job_a], 2))));

    ctx.staff_repo
        .expect_get_staff_by_id()
        .returning(move |id| Ok(Some(db_staff(id, "DOCTOR"))));

    ctx.booking_repo
        .expect_get_bookings_for_doctor()
        .returning(|_, _, _| Ok(vec![]));

    ctx.service_repo
        .expect_get_services_by_ids()
        .returning(move |_| Ok(vec![db_job_service(job_a, 3600)]));

    ctx.staff_repo
        .expect_get_schedulable_staff_by_role()
        .returning(move |_| Ok(vec![db_staff(staff_a, "STAFF"), db_staff(staff_b, "STAFF")]));

    // First technician is free; the second is mid-job over the prep window
    ctx.assignment_repo
        .expect_get_assignments_for_staff()
        .with(
            predicate::eq(staff_a),
            predicate::always(),
            predicate::always(),
        )
        .returning(|_, _, _| Ok(vec![]));
    ctx.assignment_repo
        .expect_get_assignments_for_staff()
        .with(
            predicate::eq(staff_b),
            predicate::always(),
            predicate::always(),
        )
        .returning(move |staff, _, _| {
            Ok(vec![db_assignment(
                Uuid::new_v4(),
                staff,
                at(10, 15),
                at(10, 45),
            )])
        });

    ctx.booking_repo
        .expect_create_booking_with_assignments()
        .times(0)
        .returning(|_, _| panic!("Should not be called"));

    let payload = CreateBookingRequest {
        customer_id,
        service_id,
        appointment_date: at(10, 0),
        time_end: at(11, 30),
        priority: false,
        doctor_id: Some(doctor_id),
    };

    let result = test_create_trick_wrapper(&mut ctx, payload).await;

    assert!(result.is_err());
    match result.unwrap_err().0 {
        BookingError::Capacity(_) => {} // Expected
        e => panic!("Expected Capacity error, got: {:?}", e),
    }
}

#[tokio::test]
async fn test_create_job_booking_success() {
    let mut ctx = TestContext::new();
    let customer_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();
    let tech_id = Uuid::new_v4();
    let booking_id = Uuid::new_v4();

    ctx.service_repo
        .expect_get_service_by_id()
        .with(predicate::eq(service_id))
        .returning(move |id| Ok(Some(db_job_service(id, 3600))));

    ctx.staff_repo
        .expect_get_staff_by_id()
        .with(predicate::eq(tech_id))
        .returning(move |id| Ok(Some(db_staff(id, "STAFF"))));

    ctx.assignment_repo
        .expect_get_assignments_for_staff()
        .returning(|_, _, _| Ok(vec![]));

    // The technician binding lives in the single plan; the booking row
    // itself carries no doctor.
    ctx.booking_repo
        .expect_create_booking_with_assignments()
        .withf(move |new, plans| {
            new.doctor_id.is_none()
                && new.kind == ServiceKind::Job
                && plans.len() == 1
                && plans[0].staff_id == tech_id
                && plans[0].service_ids == vec![service_id]
                && plans[0].window.start == at(10, 0)
                && plans[0].window.end == at(11, 0)
        })
        .returning(move |new, _| Ok(booking_from_new(booking_id, &new)));

    let payload = CreateBookingRequest {
        customer_id,
        service_id,
        appointment_date: at(10, 0),
        time_end: at(11, 0),
        priority: true,
        doctor_id: Some(tech_id),
    };

    let result = test_create_job_wrapper(&mut ctx, payload).await;

    assert!(result.is_ok());
    let booking = result.unwrap().0;
    assert_eq!(booking.id, booking_id);
    assert_eq!(booking.doctor_id, None);
    assert!(booking.priority);
}

#[tokio::test]
async fn test_create_job_booking_requires_technician() {
    let mut ctx = TestContext::new();
    let service_id = Uuid::new_v4();

    ctx.service_repo
        .expect_get_service_by_id()
        .returning(move |id| Ok(Some(db_job_service(id, 3600))));

    let payload = CreateBookingRequest {
        customer_id: Uuid::new_v4(),
        service_id,
        appointment_date: at(10, 0),
        time_end: at(11, 0),
        priority: false,
        doctor_id: None,
    };

    let result = test_create_job_wrapper(&mut ctx, payload).await;

    assert!(result.is_err());
    match result.unwrap_err().0 {
        BookingError::Validation(_) => {} // Expected
        e => panic!("Expected Validation error, got: {:?}", e),
    }
}

#[tokio::test]
async fn test_update_status_arrival_captures_clock_time() {
    let mut ctx = TestContext::new();
    let id = Uuid::new_v4();
    let clock = FixedClock(at(9, 45));

    ctx.booking_repo
        .expect_get_booking_by_id()
        .with(predicate::eq(id))
        .returning(move |id| Ok(Some(db_booking(id, "BOOKED"))));

    ctx.booking_repo
        .expect_update_booking_status()
        .withf(move |b| b.status == BookingStatus::Arrived && b.coming_time == Some(at(9, 45)))
        .returning(|b| Ok(db_from_booking(&b)));

    let payload = UpdateBookingStatusRequest {
        status: "ARRIVED".to_string(),
        timestamp: None,
        reason: None,
    };

    let result = test_update_status_wrapper(&mut ctx, id, payload, &clock).await;

    assert!(result.is_ok());
    let booking = result.unwrap().0;
    assert_eq!(booking.status, BookingStatus::Arrived);
    assert_eq!(booking.coming_time, Some(at(9, 45)));
}

#[tokio::test]
async fn test_update_status_explicit_timestamp_wins() {
    let mut ctx = TestContext::new();
    let id = Uuid::new_v4();
    let clock = FixedClock(at(9, 45));

    ctx.booking_repo
        .expect_get_booking_by_id()
        .returning(move |id| Ok(Some(db_booking(id, "BOOKED"))));

    ctx.booking_repo
        .expect_update_booking_status()
        .withf(move |b| b.coming_time == Some(at(9, 30)))
        .returning(|b| Ok(db_from_booking(&b)));

    let payload = UpdateBookingStatusRequest {
        status: "ARRIVED".to_string(),
        timestamp: Some(at(9, 30)),
        reason: None,
    };

    let result = test_update_status_wrapper(&mut ctx, id, payload, &clock).await;

    assert!(result.is_ok());
    assert_eq!(result.unwrap().0.coming_time, Some(at(9, 30)));
}

#[tokio::test]
async fn test_update_status_cancel_requires_reason() {
    let mut ctx = TestContext::new();
    let id = Uuid::new_v4();
    let clock = FixedClock(at(9, 45));

    ctx.booking_repo
        .expect_get_booking_by_id()
        .returning(move |id| Ok(Some(db_booking(id, "BOOKED"))));

    ctx.booking_repo
        .expect_update_booking_status()
        .times(0)
        .returning(|b| Ok(db_from_booking(&b)));

    let payload = UpdateBookingStatusRequest {
        status: "CANCELLED".to_string(),
        timestamp: None,
        reason: None,
    };

    let result = test_update_status_wrapper(&mut ctx, id, payload, &clock).await;

    assert!(result.is_err());
    match result.unwrap_err().0 {
        BookingError::Validation(_) => {} // Expected
        e => panic!("Expected Validation error, got: {:?}", e),
    }
}

#[tokio::test]
async fn test_update_status_cancel_records_trimmed_reason() {
    let mut ctx = TestContext::new();
    let id = Uuid::new_v4();
    let clock = FixedClock(at(9, 45));

    ctx.booking_repo
        .expect_get_booking_by_id()
        .returning(move |id| Ok(Some(db_booking(id, "ARRIVED"))));

    ctx.booking_repo
        .expect_update_booking_status()
        .withf(move |b| {
            b.status == BookingStatus::Cancelled
                && b.cancel_reason.as_deref() == Some("patient called in sick")
        })
        .returning(|b| Ok(db_from_booking(&b)));

    let payload = UpdateBookingStatusRequest {
        status: "CANCELLED".to_string(),
        timestamp: None,
        reason: Some("  patient called in sick  ".to_string()),
    };

    let result = test_update_status_wrapper(&mut ctx, id, payload, &clock).await;

    assert!(result.is_ok());
    let booking = result.unwrap().0;
    assert!(booking.is_cancelled());
    assert_eq!(booking.cancel_reason.as_deref(), Some("patient called in sick"));
}

#[tokio::test]
async fn test_update_status_unknown_status_rejected() {
    let mut ctx = TestContext::new();
    let id = Uuid::new_v4();
    let clock = FixedClock(at(9, 45));

    // Parsing fails before any repository call
    let payload = UpdateBookingStatusRequest {
        status: "LUNCH".to_string(),
        timestamp: None,
        reason: None,
    };

    let result = test_update_status_wrapper(&mut ctx, id, payload, &clock).await;

    assert!(result.is_err());
    match result.unwrap_err().0 {
        BookingError::Validation(_) => {} // Expected
        e => panic!("Expected Validation error, got: {:?}", e),
    }
}

#[tokio::test]
async fn test_add_staff_idempotent_for_same_booking() {
    let mut ctx = TestContext::new();
    let booking_id = Uuid::new_v4();
    let staff_id = Uuid::new_v4();
    let existing = db_assignment(booking_id, staff_id, at(10, 0), at(11, 0));
    let existing_id = existing.id;

    let service_id = Uuid::new_v4();
    ctx.booking_repo
        .expect_get_booking_by_id()
        .returning(move |id| {
            let mut b = db_booking(id, "BOOKED");
            b.service_id = service_id;
            Ok(Some(b))
        });

    ctx.service_repo
        .expect_get_service_by_id()
        .returning(move |id| Ok(Some(db_job_service(id, 3600))));

    ctx.staff_repo
        .expect_get_staff_by_id()
        .returning(move |id| Ok(Some(db_staff(id, "STAFF"))));

    // The only overlap is this booking's own assignment, which the planner
    // is told to ignore
    let for_staff = existing.clone();
    ctx.assignment_repo
        .expect_get_assignments_for_staff()
        .returning(move |_, _, _| Ok(vec![for_staff.clone()]));

    let returned = existing.clone();
    ctx.assignment_repo
        .expect_add_staff_to_booking()
        .returning(move |_, _| Ok(returned.clone().into_model()));

    let payload = AddStaffRequest {
        staff_id,
        time_start: at(10, 0),
        time_end: at(11, 0),
    };

    let result = test_add_staff_wrapper(&mut ctx, booking_id, payload).await;

    assert!(result.is_ok());
    assert_eq!(result.unwrap().0.id, existing_id);
}

#[tokio::test]
async fn test_add_staff_conflict_with_other_booking() {
    let mut ctx = TestContext::new();
    let booking_id = Uuid::new_v4();
    let staff_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();

    ctx.booking_repo
        .expect_get_booking_by_id()
        .returning(move |id| {
            let mut b = db_booking(id, "BOOKED");
            b.service_id = service_id;
            Ok(Some(b))
        });

    ctx.service_repo
        .expect_get_service_by_id()
        .returning(move |id| Ok(Some(db_job_service(id, 3600))));

    ctx.staff_repo
        .expect_get_staff_by_id()
        .returning(move |id| Ok(Some(db_staff(id, "STAFF"))));

    // Overlapping assignment from a different booking
    ctx.assignment_repo
        .expect_get_assignments_for_staff()
        .returning(move |staff, _, _| {
            Ok(vec![db_assignment(
                Uuid::new_v4(),
                staff,
                at(10, 30),
                at(11, 30),
            )])
        });

    ctx.assignment_repo
        .expect_add_staff_to_booking()
        .times(0)
        .returning(|_, _| panic!("Should not be called"));

    let payload = AddStaffRequest {
        staff_id,
        time_start: at(10, 0),
        time_end: at(11, 0),
    };

    let result = test_add_staff_wrapper(&mut ctx, booking_id, payload).await;

    assert!(result.is_err());
    match result.unwrap_err().0 {
        BookingError::Conflict(_) => {} // Expected
        e => panic!("Expected Conflict error, got: {:?}", e),
    }
}

#[tokio::test]
async fn test_create_booking_rejects_inverted_window() {
    let mut ctx = TestContext::new();

    // No repository is touched when the window itself is invalid
    let payload = CreateBookingRequest {
        customer_id: Uuid::new_v4(),
        service_id: Uuid::new_v4(),
        appointment_date: at(11, 0),
        time_end: at(10, 0),
        priority: false,
        doctor_id: None,
    };

    let result = test_create_trick_wrapper(&mut ctx, payload).await;

    assert!(result.is_err());
    match result.unwrap_err().0 {
        BookingError::Validation(_) => {} // Expected
        e => panic!("Expected Validation error, got: {:?}", e),
    }
}
