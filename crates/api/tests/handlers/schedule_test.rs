use axum::Json;
use booksync_core::{
    errors::BookingError,
    models::{schedule::DailyScheduleResponse, staff::StaffRole},
};
use booksync_db::models::{DbBooking, DbStaff, DbStaffAssignment};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use mockall::predicate;
use std::collections::HashSet;
use uuid::Uuid;

use crate::test_utils::TestContext;
use booksync_api::handlers::schedule::DailyScheduleQuery;
use booksync_api::middleware::error_handling::AppError;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, hour, min, 0).unwrap()
}

fn db_booking(doctor_id: Option<Uuid>) -> DbBooking {
    DbBooking {
        id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        service_id: Uuid::new_v4(),
        doctor_id,
        appointment_date: at(10, 0),
        time_end: at(11, 0),
        doctor_date: None,
        status: "BOOKED".to_string(),
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

fn db_assignment(booking_id: Uuid, staff_id: Uuid) -> DbStaffAssignment {
    DbStaffAssignment {
        id: Uuid::new_v4(),
        booking_id,
        staff_id,
        service_ids: vec![Uuid::new_v4()],
        time_start: at(10, 0),
        time_end: at(11, 0),
        created_at: at(8, 0),
    }
}

fn db_staff(id: Uuid, role: &str) -> DbStaff {
    DbStaff {
        id,
        name: format!("staff-{}", id),
        role: role.to_string(),
        active: true,
        schedule: sqlx::types::Json(Default::default()),
        is_deleted: false,
        created_at: at(8, 0),
    }
}

// Mirrors the daily schedule flow with mocked repositories.
async fn test_daily_schedule_wrapper(
    ctx: &mut TestContext,
    query: DailyScheduleQuery,
) -> Result<Json<DailyScheduleResponse>, AppError> {
    let bookings = ctx
        .booking_repo
        .get_bookings_for_date(query.date)
        .await
        .map_err(BookingError::Database)?
        .into_iter()
        .map(|row| row.into_model())
        .collect::<Result<Vec<_>, _>>()
        .map_err(BookingError::Database)?;

    let assignments = ctx
        .assignment_repo
        .get_assignments_for_date(query.date)
        .await
        .map_err(BookingError::Database)?
        .into_iter()
        .map(|row| row.into_model())
        .collect::<Vec<_>>();

    let filter = if let Some(staff_id) = query.staff_id {
        Some(HashSet::from([staff_id]))
    } else if let Some(role) = &query.role {
        let role: StaffRole = role.parse()?;
        let rows = ctx
            .staff_repo
            .get_schedulable_staff_by_role(role.as_str())
            .await
            .map_err(BookingError::Database)?;
        Some(rows.into_iter().map(|row| row.id).collect::<HashSet<_>>())
    } else {
        None
    };

    let (bookings, assignments) = match filter {
        Some(ids) => {
            let assignments: Vec<_> = assignments
                .into_iter()
                .filter(|a| ids.contains(&a.staff_id))
                .collect();
            let linked: HashSet<Uuid> = assignments.iter().map(|a| a.booking_id).collect();
            let bookings = bookings
                .into_iter()
                .filter(|b| {
                    b.doctor_id.is_some_and(|doctor| ids.contains(&doctor))
                        || linked.contains(&b.id)
                })
                .collect();
            (bookings, assignments)
        }
        None => (bookings, assignments),
    };

    Ok(Json(DailyScheduleResponse {
        date: query.date,
        bookings,
        assignments,
    }))
}

#[tokio::test]
async fn test_daily_schedule_unfiltered() {
    let mut ctx = TestContext::new();

    ctx.booking_repo
        .expect_get_bookings_for_date()
        .with(predicate::eq(day()))
        .returning(|_| Ok(vec![db_booking(Some(Uuid::new_v4())), db_booking(None)]));

    ctx.assignment_repo
        .expect_get_assignments_for_date()
        .with(predicate::eq(day()))
        .returning(|_| {
            Ok(vec![
                db_assignment(Uuid::new_v4(), Uuid::new_v4()),
                db_assignment(Uuid::new_v4(), Uuid::new_v4()),
            ])
        });

    let query = DailyScheduleQuery {
        date: day(),
        staff_id: None,
        role: None,
    };

    let result = test_daily_schedule_wrapper(&mut ctx, query).await;

    assert!(result.is_ok());
    let response = result.unwrap().0;
    assert_eq!(response.date, day());
    assert_eq!(response.bookings.len(), 2);
    assert_eq!(response.assignments.len(), 2);
}

#[tokio::test]
async fn test_daily_schedule_filtered_by_staff() {
    let mut ctx = TestContext::new();
    let tech_id = Uuid::new_v4();
    let their_booking = Uuid::new_v4();

    // One booking linked to the technician through its assignment, one not
    ctx.booking_repo
        .expect_get_bookings_for_date()
        .returning(move |_| {
            let mut linked = db_booking(None);
            linked.id = their_booking;
            Ok(vec![linked, db_booking(None)])
        });

    ctx.assignment_repo
        .expect_get_assignments_for_date()
        .returning(move |_| {
            Ok(vec![
                db_assignment(their_booking, tech_id),
                db_assignment(Uuid::new_v4(), Uuid::new_v4()),
            ])
        });

    let query = DailyScheduleQuery {
        date: day(),
        staff_id: Some(tech_id),
        role: None,
    };

    let result = test_daily_schedule_wrapper(&mut ctx, query).await;

    assert!(result.is_ok());
    let response = result.unwrap().0;
    assert_eq!(response.assignments.len(), 1);
    assert_eq!(response.assignments[0].staff_id, tech_id);
    assert_eq!(response.bookings.len(), 1);
    assert_eq!(response.bookings[0].id, their_booking);
}

#[tokio::test]
async fn test_daily_schedule_filtered_by_role() {
    let mut ctx = TestContext::new();
    let doctor_id = Uuid::new_v4();

    ctx.booking_repo
        .expect_get_bookings_for_date()
        .returning(move |_| Ok(vec![db_booking(Some(doctor_id)), db_booking(None)]));

    // Technician assignments fall outside a DOCTOR filter
    ctx.assignment_repo
        .expect_get_assignments_for_date()
        .returning(|_| Ok(vec![db_assignment(Uuid::new_v4(), Uuid::new_v4())]));

    ctx.staff_repo
        .expect_get_schedulable_staff_by_role()
        .with(predicate::eq("DOCTOR"))
        .returning(move |_| Ok(vec![db_staff(doctor_id, "DOCTOR")]));

    let query = DailyScheduleQuery {
        date: day(),
        staff_id: None,
        role: Some("DOCTOR".to_string()),
    };

    let result = test_daily_schedule_wrapper(&mut ctx, query).await;

    assert!(result.is_ok());
    let response = result.unwrap().0;
    assert_eq!(response.bookings.len(), 1);
    assert_eq!(response.bookings[0].doctor_id, Some(doctor_id));
    assert!(response.assignments.is_empty());
}

#[tokio::test]
async fn test_daily_schedule_staff_id_wins_over_role() {
    let mut ctx = TestContext::new();
    let tech_id = Uuid::new_v4();

    ctx.booking_repo
        .expect_get_bookings_for_date()
        .returning(|_| Ok(vec![]));

    ctx.assignment_repo
        .expect_get_assignments_for_date()
        .returning(move |_| Ok(vec![db_assignment(Uuid::new_v4(), tech_id)]));

    // The role lookup must not run when staff_id is present
    ctx.staff_repo
        .expect_get_schedulable_staff_by_role()
        .times(0)
        .returning(|_| Ok(vec![]));

    let query = DailyScheduleQuery {
        date: day(),
        staff_id: Some(tech_id),
        role: Some("DOCTOR".to_string()),
    };

    let result = test_daily_schedule_wrapper(&mut ctx, query).await;

    assert!(result.is_ok());
    assert_eq!(result.unwrap().0.assignments.len(), 1);
}

#[tokio::test]
async fn test_daily_schedule_rejects_unknown_role() {
    let mut ctx = TestContext::new();

    ctx.booking_repo
        .expect_get_bookings_for_date()
        .returning(|_| Ok(vec![]));

    ctx.assignment_repo
        .expect_get_assignments_for_date()
        .returning(|_| Ok(vec![]));

    let query = DailyScheduleQuery {
        date: day(),
        staff_id: None,
        role: Some("WIZARD".to_string()),
    };

    let result = test_daily_schedule_wrapper(&mut ctx, query).await;

    assert!(result.is_err());
    match result.unwrap_err().0 {
        BookingError::Validation(_) => {} // Expected
        e => panic!("Expected Validation error, got: {:?}", e),
    }
}
