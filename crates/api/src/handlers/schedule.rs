//! # Daily Schedule Handlers
//!
//! Read-side view of one clinic day: every live booking and every staff
//! assignment overlapping the date, optionally narrowed to a single staff
//! member or a role.
//!
//! Bookings and assignments filter differently. Bookings drop out once
//! cancelled or soft-deleted; assignments stay until removed, because a
//! cancelled booking's technicians remain blocked until someone frees them.

use axum::{
    extract::{Query, State},
    Json,
};
use booksync_core::{
    errors::BookingError,
    models::{
        schedule::DailyScheduleResponse,
        staff::StaffRole,
    },
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::{collections::HashSet, sync::Arc};
use uuid::Uuid;

use crate::{middleware::error_handling::AppError, ApiState};

/// Query parameters for the daily schedule endpoint
///
/// # Fields
///
/// * `date` - The clinic day to report on (ISO 8601 date)
/// * `staff_id` - Restrict the view to one staff member
/// * `role` - Restrict the view to every schedulable member of a role
#[derive(Debug, Deserialize)]
pub struct DailyScheduleQuery {
    /// The clinic day to report on
    pub date: NaiveDate,

    /// Restrict the view to one staff member; wins over `role`
    pub staff_id: Option<Uuid>,

    /// Restrict the view to a role (e.g. "DOCTOR", "STAFF")
    pub role: Option<String>,
}

/// Returns the bookings and assignments of one clinic day
///
/// # Endpoint
///
/// ```text
/// GET /api/schedule/daily?date=2024-06-10&staff_id=...&role=DOCTOR
/// ```
///
/// With a staff filter active, a booking is kept when the filtered set
/// contains its doctor or one of its assigned technicians.
#[axum::debug_handler]
pub async fn get_daily_schedule(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<DailyScheduleQuery>,
) -> Result<Json<DailyScheduleResponse>, AppError> {
    let bookings = booksync_db::repositories::booking::get_bookings_for_date(
        &state.db_pool,
        query.date,
    )
    .await
    .map_err(BookingError::Database)?
    .into_iter()
    .map(|row| row.into_model())
    .collect::<Result<Vec<_>, _>>()
    .map_err(BookingError::Database)?;

    let assignments = booksync_db::repositories::assignment::get_assignments_for_date(
        &state.db_pool,
        query.date,
    )
    .await
    .map_err(BookingError::Database)?
    .into_iter()
    .map(|row| row.into_model())
    .collect::<Vec<_>>();

    let (bookings, assignments) = match resolve_filter(&state, &query).await? {
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

/// Resolves the optional staff filter to a set of staff ids. An explicit
/// `staff_id` wins over `role`; neither means no filter.
async fn resolve_filter(
    state: &ApiState,
    query: &DailyScheduleQuery,
) -> Result<Option<HashSet<Uuid>>, AppError> {
    if let Some(staff_id) = query.staff_id {
        return Ok(Some(HashSet::from([staff_id])));
    }

    let Some(role) = &query.role else {
        return Ok(None);
    };

    let role: StaffRole = role.parse()?;
    let rows = booksync_db::repositories::staff::get_schedulable_staff_by_role(
        &state.db_pool,
        role.as_str(),
    )
    .await
    .map_err(BookingError::Database)?;

    Ok(Some(rows.into_iter().map(|row| row.id).collect()))
}
