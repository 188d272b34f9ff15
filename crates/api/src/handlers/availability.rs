//! # Availability Handlers
//!
//! This module serves the per-staff availability grid for one date and one
//! target service: the front-of-house view used to pick a start time for a
//! new booking.
//!
//! ## Grid Construction
//!
//! The handler only assembles the day's snapshot; the classification lives
//! in `booksync_engine::grid`. It works by:
//!
//! 1. Resolving the target service and, for TRICK targets, its prep jobs
//! 2. Selecting the candidate staff for the service kind (technicians for
//!    JOB, doctors for TRICK) in creation order
//! 3. Loading the date's live TRICK bookings and technician assignments
//! 4. Handing the snapshot to the grid builder, which classifies every
//!    (staff, slot) cell and proposes a start time for the selectable ones
//!
//! The grid is advisory. Whatever a client picks from it is re-validated
//! when the booking is created, so a stale grid can cost a round trip but
//! never a double booking.

use axum::{
    extract::{Query, State},
    Json,
};
use booksync_core::{
    errors::BookingError,
    models::{
        service::ServiceKind,
        staff::StaffRole,
    },
};
use booksync_engine::grid::{self, AvailabilityGrid, GridRequest};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    handlers::booking::{fetch_service, resolve_jobs},
    middleware::error_handling::AppError,
    ApiState,
};

/// Query parameters for the availability grid endpoint
///
/// # Fields
///
/// * `date` - The day to build the grid for (ISO 8601 date)
/// * `service_id` - The service a new booking would be for
#[derive(Debug, Deserialize)]
pub struct GridQuery {
    /// The day to build the grid for
    pub date: NaiveDate,

    /// The service a new booking would be for
    pub service_id: Uuid,
}

/// Builds the availability grid for one date and target service
///
/// # Endpoint
///
/// ```text
/// GET /api/availability/grid?date=2024-06-10&service_id=...
/// ```
///
/// Rows are the eligible staff for the service kind; columns are the 29
/// half-hour slots from 08:00 to 22:00. Each selectable cell carries the
/// start and end a booking made from it would get.
#[axum::debug_handler]
pub async fn get_availability_grid(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<GridQuery>,
) -> Result<Json<AvailabilityGrid>, AppError> {
    let service = fetch_service(&state, query.service_id).await?;
    let jobs = resolve_jobs(&state, &service).await?;

    let role = match service.kind {
        ServiceKind::Job => StaffRole::Staff,
        ServiceKind::Trick => StaffRole::Doctor,
    };
    let staff = booksync_db::repositories::staff::get_schedulable_staff_by_role(
        &state.db_pool,
        role.as_str(),
    )
    .await
    .map_err(BookingError::Database)?
    .into_iter()
    .map(|row| row.into_model())
    .collect::<Result<Vec<_>, _>>()
    .map_err(BookingError::Database)?;

    let trick_bookings = booksync_db::repositories::booking::get_trick_bookings_for_date(
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

    let request = GridRequest {
        date: query.date,
        service: &service,
        jobs: &jobs,
        staff: &staff,
        trick_bookings: &trick_bookings,
        assignments: &assignments,
    };
    let grid = grid::build_grid(&request, state.clock.as_ref());

    Ok(Json(grid))
}
