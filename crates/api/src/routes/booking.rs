use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/bookings", post(handlers::booking::create_booking))
        .route("/api/bookings/:id", get(handlers::booking::get_booking))
        .route(
            "/api/bookings/:id",
            delete(handlers::booking::delete_booking),
        )
        .route(
            "/api/bookings/:id/status",
            put(handlers::booking::update_booking_status),
        )
        .route(
            "/api/bookings/:id/staff",
            post(handlers::booking::add_staff_to_booking),
        )
        .route(
            "/api/bookings/:id/staff/:staff_id",
            delete(handlers::booking::remove_staff_from_booking),
        )
}
