use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new().route(
        "/api/schedule/daily",
        get(handlers::schedule::get_daily_schedule),
    )
}
