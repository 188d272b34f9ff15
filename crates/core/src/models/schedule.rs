use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::assignment::StaffAssignment;
use crate::models::booking::Booking;

/// Everything happening on one clinic day: the live bookings and the
/// technician assignments overlapping it, as returned by the daily
/// schedule endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyScheduleResponse {
    pub date: NaiveDate,
    pub bookings: Vec<Booking>,
    pub assignments: Vec<StaffAssignment>,
}
