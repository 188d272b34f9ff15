use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::BookingError;
use crate::models::assignment::StaffAssignment;
use crate::models::customer::Customer;
use crate::models::interval::TimeInterval;
use crate::models::service::Service;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Booked,
    Arrived,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "BOOKED",
            BookingStatus::Arrived => "ARRIVED",
            BookingStatus::InProgress => "IN_PROGRESS",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOKED" => Ok(BookingStatus::Booked),
            "ARRIVED" => Ok(BookingStatus::Arrived),
            "IN_PROGRESS" => Ok(BookingStatus::InProgress),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(BookingError::Validation(format!(
                "unknown booking status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    /// Start of the doctor's own slice of a TRICK procedure
    /// (= time_end - service.time). None for JOB bookings.
    pub doctor_date: Option<DateTime<Utc>>,
    pub status: BookingStatus,
    pub priority: bool,
    pub coming_time: Option<DateTime<Utc>>,
    pub doing_time: Option<DateTime<Utc>>,
    pub complete_time: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    /// Ordered assignment ids committed for this booking.
    pub staff_assignments: Vec<Uuid>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval {
            start: self.appointment_date,
            end: self.time_end,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub priority: bool,
    /// The single technician for a JOB booking, or the doctor for a TRICK.
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBookingStatusRequest {
    /// Requested status as its wire name (e.g. "ARRIVED"); parsed, not
    /// trusted.
    pub status: String,
    /// Explicit event timestamp; the current time is used when absent.
    pub timestamp: Option<DateTime<Utc>>,
    /// Required (non-empty) when cancelling.
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddStaffRequest {
    pub staff_id: Uuid,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBookingResponse {
    pub id: Uuid,
    pub deleted_at: DateTime<Utc>,
    pub hard: bool,
}

/// A booking joined with the entities it references, as returned by the
/// booking endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetail {
    pub booking: Booking,
    pub customer: Customer,
    pub service: Service,
    pub assignments: Vec<StaffAssignment>,
}
