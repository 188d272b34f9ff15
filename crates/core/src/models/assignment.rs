use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::interval::TimeInterval;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffAssignment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub staff_id: Uuid,
    /// The job service(s) this staff member covers for the booking.
    pub service_ids: Vec<Uuid>,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StaffAssignment {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval {
            start: self.time_start,
            end: self.time_end,
        }
    }
}

/// One planned staff binding produced by the auto-assigner. Plans carry no
/// identity of their own; they are persisted together with their booking or
/// not at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentPlan {
    pub staff_id: Uuid,
    pub service_ids: Vec<Uuid>,
    pub window: TimeInterval,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveStaffResponse {
    pub booking_id: Uuid,
    pub staff_id: Uuid,
    pub removed_at: DateTime<Utc>,
}
