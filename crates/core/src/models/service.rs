use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::BookingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceKind {
    Job,
    Trick,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Job => "JOB",
            ServiceKind::Trick => "TRICK",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JOB" => Ok(ServiceKind::Job),
            "TRICK" => Ok(ServiceKind::Trick),
            other => Err(BookingError::Validation(format!(
                "unknown service kind: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub kind: ServiceKind,
    /// Own duration in seconds. For TRICK this covers the doctor's slice
    /// only; prep jobs carry their own durations.
    pub time: i64,
    /// Ordered prep sub-services (JOB kind). Empty for plain JOB services.
    pub job_ids: Vec<Uuid>,
    /// Technicians required for the combined prep window. 0 = none.
    pub count_staff: i32,
    /// Doctors allowed to perform this service. Empty = unrestricted.
    pub staff_ids: Vec<Uuid>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Service {
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.time)
    }

    pub fn allows_doctor(&self, staff_id: Uuid) -> bool {
        self.staff_ids.is_empty() || self.staff_ids.contains(&staff_id)
    }
}
