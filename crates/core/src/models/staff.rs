use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BookingError, BookingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Doctor,
    Staff,
    Admin,
    Receptionist,
    Customer,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Doctor => "DOCTOR",
            StaffRole::Staff => "STAFF",
            StaffRole::Admin => "ADMIN",
            StaffRole::Receptionist => "RECEPTIONIST",
            StaffRole::Customer => "CUSTOMER",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOCTOR" => Ok(StaffRole::Doctor),
            "STAFF" => Ok(StaffRole::Staff),
            "ADMIN" => Ok(StaffRole::Admin),
            "RECEPTIONIST" => Ok(StaffRole::Receptionist),
            "CUSTOMER" => Ok(StaffRole::Customer),
            other => Err(BookingError::Validation(format!(
                "unknown staff role: {}",
                other
            ))),
        }
    }
}

/// Working window within one day, in minutes from midnight (0-1439).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftRange {
    pub start: u16,
    pub end: u16,
}

impl ShiftRange {
    pub fn new(start: u16, end: u16) -> BookingResult<Self> {
        if start >= end || end > 1439 {
            return Err(BookingError::Validation(format!(
                "invalid shift range {}..{}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn covers(&self, start_min: u16, end_min: u16) -> bool {
        self.start <= start_min && end_min <= self.end
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub morning: Option<ShiftRange>,
    pub afternoon: Option<ShiftRange>,
}

impl DaySchedule {
    pub fn is_empty(&self) -> bool {
        self.morning.is_none() && self.afternoon.is_none()
    }

    /// True when `[start_min, end_min]` lies entirely within one of the
    /// day's shifts.
    pub fn covers(&self, start_min: u16, end_min: u16) -> bool {
        self.morning.is_some_and(|s| s.covers(start_min, end_min))
            || self.afternoon.is_some_and(|s| s.covers(start_min, end_min))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSchedule {
    #[serde(default)]
    pub monday: DaySchedule,
    #[serde(default)]
    pub tuesday: DaySchedule,
    #[serde(default)]
    pub wednesday: DaySchedule,
    #[serde(default)]
    pub thursday: DaySchedule,
    #[serde(default)]
    pub friday: DaySchedule,
    #[serde(default)]
    pub saturday: DaySchedule,
    #[serde(default)]
    pub sunday: DaySchedule,
}

impl WeekSchedule {
    pub fn day(&self, weekday: Weekday) -> &DaySchedule {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub name: String,
    pub role: StaffRole,
    pub active: bool,
    pub schedule: WeekSchedule,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Staff {
    pub fn is_schedulable(&self) -> bool {
        self.active && !self.is_deleted
    }
}
