//! Row types mirroring the Postgres tables. Enum-valued columns are stored
//! as their wire strings and parsed on the way out, so a bad row surfaces as
//! an error instead of a panic.

use booksync_core::models::{
    assignment::StaffAssignment,
    booking::{Booking, BookingStatus},
    customer::Customer,
    service::{Service, ServiceKind},
    staff::{Staff, StaffRole, WeekSchedule},
};
use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbCustomer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl DbCustomer {
    pub fn into_model(self) -> Customer {
        Customer {
            id: self.id,
            name: self.name,
            phone: self.phone,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbStaff {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub active: bool,
    pub schedule: Json<WeekSchedule>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl DbStaff {
    pub fn into_model(self) -> Result<Staff> {
        let role = self.role.parse::<StaffRole>()?;
        Ok(Staff {
            id: self.id,
            name: self.name,
            role,
            active: self.active,
            schedule: self.schedule.0,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbService {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub time: i64,
    pub job_ids: Vec<Uuid>,
    pub count_staff: i32,
    pub staff_ids: Vec<Uuid>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl DbService {
    pub fn into_model(self) -> Result<Service> {
        let kind = self.kind.parse::<ServiceKind>()?;
        Ok(Service {
            id: self.id,
            name: self.name,
            kind,
            time: self.time,
            job_ids: self.job_ids,
            count_staff: self.count_staff,
            staff_ids: self.staff_ids,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBooking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub doctor_date: Option<DateTime<Utc>>,
    pub status: String,
    pub priority: bool,
    pub coming_time: Option<DateTime<Utc>>,
    pub doing_time: Option<DateTime<Utc>>,
    pub complete_time: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub staff_assignments: Vec<Uuid>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl DbBooking {
    pub fn into_model(self) -> Result<Booking> {
        let status = self.status.parse::<BookingStatus>()?;
        Ok(Booking {
            id: self.id,
            customer_id: self.customer_id,
            service_id: self.service_id,
            doctor_id: self.doctor_id,
            appointment_date: self.appointment_date,
            time_end: self.time_end,
            doctor_date: self.doctor_date,
            status,
            priority: self.priority,
            coming_time: self.coming_time,
            doing_time: self.doing_time,
            complete_time: self.complete_time,
            cancel_reason: self.cancel_reason,
            staff_assignments: self.staff_assignments,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbStaffAssignment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub staff_id: Uuid,
    pub service_ids: Vec<Uuid>,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl DbStaffAssignment {
    pub fn into_model(self) -> StaffAssignment {
        StaffAssignment {
            id: self.id,
            booking_id: self.booking_id,
            staff_id: self.staff_id,
            service_ids: self.service_ids,
            time_start: self.time_start,
            time_end: self.time_end,
            created_at: self.created_at,
        }
    }
}

/// Write model for a new booking, assembled by the create handler after
/// validation. `kind` picks which in-transaction checks run and is not
/// itself a column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub doctor_date: Option<DateTime<Utc>>,
    pub priority: bool,
    pub kind: ServiceKind,
}
