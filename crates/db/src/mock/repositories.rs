use booksync_core::errors::BookingResult;
use booksync_core::models::assignment::{AssignmentPlan, StaffAssignment};
use booksync_core::models::booking::Booking;
use chrono::{DateTime, NaiveDate, Utc};
use mockall::mock;
use uuid::Uuid;

use crate::models::{DbBooking, DbCustomer, DbService, DbStaff, DbStaffAssignment, NewBooking};

// Mock repositories for testing
mock! {
    pub CustomerRepo {
        pub async fn get_customer_by_id(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbCustomer>>;
    }
}

mock! {
    pub StaffRepo {
        pub async fn get_staff_by_id(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbStaff>>;

        pub async fn get_schedulable_staff_by_role(
            &self,
            role: &'static str,
        ) -> eyre::Result<Vec<DbStaff>>;
    }
}

mock! {
    pub ServiceRepo {
        pub async fn get_service_by_id(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbService>>;

        pub async fn get_services_by_ids(
            &self,
            ids: Vec<Uuid>,
        ) -> eyre::Result<Vec<DbService>>;
    }
}

mock! {
    pub BookingRepo {
        pub async fn get_booking_by_id(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbBooking>>;

        pub async fn get_bookings_for_date(
            &self,
            date: NaiveDate,
        ) -> eyre::Result<Vec<DbBooking>>;

        pub async fn get_trick_bookings_for_date(
            &self,
            date: NaiveDate,
        ) -> eyre::Result<Vec<DbBooking>>;

        pub async fn get_bookings_for_doctor(
            &self,
            doctor_id: Uuid,
            from: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> eyre::Result<Vec<DbBooking>>;

        pub async fn create_booking_with_assignments(
            &self,
            new: NewBooking,
            plans: Vec<AssignmentPlan>,
        ) -> BookingResult<Booking>;

        pub async fn update_booking_status(
            &self,
            booking: Booking,
        ) -> eyre::Result<DbBooking>;

        pub async fn soft_delete_booking(
            &self,
            id: Uuid,
        ) -> eyre::Result<DbBooking>;

        pub async fn hard_delete_booking(
            &self,
            id: Uuid,
        ) -> eyre::Result<()>;
    }
}

mock! {
    pub AssignmentRepo {
        pub async fn get_assignments_for_booking(
            &self,
            booking_id: Uuid,
        ) -> eyre::Result<Vec<DbStaffAssignment>>;

        pub async fn get_assignments_for_staff(
            &self,
            staff_id: Uuid,
            from: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> eyre::Result<Vec<DbStaffAssignment>>;

        pub async fn get_assignments_for_date(
            &self,
            date: NaiveDate,
        ) -> eyre::Result<Vec<DbStaffAssignment>>;

        pub async fn add_staff_to_booking(
            &self,
            booking: Booking,
            plan: AssignmentPlan,
        ) -> BookingResult<StaffAssignment>;

        pub async fn remove_staff_from_booking(
            &self,
            booking_id: Uuid,
            staff_id: Uuid,
        ) -> BookingResult<StaffAssignment>;
    }
}
