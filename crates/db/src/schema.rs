use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create customers table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            phone VARCHAR(32) NULL,
            is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create staff table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staff (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            role VARCHAR(32) NOT NULL,
            active BOOLEAN NOT NULL DEFAULT TRUE,
            schedule JSONB NOT NULL DEFAULT '{}'::jsonb,
            is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_role CHECK (
                role IN ('DOCTOR', 'STAFF', 'ADMIN', 'RECEPTIONIST', 'CUSTOMER')
            )
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create services table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS services (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            kind VARCHAR(16) NOT NULL,
            time BIGINT NOT NULL,
            job_ids UUID[] NOT NULL DEFAULT '{}',
            count_staff INTEGER NOT NULL DEFAULT 0,
            staff_ids UUID[] NOT NULL DEFAULT '{}',
            is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_kind CHECK (kind IN ('JOB', 'TRICK')),
            CONSTRAINT valid_duration CHECK (time >= 0)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create bookings table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookings (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            customer_id UUID NOT NULL REFERENCES customers(id),
            service_id UUID NOT NULL REFERENCES services(id),
            doctor_id UUID NULL REFERENCES staff(id),
            appointment_date TIMESTAMP WITH TIME ZONE NOT NULL,
            time_end TIMESTAMP WITH TIME ZONE NOT NULL,
            doctor_date TIMESTAMP WITH TIME ZONE NULL,
            status VARCHAR(16) NOT NULL DEFAULT 'BOOKED',
            priority BOOLEAN NOT NULL DEFAULT FALSE,
            coming_time TIMESTAMP WITH TIME ZONE NULL,
            doing_time TIMESTAMP WITH TIME ZONE NULL,
            complete_time TIMESTAMP WITH TIME ZONE NULL,
            cancel_reason TEXT NULL,
            staff_assignments UUID[] NOT NULL DEFAULT '{}',
            is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_time_range CHECK (time_end > appointment_date),
            CONSTRAINT valid_status CHECK (
                status IN ('BOOKED', 'ARRIVED', 'IN_PROGRESS', 'COMPLETED', 'CANCELLED')
            )
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create staff_assignments table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staff_assignments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            booking_id UUID NOT NULL REFERENCES bookings(id) ON DELETE CASCADE,
            staff_id UUID NOT NULL REFERENCES staff(id),
            service_ids UUID[] NOT NULL DEFAULT '{}',
            time_start TIMESTAMP WITH TIME ZONE NOT NULL,
            time_end TIMESTAMP WITH TIME ZONE NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_assignment_range CHECK (time_end > time_start)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_staff_role ON staff(role)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_customer_id ON bookings(customer_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_doctor_id ON bookings(doctor_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_appointment_date ON bookings(appointment_date)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_time_end ON bookings(time_end)",
        "CREATE INDEX IF NOT EXISTS idx_staff_assignments_booking_id ON staff_assignments(booking_id)",
        "CREATE INDEX IF NOT EXISTS idx_staff_assignments_staff_id ON staff_assignments(staff_id)",
        "CREATE INDEX IF NOT EXISTS idx_staff_assignments_time_start ON staff_assignments(time_start)",
    ];
    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
