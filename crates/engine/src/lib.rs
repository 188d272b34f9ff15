//! # Booksync Engine
//!
//! The engine crate implements the scheduling core of the Booksync service:
//! interval conflict detection, the booking lifecycle state machine, staff
//! auto-assignment, and the per-day availability grid.
//!
//! ## Architecture
//!
//! Every module here is pure request-scoped computation over domain types
//! from `booksync-core`:
//!
//! - **conflict**: half-open interval overlap checks and the interval
//!   extractors used by both the staff-assignment and doctor-booking paths
//! - **status**: the booking status machine with timestamp side effects
//! - **assign**: planning of technician assignments for multi-job procedures
//! - **grid**: the per-staff, per-slot availability classification
//! - **clock**: the injected source of "now", so timestamp defaults stay
//!   deterministic under test
//!
//! The engine never talks to storage. Checks done here against fetched data
//! are advisory; the persistence layer re-validates inside its transaction
//! before anything is committed.

/// Staff auto-assignment planning for multi-job procedures
pub mod assign;
/// Injected time source
pub mod clock;
/// Interval overlap predicates and extractors
pub mod conflict;
/// Availability grid construction
pub mod grid;
/// Booking lifecycle state machine
pub mod status;
