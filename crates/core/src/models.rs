pub mod assignment;
pub mod booking;
pub mod customer;
pub mod interval;
pub mod schedule;
pub mod service;
pub mod staff;
