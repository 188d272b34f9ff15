pub mod assignment;
pub mod booking;
pub mod customer;
pub mod service;
pub mod staff;

pub(crate) mod guards;
