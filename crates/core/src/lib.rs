//! Shared domain types for the Booksync scheduling service: entity models,
//! request/response shapes, and the error taxonomy every other crate maps
//! its failures into.

pub mod errors;
pub mod models;
