//! # Error Handling Middleware
//!
//! This module provides a standardized way to handle errors in the Booksync API.
//! It maps domain-specific errors to appropriate HTTP status codes and JSON
//! error responses, ensuring a consistent error handling experience across
//! the entire API.
//!
//! The implementation is based on Axum's error handling mechanisms and integrates
//! with Booksync's custom error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use booksync_core::errors::BookingError;
use serde_json::json;

/// Application error wrapper that provides HTTP status code mapping
///
/// `AppError` wraps domain-specific `BookingError` instances and implements
/// `IntoResponse` to convert them into HTTP responses with appropriate
/// status codes and JSON payloads.
///
/// # Example
///
/// ```
/// use axum::Json;
/// use booksync_api::middleware::error_handling::AppError;
/// use booksync_core::errors::BookingError;
/// use uuid::Uuid;
///
/// // Type definition to make the example compile
/// struct BookingResponse {}
/// struct Repository {
///     // Mock implementation
/// }
///
/// impl Repository {
///     async fn get_booking(&self, _id: Uuid) -> Result<BookingResponse, String> {
///         // Mock implementation
///         Ok(BookingResponse {})
///     }
/// }
///
/// async fn handler(id: Uuid) -> Result<Json<BookingResponse>, AppError> {
///     let repository = Repository {};
///     let booking = repository.get_booking(id)
///         .await
///         .map_err(|e| AppError(BookingError::NotFound(e.to_string())))?;
///
///     Ok(Json(booking))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub BookingError);

/// Converts application errors to HTTP responses
///
/// This implementation maps each error type to the appropriate HTTP status code
/// and formats the error message into a JSON response body.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map error types to HTTP status codes
        let status = match &self.0 {
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::Capacity(_) => StatusCode::CONFLICT,
            BookingError::StateTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Get the error message and format as JSON
        let message = self.0.to_string();
        let body = Json(json!({ "error": message }));

        // Combine status code and JSON body into a response
        (status, body).into_response()
    }
}

/// Automatic conversion from BookingError to AppError
///
/// This implementation allows using `?` operator with functions that return
/// `Result<T, BookingError>` in handler functions that return `Result<T, AppError>`.
impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError(err)
    }
}

/// Automatic conversion from eyre::Report to AppError
///
/// This implementation allows using `?` operator with functions that return
/// `Result<T, eyre::Report>` in handler functions that return `Result<T, AppError>`.
/// It wraps the eyre error in a BookingError::Database variant.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(BookingError::Database(err))
    }
}

/// Maps a BookingError to an HTTP response
///
/// This function is provided for backwards compatibility with code
/// that directly uses the error mapping function.
///
/// # Arguments
///
/// * `err` - The BookingError to convert
///
/// # Returns
///
/// * `Response` - An HTTP response with appropriate status code and body
pub fn map_error(err: BookingError) -> Response {
    AppError(err).into_response()
}
