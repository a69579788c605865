use crate::error::AppError;
use actix_web::{http::StatusCode, HttpResponse};
use error_types::{error_codes, error_types as kinds, ErrorResponse};

/// Map domain errors to an HTTP status and the shared error body
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::Validation(_) => (kinds::VALIDATION_ERROR, error_codes::INVALID_REQUEST),
        AppError::Unauthorized => (kinds::AUTHENTICATION_ERROR, error_codes::TOKEN_INVALID),
        AppError::Forbidden => (kinds::AUTHORIZATION_ERROR, error_codes::ACCESS_DENIED),
        AppError::NotFound => (kinds::NOT_FOUND_ERROR, error_codes::RESOURCE_NOT_FOUND),
        AppError::EditWindowExpired { .. } => {
            (kinds::POLICY_ERROR, error_codes::EDIT_WINDOW_EXPIRED)
        }
        AppError::PolicyViolation(_) => (kinds::POLICY_ERROR, error_codes::POLICY_VIOLATION),
        AppError::Database(_) => (kinds::SERVER_ERROR, error_codes::DATABASE_ERROR),
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
            (kinds::SERVER_ERROR, error_codes::INTERNAL_SERVER_ERROR)
        }
    };

    // Server-side details stay in the logs
    let message = match err {
        AppError::Database(_) | AppError::Config(_) | AppError::StartServer(_) => {
            tracing::error!(error = %err, "request failed with server error");
            "internal server error".to_string()
        }
        _ => err.to_string(),
    };

    let response = ErrorResponse::new(
        status.canonical_reason().unwrap_or("Error"),
        &message,
        status.as_u16(),
        error_type,
        code,
    );
    let response = match err {
        AppError::EditWindowExpired { max_edit_minutes } => {
            response.with_details(format!("max_edit_minutes={max_edit_minutes}"))
        }
        _ => response,
    };

    (status, response)
}

pub fn into_response(err: &AppError) -> HttpResponse {
    let (status, body) = map_error(err);
    HttpResponse::build(status).json(body)
}
