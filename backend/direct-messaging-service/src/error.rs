use crate::middleware::error_handling;
use crate::repository::StoreError;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("edit window expired (max_edit_minutes: {max_edit_minutes})")]
    EditWindowExpired { max_edit_minutes: i64 },

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal server error")]
    Internal,
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            // Conflicts are resolved inside the conversation directory; one that
            // escapes means the retry budget ran out.
            StoreError::Conflict => {
                tracing::error!("unresolved uniqueness conflict reached the service boundary");
                AppError::Internal
            }
            StoreError::Database(e) => AppError::Database(e.to_string()),
            StoreError::Corrupt(msg) => AppError::Database(format!("corrupt row: {msg}")),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        error_handling::into_response(self)
    }
}

impl AppError {
    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::EditWindowExpired { .. } | AppError::PolicyViolation(_) => 400,
            AppError::Unauthorized => 401,
            AppError::Forbidden => 403,
            AppError::NotFound => 404,
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Database(_)
            | AppError::Internal => 500,
        }
    }

    /// Policy violations are business-rule failures, distinct from malformed input
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            AppError::EditWindowExpired { .. } | AppError::PolicyViolation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Validation("blank".into()).status_code(), 400);
        assert_eq!(
            AppError::EditWindowExpired { max_edit_minutes: 15 }.status_code(),
            400
        );
        assert_eq!(AppError::Unauthorized.status_code(), 401);
        assert_eq!(AppError::Forbidden.status_code(), 403);
        assert_eq!(AppError::NotFound.status_code(), 404);
        assert_eq!(AppError::Database("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_conflict_never_surfaces_as_conflict() {
        let err: AppError = StoreError::Conflict.into();
        assert_eq!(err, AppError::Internal);
    }

    #[test]
    fn test_policy_violation_classification() {
        assert!(AppError::EditWindowExpired { max_edit_minutes: 15 }.is_policy_violation());
        assert!(AppError::PolicyViolation("deleted".into()).is_policy_violation());
        assert!(!AppError::Validation("blank".into()).is_policy_violation());
    }
}
