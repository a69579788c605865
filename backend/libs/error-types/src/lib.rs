use serde::{Deserialize, Serialize};

/// Uniform API error body returned by every HTTP-facing service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short reason phrase, e.g. "Not Found"
    pub error: String,

    /// Human-readable explanation
    pub message: String,

    /// HTTP status code
    pub status: u16,

    /// Error category for client-side routing, one of the `error_types` constants
    pub error_type: String,

    /// Stable machine-readable code, one of the `error_codes` constants
    pub code: String,

    /// Machine-readable extra context, e.g. a limit that was hit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }
}

/// Standard error codes
pub mod error_codes {
    // Authentication
    pub const TOKEN_INVALID: &str = "TOKEN_INVALID";

    // Validation
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";

    // Messaging
    pub const RESOURCE_NOT_FOUND: &str = "RESOURCE_NOT_FOUND";
    pub const ACCESS_DENIED: &str = "ACCESS_DENIED";
    pub const EDIT_WINDOW_EXPIRED: &str = "EDIT_WINDOW_EXPIRED";
    pub const POLICY_VIOLATION: &str = "POLICY_VIOLATION";

    // Database/System
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
}

/// Standard error categories
pub mod error_types {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const AUTHENTICATION_ERROR: &str = "authentication_error";
    pub const AUTHORIZATION_ERROR: &str = "authorization_error";
    pub const NOT_FOUND_ERROR: &str = "not_found_error";
    pub const POLICY_ERROR: &str = "policy_error";
    pub const SERVER_ERROR: &str = "server_error";
}
