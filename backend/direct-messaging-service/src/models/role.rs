//! Institution roles and the resolved caller identity
//!
//! Roles come from the identity provider; this service only reads them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Student,
    Teacher,
    Admin,
    SuperAdmin,
}

impl UserRole {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "STUDENT" => Some(Self::Student),
            "TEACHER" => Some(Self::Teacher),
            "ADMIN" => Some(Self::Admin),
            "SUPER_ADMIN" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    pub fn to_db(&self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Teacher => "TEACHER",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Administrative roles may delete any message, but never read foreign conversations
    pub fn is_administrative(&self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db(&s.to_ascii_uppercase()).ok_or_else(|| format!("Invalid role: {}", s))
    }
}

/// Caller identity as resolved from the bearer credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Principal {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_administrative(&self) -> bool {
        self.role.is_administrative()
    }
}
