//! Staff roles
//!
//! Users themselves live in the identity provider; tokens only carry the role.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an authenticated staff member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Desk staff handling day-to-day reservations
    #[default]
    Agent,
    /// Agency manager, may delete records
    Manager,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Agent => write!(f, "agent"),
            UserRole::Manager => write!(f, "manager"),
        }
    }
}

impl UserRole {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "agent" => Some(UserRole::Agent),
            "manager" => Some(UserRole::Manager),
            _ => None,
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self, UserRole::Manager)
    }
}
