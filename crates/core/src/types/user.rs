//! User identity types.

use serde::{Deserialize, Serialize};

use crate::types::email::Email;

/// Authorization role carried in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular customer: browse, search, purchase.
    #[default]
    User,
    /// Administrator: additionally create, update, delete, restock.
    Admin,
}

impl Role {
    /// True for [`Role::Admin`].
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Profile of the logged-in user, synthesized from access-token claims.
///
/// This is a denormalized read-model: the token itself stays authoritative,
/// and the profile is recomputed whenever the token changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user's email address (the token subject).
    pub email: Email,
    /// Display name, when the token carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Authorization role.
    #[serde(default)]
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_screaming_snake() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"USER\"");
    }

    #[test]
    fn missing_role_defaults_to_user() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"email":"a@b.com"}"#).unwrap();
        assert_eq!(profile.role, Role::User);
        assert!(!profile.role.is_admin());
    }
}
