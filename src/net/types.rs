//! Shared DTOs for the identity provider and the profile table.
//!
//! DESIGN
//! ======
//! These types mirror the hosted backend's JSON payloads (GoTrue identities,
//! PostgREST profile rows) so serde can decode responses directly and the
//! session core never touches raw JSON.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

/// Account role, a closed set shared by sign-up and the profile table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Alumni,
    Student,
    Faculty,
    Administrator,
    Management,
}

impl Role {
    /// Every role, in the order the sign-up form offers them.
    pub const ALL: [Role; 5] = [
        Role::Alumni,
        Role::Student,
        Role::Faculty,
        Role::Administrator,
        Role::Management,
    ];

    /// Wire value, matching the `role` column and metadata strings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Alumni => "alumni",
            Role::Student => "student",
            Role::Faculty => "faculty",
            Role::Administrator => "administrator",
            Role::Management => "management",
        }
    }

    /// Human-readable label for selects and badges.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Role::Alumni => "Alumni",
            Role::Student => "Student",
            Role::Faculty => "Faculty",
            Role::Administrator => "Administrator",
            Role::Management => "Management",
        }
    }

    /// Parse a wire value; `None` for anything outside the closed set.
    #[must_use]
    pub fn parse(value: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

/// Metadata attached to an identity at sign-up.
///
/// The `role` travels as a raw string so an unexpected value recorded by
/// another client can never fail identity deserialization; it is parsed
/// against [`Role`] only when a profile row is synthesized.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Alternate display-name field some providers populate instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// An authenticated identity as returned by the auth endpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable provider-assigned identifier (UUID string).
    pub id: String,
    /// Email the identity registered with, when known.
    #[serde(default)]
    pub email: Option<String>,
    /// Provider-supplied metadata captured at sign-up.
    #[serde(default, rename = "user_metadata")]
    pub metadata: IdentityMetadata,
}

impl Identity {
    /// Best display name derivable from the identity alone: provider full
    /// name, then the alternate name field, then the email local-part, then
    /// the literal `"User"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = non_empty(self.metadata.full_name.as_deref()) {
            return name;
        }
        if let Some(name) = non_empty(self.metadata.name.as_deref()) {
            return name;
        }
        if let Some(local) = self
            .email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.trim().is_empty())
        {
            return local.to_owned();
        }
        "User".to_owned()
    }

    /// Requested role from metadata, defaulting to [`Role::Alumni`].
    #[must_use]
    pub fn requested_role(&self) -> Role {
        self.metadata
            .role
            .as_deref()
            .and_then(Role::parse)
            .unwrap_or_default()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

/// A row in the `user_profiles` table, keyed 1:1 by the owning identity id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Shared primary key: always equals the owning identity's id.
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub current_position: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Soft-delete flag used by the directory; new rows start active.
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_is_active() -> bool {
    true
}

/// Columns written by the client-side safety net when no profile row exists.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewProfile {
    pub id: String,
    pub email: Option<String>,
    pub full_name: String,
    pub role: Role,
}

/// Partial profile update; `None` fields are left untouched by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}
