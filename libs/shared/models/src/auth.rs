use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    /// Staff record the user is linked to, when the user is a staff member.
    pub staff_id: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub staff_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn actor_role(&self) -> ActorRole {
        ActorRole::from_claim(self.role.as_deref())
    }
}

/// Role of the user operating the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Manager,
    Staff,
    Unknown,
}

impl ActorRole {
    pub fn from_claim(role: Option<&str>) -> Self {
        match role.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("admin") => ActorRole::Admin,
            Some("manager") => ActorRole::Manager,
            Some("staff") | Some("technician") | Some("therapist") => ActorRole::Staff,
            _ => ActorRole::Unknown,
        }
    }

    pub fn is_privileged(&self) -> bool {
        matches!(self, ActorRole::Admin | ActorRole::Manager)
    }
}
