// src/domain/profile.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::change::RecordType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    HostFamily,
    Coordinator,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::HostFamily => "host_family",
            UserRole::Coordinator => "coordinator",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(UserRole::Student),
            "host_family" => Some(UserRole::HostFamily),
            "coordinator" | "local_coordinator" => Some(UserRole::Coordinator),
            "admin" | "sevis_user" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl From<RecordType> for UserRole {
    fn from(rt: RecordType) -> Self {
        match rt {
            RecordType::Student => UserRole::Student,
            RecordType::HostFamily => UserRole::HostFamily,
            RecordType::Coordinator => UserRole::Coordinator,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    /// Loose account-level attributes (region, status overrides, etc).
    pub metadata: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentProfileData {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<String>,
    pub country: Option<String>,
    pub program: Option<String>,
    pub sevis_id: Option<String>,
    pub school: Option<String>,
    pub address: Option<String>,
    pub application_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostFamilyProfileData {
    pub family_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub bedrooms: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoordinatorProfileData {
    pub region: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub training_started: Option<bool>,
    pub training_completed: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Role-specific profile payload. The JSON itself carries no tag; the owning
/// user's role decides which shape it must decode into.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProfileData {
    Student(StudentProfileData),
    HostFamily(HostFamilyProfileData),
    Coordinator(CoordinatorProfileData),
    /// Staff accounts carry no fixed schema.
    Staff(Map<String, Value>),
}

impl ProfileData {
    pub fn decode(role: UserRole, raw: Value) -> Result<Self, serde_json::Error> {
        // Legacy rows store `null` for "no data yet".
        let raw = if raw.is_null() {
            Value::Object(Map::new())
        } else {
            raw
        };
        Ok(match role {
            UserRole::Student => ProfileData::Student(serde_json::from_value(raw)?),
            UserRole::HostFamily => ProfileData::HostFamily(serde_json::from_value(raw)?),
            UserRole::Coordinator => ProfileData::Coordinator(serde_json::from_value(raw)?),
            UserRole::Admin => ProfileData::Staff(serde_json::from_value(raw)?),
        })
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn as_coordinator(&self) -> Option<&CoordinatorProfileData> {
        match self {
            ProfileData::Coordinator(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_student(&self) -> Option<&StudentProfileData> {
        match self {
            ProfileData::Student(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub data: ProfileData,
}

/// Edge between two profiles, e.g. `coordinator_host` or `host_student`.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub kind: String,
    pub payload: Option<Value>,
}

/// The full record a change request targets, as seen by field paths.
pub fn record_document(user: &User, profile: Option<&Profile>) -> Value {
    serde_json::json!({
        "id": user.id,
        "email": user.email,
        "name": user.name,
        "role": user.role.as_str(),
        "metadata": user.metadata,
        "data": profile.map(|p| p.data.to_value()).unwrap_or(Value::Null),
    })
}
