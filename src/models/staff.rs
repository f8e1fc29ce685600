use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Office roles. Drivers live in their own roster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    /// A "gestionnaire": creates orders and assigns drivers.
    Manager,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: StaffRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
