use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Busy,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub vehicle: String,
    /// Account enabled by an administrator.
    pub active: bool,
    pub availability: Availability,
    pub location: GeoPoint,
    pub deliveries_today: u32,
    pub updated_at: DateTime<Utc>,
}

/// A driver annotated with its distance from a matching origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedDriver {
    #[serde(flatten)]
    pub driver: Driver,
    pub distance_km: f64,
}
