use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub driver_id: Uuid,
    /// Set when the order was taken over from another driver.
    pub previous_driver_id: Option<Uuid>,
    /// Distance from the driver to the destination at assignment time, if the
    /// order carries coordinates.
    pub distance_km: Option<f64>,
    pub assigned_at: DateTime<Utc>,
}
