use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub tracking_id: String,
    pub client_name: String,
    pub client_phone: String,
    pub address: String,
    pub destination: Option<GeoPoint>,
    pub amount: f64,
    pub status: OrderStatus,
    pub assigned_driver: Option<Uuid>,
    /// Planned delivery day.
    pub delivery_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    /// The day the order shows up on in the calendar: the planned delivery
    /// day, or the creation day when none was planned.
    pub fn calendar_day(&self) -> NaiveDate {
        self.delivery_date
            .unwrap_or_else(|| self.created_at.date_naive())
    }
}

/// `TRK-<last six digits of the epoch millis>-<four uppercase characters>`.
pub fn generate_tracking_id(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().rem_euclid(1_000_000);
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(4)
        .collect::<String>()
        .to_uppercase();

    format!("TRK-{millis:06}-{suffix}")
}

/// Order list filters used by the order screens and the history view.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Case-insensitive containment over tracking id, client name, phone and
    /// status.
    pub q: Option<String>,
    /// Case-insensitive containment over the assigned driver's name.
    pub driver: Option<String>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order, driver_name: Option<&str>) -> bool {
        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }

        if let Some(needle) = non_empty_lowercase(self.q.as_deref()) {
            let hit = order.tracking_id.to_lowercase().contains(&needle)
                || order.client_name.to_lowercase().contains(&needle)
                || order.client_phone.contains(&needle)
                || order.status.as_str().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(needle) = non_empty_lowercase(self.driver.as_deref()) {
            let hit = driver_name
                .map(|name| name.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !hit {
                return false;
            }
        }

        true
    }
}

fn non_empty_lowercase(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}
