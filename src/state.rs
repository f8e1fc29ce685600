use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::DEFAULT_ASSIGNMENT_RADIUS_KM;
use crate::engine::matching::{MatchPolicy, DEFAULT_MAX_DISTANCE_KM};
use crate::models::assignment::Assignment;
use crate::models::driver::Driver;
use crate::models::order::Order;
use crate::models::staff::StaffMember;
use crate::observability::metrics::Metrics;

#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub policy: MatchPolicy,
    /// Radius used by `/drivers/nearest` when the caller gives none.
    pub default_radius_km: f64,
    /// Radius used for order candidates and automatic assignment.
    pub assignment_radius_km: f64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            policy: MatchPolicy::default(),
            default_radius_km: DEFAULT_MAX_DISTANCE_KM,
            assignment_radius_km: DEFAULT_ASSIGNMENT_RADIUS_KM,
        }
    }
}

pub struct AppState {
    pub drivers: DashMap<Uuid, Driver>,
    pub orders: DashMap<Uuid, Order>,
    pub assignments: DashMap<Uuid, Assignment>,
    pub staff: DashMap<Uuid, StaffMember>,
    pub assignment_events_tx: broadcast::Sender<Assignment>,
    pub settings: MatchSettings,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize, settings: MatchSettings) -> Self {
        let (assignment_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            drivers: DashMap::new(),
            orders: DashMap::new(),
            assignments: DashMap::new(),
            staff: DashMap::new(),
            assignment_events_tx,
            settings,
            metrics: Metrics::new(),
        }
    }

    /// A point-in-time copy of the roster, ordered by id so that matching
    /// results are reproducible across calls.
    pub fn roster(&self) -> Vec<Driver> {
        let mut drivers: Vec<Driver> = self
            .drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        drivers.sort_by_key(|driver| driver.id);
        drivers
    }

    pub fn orders_snapshot(&self) -> Vec<Order> {
        self.orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn driver_name(&self, id: Option<Uuid>) -> Option<String> {
        id.and_then(|id| self.drivers.get(&id).map(|driver| driver.name.clone()))
    }
}
