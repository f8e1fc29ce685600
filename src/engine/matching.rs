use std::collections::HashSet;

use crate::geo::{distance_km, GeoPoint};
use crate::models::driver::{Availability, Driver, RankedDriver};

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 10.0;

/// Which availability states make an active driver assignable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPolicy {
    eligible: HashSet<Availability>,
}

impl MatchPolicy {
    pub fn new(eligible: impl IntoIterator<Item = Availability>) -> Self {
        Self {
            eligible: eligible.into_iter().collect(),
        }
    }

    /// Inactive accounts are never eligible, whatever their availability.
    pub fn is_eligible(&self, driver: &Driver) -> bool {
        driver.active && self.eligible.contains(&driver.availability)
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::new([Availability::Available])
    }
}

/// Active, available drivers within `max_distance_km` of `origin`, nearest first.
pub fn find_nearest_drivers(
    origin: &GeoPoint,
    drivers: &[Driver],
    max_distance_km: f64,
) -> Vec<RankedDriver> {
    find_nearest_drivers_with_policy(origin, drivers, max_distance_km, &MatchPolicy::default())
}

/// The radius bound is inclusive. Ties keep the roster order.
pub fn find_nearest_drivers_with_policy(
    origin: &GeoPoint,
    drivers: &[Driver],
    max_distance_km: f64,
    policy: &MatchPolicy,
) -> Vec<RankedDriver> {
    let mut ranked: Vec<RankedDriver> = drivers
        .iter()
        .filter(|driver| policy.is_eligible(driver))
        .map(|driver| RankedDriver {
            distance_km: distance_km(origin, &driver.location),
            driver: driver.clone(),
        })
        .filter(|ranked| ranked.distance_km <= max_distance_km)
        .collect();

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}
