use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::matching::find_nearest_drivers_with_policy;
use crate::error::AppError;
use crate::geo::{distance_km, GeoPoint};
use crate::models::assignment::Assignment;
use crate::models::driver::RankedDriver;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

/// Ranks the current roster around `origin` using the configured policy.
pub fn nearest_drivers(state: &AppState, origin: &GeoPoint, max_distance_km: f64) -> Vec<RankedDriver> {
    let start = Instant::now();
    let roster = state.roster();
    let ranked =
        find_nearest_drivers_with_policy(origin, &roster, max_distance_km, &state.settings.policy);

    state.metrics.match_requests_total.inc();
    state
        .metrics
        .match_latency_seconds
        .observe(start.elapsed().as_secs_f64());

    debug!(
        lat = origin.lat,
        lng = origin.lng,
        max_distance_km,
        roster = roster.len(),
        matched = ranked.len(),
        "nearest drivers computed"
    );

    ranked
}

pub fn candidates_for_order(
    state: &AppState,
    order_id: Uuid,
    max_distance_km: Option<f64>,
) -> Result<Vec<RankedDriver>, AppError> {
    let destination = state
        .orders
        .get(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?
        .destination
        .ok_or_else(|| AppError::BadRequest(format!("order {} has no destination", order_id)))?;

    let radius = max_distance_km.unwrap_or(state.settings.assignment_radius_km);
    Ok(nearest_drivers(state, &destination, radius))
}

/// Assigns `order_id` to `driver_id`, or to the nearest eligible driver within
/// the assignment radius when no driver is given.
pub fn assign_order(
    state: &AppState,
    order_id: Uuid,
    driver_id: Option<Uuid>,
) -> Result<Assignment, AppError> {
    match try_assign(state, order_id, driver_id) {
        Ok(assignment) => {
            state
                .metrics
                .assignments_total
                .with_label_values(&["success"])
                .inc();
            Ok(assignment)
        }
        Err(err) => {
            state
                .metrics
                .assignments_total
                .with_label_values(&["error"])
                .inc();
            warn!(order_id = %order_id, error = %err, "assignment rejected");
            Err(err)
        }
    }
}

fn try_assign(
    state: &AppState,
    order_id: Uuid,
    driver_id: Option<Uuid>,
) -> Result<Assignment, AppError> {
    let order = state
        .orders
        .get(&order_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;
    ensure_assignable(&order)?;

    let (driver_id, distance) = match driver_id {
        Some(id) => {
            let driver = state
                .drivers
                .get(&id)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?;

            if !state.settings.policy.is_eligible(&driver) {
                return Err(AppError::DriverUnavailable {
                    driver_id: driver.id,
                    active: driver.active,
                    availability: driver.availability,
                });
            }

            let distance = order
                .destination
                .map(|destination| distance_km(&destination, &driver.location));
            (driver.id, distance)
        }
        None => {
            let destination = order.destination.ok_or_else(|| {
                AppError::BadRequest(format!(
                    "order {} has no destination; a driver_id is required",
                    order_id
                ))
            })?;

            let nearest = nearest_drivers(state, &destination, state.settings.assignment_radius_km)
                .into_iter()
                .next()
                .ok_or(AppError::NoAvailableDrivers)?;
            (nearest.driver.id, Some(nearest.distance_km))
        }
    };

    let now = Utc::now();
    let previous_driver_id = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;
        ensure_assignable(&order)?;

        let previous = order.assigned_driver;
        if previous == Some(driver_id) {
            return Err(AppError::Conflict(format!(
                "order {} is already assigned to driver {}",
                order_id, driver_id
            )));
        }

        order.status = OrderStatus::InProgress;
        order.assigned_driver = Some(driver_id);
        order.picked_up_at.get_or_insert(now);
        previous
    };

    // A handover moves the delivery from one driver's count to the other's.
    if let Some(previous_id) = previous_driver_id {
        if let Some(mut previous) = state.drivers.get_mut(&previous_id) {
            previous.deliveries_today = previous.deliveries_today.saturating_sub(1);
            previous.updated_at = now;
        }
    }

    if let Some(mut driver) = state.drivers.get_mut(&driver_id) {
        driver.deliveries_today = driver.deliveries_today.saturating_add(1);
        driver.updated_at = now;
    }

    let assignment = Assignment {
        id: Uuid::new_v4(),
        order_id,
        driver_id,
        previous_driver_id,
        distance_km: distance,
        assigned_at: now,
    };

    state.assignments.insert(assignment.id, assignment.clone());
    let _ = state.assignment_events_tx.send(assignment.clone());

    info!(
        order_id = %order_id,
        driver_id = %driver_id,
        previous_driver_id = ?previous_driver_id,
        distance_km = ?distance,
        "order assigned"
    );

    Ok(assignment)
}

pub(crate) fn ensure_assignable(order: &Order) -> Result<(), AppError> {
    if order.status.is_terminal() {
        return Err(AppError::OrderClosed {
            order_id: order.id,
            status: order.status,
        });
    }
    Ok(())
}

pub fn update_order_status(
    state: &AppState,
    order_id: Uuid,
    status: OrderStatus,
) -> Result<Order, AppError> {
    if status == OrderStatus::Pending {
        return Err(AppError::BadRequest(
            "status must be in_progress, delivered or cancelled".to_string(),
        ));
    }

    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;
    ensure_assignable(&order)?;

    let now = Utc::now();
    match status {
        OrderStatus::InProgress => {
            order.picked_up_at.get_or_insert(now);
        }
        OrderStatus::Delivered => {
            order.delivered_at.get_or_insert(now);
        }
        OrderStatus::Pending | OrderStatus::Cancelled => {}
    }
    order.status = status;

    info!(order_id = %order_id, status = status.as_str(), "order status updated");
    Ok(order.clone())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{assign_order, update_order_status};
    use crate::error::AppError;
    use crate::geo::GeoPoint;
    use crate::models::driver::{Availability, Driver};
    use crate::models::order::{Order, OrderStatus};
    use crate::state::{AppState, MatchSettings};

    fn state() -> AppState {
        AppState::new(16, MatchSettings::default())
    }

    fn add_driver(state: &AppState, seed: u128, lat: f64, lng: f64, availability: Availability) -> Uuid {
        let driver = Driver {
            id: Uuid::from_u128(seed),
            name: format!("livreur-{seed}"),
            phone: "0600000000".to_string(),
            vehicle: "scooter".to_string(),
            active: true,
            availability,
            location: GeoPoint { lat, lng },
            deliveries_today: 0,
            updated_at: Utc::now(),
        };
        state.drivers.insert(driver.id, driver);
        Uuid::from_u128(seed)
    }

    fn add_order(state: &AppState, destination: Option<GeoPoint>) -> Uuid {
        let order = Order {
            id: Uuid::new_v4(),
            tracking_id: "TRK-000001-ABCD".to_string(),
            client_name: "Amina".to_string(),
            client_phone: "0612345678".to_string(),
            address: "Agdal, Rabat".to_string(),
            destination,
            amount: 80.0,
            status: OrderStatus::Pending,
            assigned_driver: None,
            delivery_date: None,
            created_at: Utc::now(),
            picked_up_at: None,
            delivered_at: None,
        };
        let id = order.id;
        state.orders.insert(id, order);
        id
    }

    #[test]
    fn auto_assignment_picks_nearest_available_driver() {
        let state = state();
        add_driver(&state, 1, 33.9900, -6.8498, Availability::Available);
        let near = add_driver(&state, 2, 33.9720, -6.8498, Availability::Available);
        add_driver(&state, 3, 33.9715, -6.8498, Availability::Busy);
        let order_id = add_order(&state, Some(GeoPoint::new(33.9715, -6.8498)));

        let assignment = assign_order(&state, order_id, None).unwrap();

        assert_eq!(assignment.driver_id, near);
        let order = state.orders.get(&order_id).unwrap();
        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(order.assigned_driver, Some(near));
        assert!(order.picked_up_at.is_some());
        assert_eq!(state.drivers.get(&near).unwrap().deliveries_today, 1);
    }

    #[test]
    fn handover_moves_the_delivery_count() {
        let state = state();
        let first = add_driver(&state, 1, 33.9715, -6.8498, Availability::Available);
        let second = add_driver(&state, 2, 33.9720, -6.8498, Availability::Available);
        let order_id = add_order(&state, Some(GeoPoint::new(33.9715, -6.8498)));

        assign_order(&state, order_id, Some(first)).unwrap();
        let handover = assign_order(&state, order_id, Some(second)).unwrap();

        assert_eq!(handover.previous_driver_id, Some(first));
        assert_eq!(state.drivers.get(&first).unwrap().deliveries_today, 0);
        assert_eq!(state.drivers.get(&second).unwrap().deliveries_today, 1);
        assert_eq!(state.orders.get(&order_id).unwrap().assigned_driver, Some(second));
        assert_eq!(state.assignments.len(), 2);
    }

    #[test]
    fn assigning_the_same_driver_twice_is_rejected() {
        let state = state();
        let driver = add_driver(&state, 1, 33.9715, -6.8498, Availability::Available);
        let order_id = add_order(&state, Some(GeoPoint::new(33.9715, -6.8498)));

        assign_order(&state, order_id, Some(driver)).unwrap();
        let err = assign_order(&state, order_id, Some(driver)).unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(state.drivers.get(&driver).unwrap().deliveries_today, 1);
        assert_eq!(state.assignments.len(), 1);
    }

    #[test]
    fn auto_assignment_without_candidates_fails() {
        let state = state();
        add_driver(&state, 1, 35.0, -5.0, Availability::Available);
        let order_id = add_order(&state, Some(GeoPoint::new(33.9715, -6.8498)));

        let err = assign_order(&state, order_id, None).unwrap_err();
        assert!(matches!(err, AppError::NoAvailableDrivers));
        assert_eq!(state.orders.get(&order_id).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn explicit_busy_driver_is_rejected() {
        let state = state();
        let busy = add_driver(&state, 1, 33.9715, -6.8498, Availability::Busy);
        let order_id = add_order(&state, None);

        let err = assign_order(&state, order_id, Some(busy)).unwrap_err();
        assert!(matches!(err, AppError::DriverUnavailable { .. }));
    }

    #[test]
    fn explicit_driver_without_destination_has_no_distance() {
        let state = state();
        let driver = add_driver(&state, 1, 33.9715, -6.8498, Availability::Available);
        let order_id = add_order(&state, None);

        let assignment = assign_order(&state, order_id, Some(driver)).unwrap();
        assert_eq!(assignment.distance_km, None);
    }

    #[test]
    fn delivered_orders_cannot_change() {
        let state = state();
        let order_id = add_order(&state, None);

        let order = update_order_status(&state, order_id, OrderStatus::Delivered).unwrap();
        assert!(order.delivered_at.is_some());

        let err = update_order_status(&state, order_id, OrderStatus::Cancelled).unwrap_err();
        assert!(matches!(
            err,
            AppError::OrderClosed {
                status: OrderStatus::Delivered,
                ..
            }
        ));
    }

    #[test]
    fn pending_is_not_a_valid_target() {
        let state = state();
        let order_id = add_order(&state, None);

        let err = update_order_status(&state, order_id, OrderStatus::Pending).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
