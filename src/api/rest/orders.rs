use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::rest::{validate_point, validate_radius};
use crate::engine::assignment::{
    assign_order, candidates_for_order, ensure_assignable, update_order_status,
};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::assignment::Assignment;
use crate::models::driver::RankedDriver;
use crate::models::order::{generate_tracking_id, Order, OrderFilter, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route(
            "/orders/:id",
            get(get_order).patch(update_order).delete(delete_order),
        )
        .route("/orders/:id/status", patch(set_order_status))
        .route("/orders/:id/candidates", get(order_candidates))
        .route("/orders/:id/assign", post(assign))
        .route("/assignments", get(list_assignments))
        .route("/track/:tracking_id", get(track))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub client_name: String,
    #[serde(default)]
    pub client_phone: String,
    #[serde(default)]
    pub address: String,
    pub destination: Option<GeoPoint>,
    pub amount: f64,
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub address: Option<String>,
    pub destination: Option<GeoPoint>,
    pub amount: Option<f64>,
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AssignRequest {
    #[serde(default)]
    pub driver_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct CandidatesQuery {
    pub max_distance_km: Option<f64>,
}

#[derive(Serialize)]
pub struct TrackingResponse {
    pub tracking_id: String,
    pub status: OrderStatus,
    pub driver_name: Option<String>,
    pub driver_location: Option<GeoPoint>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.client_name.trim().is_empty() {
        return Err(AppError::BadRequest("client_name cannot be empty".to_string()));
    }
    validate_amount(payload.amount)?;
    if let Some(destination) = &payload.destination {
        validate_point(destination, "destination")?;
    }

    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        tracking_id: generate_tracking_id(now),
        client_name: payload.client_name,
        client_phone: payload.client_phone,
        address: payload.address,
        destination: payload.destination,
        amount: payload.amount,
        status: OrderStatus::Pending,
        assigned_driver: None,
        delivery_date: payload.delivery_date,
        created_at: now,
        picked_up_at: None,
        delivered_at: None,
    };

    state.orders.insert(order.id, order.clone());
    info!(order_id = %order.id, tracking_id = %order.tracking_id, "order created");

    Ok(Json(order))
}

/// Newest first.
async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<OrderFilter>,
) -> Json<Vec<Order>> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    orders.retain(|order| {
        let driver_name = state.driver_name(order.assigned_driver);
        filter.matches(order, driver_name.as_deref())
    });
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

    Json(orders)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order.value().clone()))
}

async fn update_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload
        .client_name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(AppError::BadRequest("client_name cannot be empty".to_string()));
    }
    if let Some(amount) = payload.amount {
        validate_amount(amount)?;
    }
    if let Some(destination) = &payload.destination {
        validate_point(destination, "destination")?;
    }

    let mut order = state
        .orders
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;
    ensure_assignable(&order)?;

    if let Some(client_name) = payload.client_name {
        order.client_name = client_name;
    }
    if let Some(client_phone) = payload.client_phone {
        order.client_phone = client_phone;
    }
    if let Some(address) = payload.address {
        order.address = address;
    }
    if payload.destination.is_some() {
        order.destination = payload.destination;
    }
    if let Some(amount) = payload.amount {
        order.amount = amount;
    }
    if payload.delivery_date.is_some() {
        order.delivery_date = payload.delivery_date;
    }

    Ok(Json(order.clone()))
}

/// Drops the order together with its assignment records.
async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .orders
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;
    state
        .assignments
        .retain(|_, assignment| assignment.order_id != id);

    info!(order_id = %id, "order deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn set_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    update_order_status(&state, id, payload.status).map(Json)
}

async fn order_candidates(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<CandidatesQuery>,
) -> Result<Json<Vec<RankedDriver>>, AppError> {
    let radius = query.max_distance_km.map(validate_radius).transpose()?;
    candidates_for_order(&state, id, radius).map(Json)
}

/// An empty body asks for the nearest driver; anything else must be a valid
/// `AssignRequest`.
async fn assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<Assignment>, AppError> {
    let request = parse_assign_request(&body)?;
    assign_order(&state, id, request.driver_id).map(Json)
}

fn parse_assign_request(body: &[u8]) -> Result<AssignRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AssignRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|err| AppError::BadRequest(format!("invalid assign request: {err}")))
}

fn validate_amount(amount: f64) -> Result<(), AppError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(AppError::BadRequest("amount must be >= 0".to_string()))
    }
}

async fn list_assignments(State(state): State<Arc<AppState>>) -> Json<Vec<Assignment>> {
    let mut assignments: Vec<Assignment> = state
        .assignments
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    assignments.sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at));

    Json(assignments)
}

async fn track(
    State(state): State<Arc<AppState>>,
    Path(tracking_id): Path<String>,
) -> Result<Json<TrackingResponse>, AppError> {
    let order = state
        .orders
        .iter()
        .find(|entry| entry.value().tracking_id == tracking_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("tracking id {} not found", tracking_id)))?;

    let driver = order
        .assigned_driver
        .and_then(|id| state.drivers.get(&id).map(|entry| entry.value().clone()));

    Ok(Json(TrackingResponse {
        tracking_id: order.tracking_id,
        status: order.status,
        driver_name: driver.as_ref().map(|d| d.name.clone()),
        driver_location: driver.map(|d| d.location),
    }))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::parse_assign_request;
    use crate::error::AppError;

    #[test]
    fn empty_body_requests_nearest_driver() {
        assert_eq!(parse_assign_request(b"").unwrap().driver_id, None);
        assert_eq!(parse_assign_request(b" \n").unwrap().driver_id, None);
        assert_eq!(parse_assign_request(b"{}").unwrap().driver_id, None);
    }

    #[test]
    fn explicit_driver_is_parsed() {
        let request =
            parse_assign_request(br#"{"driver_id":"00000000-0000-0000-0000-000000000001"}"#)
                .unwrap();
        assert_eq!(request.driver_id, Some(Uuid::from_u128(1)));
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        for body in [
            &br#"{"driver_id":"not-a-uuid"}"#[..],
            &br#"{"driver_id":42}"#[..],
            &br#"{"driver":"00000000-0000-0000-0000-000000000001"}"#[..],
            &b"{not json"[..],
        ] {
            let err = parse_assign_request(body).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
    }
}
