use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::{validate_point, validate_radius};
use crate::engine::assignment::nearest_drivers;
use crate::engine::reports::{driver_history, DriverHistory};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::driver::{Availability, Driver, RankedDriver};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/nearest", get(nearest))
        .route(
            "/drivers/:id",
            get(get_driver).patch(update_driver).delete(delete_driver),
        )
        .route("/drivers/:id/history", get(get_driver_history))
        .route("/drivers/:id/location", patch(update_driver_location))
        .route("/drivers/:id/availability", patch(update_driver_availability))
        .route("/drivers/:id/toggle-active", post(toggle_driver_active))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub vehicle: String,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateDriverRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub vehicle: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub availability: Availability,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct NearestQuery {
    pub lat: f64,
    pub lng: f64,
    pub max_distance_km: Option<f64>,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    validate_point(&payload.location, "location")?;

    let driver = Driver {
        id: Uuid::new_v4(),
        name: payload.name,
        phone: payload.phone,
        vehicle: payload.vehicle,
        active: true,
        availability: Availability::Available,
        location: payload.location,
        deliveries_today: 0,
        updated_at: Utc::now(),
    };

    state.drivers.insert(driver.id, driver.clone());
    info!(driver_id = %driver.id, "driver created");
    Ok(Json(driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    Json(state.roster())
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    let driver = state
        .drivers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?;

    Ok(Json(driver.value().clone()))
}

async fn update_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?;

    if let Some(name) = payload.name {
        driver.name = name;
    }
    if let Some(phone) = payload.phone {
        driver.phone = phone;
    }
    if let Some(vehicle) = payload.vehicle {
        driver.vehicle = vehicle;
    }
    driver.updated_at = Utc::now();

    Ok(Json(driver.clone()))
}

/// Orders that pointed at the driver keep their status but lose the driver.
async fn delete_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .drivers
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?;

    let mut released = 0usize;
    for mut order in state.orders.iter_mut() {
        if order.assigned_driver == Some(id) {
            order.assigned_driver = None;
            released += 1;
        }
    }

    info!(driver_id = %id, released_orders = released, "driver deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_driver_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverHistory>, AppError> {
    if !state.drivers.contains_key(&id) {
        return Err(AppError::NotFound(format!("driver {} not found", id)));
    }

    Ok(Json(driver_history(&state.orders_snapshot(), id)))
}

async fn update_driver_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Driver>, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?;

    driver.availability = payload.availability;
    driver.updated_at = Utc::now();

    Ok(Json(driver.clone()))
}

async fn update_driver_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Driver>, AppError> {
    validate_point(&payload.location, "location")?;

    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?;

    driver.location = payload.location;
    driver.updated_at = Utc::now();
    state.metrics.location_updates_total.inc();

    Ok(Json(driver.clone()))
}

async fn toggle_driver_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {} not found", id)))?;

    driver.active = !driver.active;
    driver.updated_at = Utc::now();
    info!(driver_id = %id, active = driver.active, "driver account toggled");

    Ok(Json(driver.clone()))
}

async fn nearest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearestQuery>,
) -> Result<Json<Vec<RankedDriver>>, AppError> {
    let origin = GeoPoint::new(query.lat, query.lng);
    validate_point(&origin, "origin")?;
    let radius = validate_radius(query.max_distance_km.unwrap_or(state.settings.default_radius_km))?;

    Ok(Json(nearest_drivers(&state, &origin, radius)))
}
