pub mod drivers;
pub mod orders;
pub mod staff;
pub mod stats;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(drivers::router())
        .merge(orders::router())
        .merge(staff::router())
        .merge(stats::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    drivers: usize,
    orders: usize,
    assignments: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        drivers: state.drivers.len(),
        orders: state.orders.len(),
        assignments: state.assignments.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}

pub(crate) fn validate_point(point: &GeoPoint, field: &str) -> Result<(), AppError> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "{field} must have lat in [-90, 90] and lng in [-180, 180]"
        )))
    }
}

pub(crate) fn validate_radius(radius: f64) -> Result<f64, AppError> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(radius)
    } else {
        Err(AppError::BadRequest(
            "max_distance_km must be a non-negative number".to_string(),
        ))
    }
}
