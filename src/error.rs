use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::driver::Availability;
use crate::models::order::OrderStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// The order reached a terminal status and can no longer change.
    #[error("order {order_id} is already {status}")]
    OrderClosed { order_id: Uuid, status: OrderStatus },

    #[error("driver {driver_id} cannot take orders (active: {active}, availability: {availability:?})")]
    DriverUnavailable {
        driver_id: Uuid,
        active: bool,
        availability: Availability,
    },

    #[error("no drivers available")]
    NoAvailableDrivers,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::OrderClosed { .. } | AppError::DriverUnavailable { .. } => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::NoAvailableDrivers => (
                StatusCode::SERVICE_UNAVAILABLE,
                "no drivers available".to_string(),
            ),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use uuid::Uuid;

    use super::AppError;
    use crate::models::driver::Availability;
    use crate::models::order::OrderStatus;

    #[test]
    fn closed_order_names_its_status() {
        let err = AppError::OrderClosed {
            order_id: Uuid::nil(),
            status: OrderStatus::Delivered,
        };

        assert_eq!(
            err.to_string(),
            "order 00000000-0000-0000-0000-000000000000 is already delivered"
        );
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unavailable_driver_maps_to_conflict() {
        let err = AppError::DriverUnavailable {
            driver_id: Uuid::nil(),
            active: true,
            availability: Availability::Busy,
        };

        assert!(err.to_string().contains("Busy"));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
