use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::engine::reports::{calendar_month, CalendarMonth};
use crate::error::AppError;
use crate::models::driver::Availability;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(dashboard_stats))
        .route("/calendar", get(calendar))
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub drivers_total: usize,
    pub drivers_available: usize,
    pub staff_total: usize,
    pub orders_total: usize,
    pub revenue_total: f64,
    pub orders_by_status: BTreeMap<&'static str, usize>,
}

async fn dashboard_stats(State(state): State<Arc<AppState>>) -> Json<DashboardStats> {
    let drivers_available = state
        .drivers
        .iter()
        .filter(|entry| {
            let driver = entry.value();
            driver.active && driver.availability == Availability::Available
        })
        .count();

    let mut revenue_total = 0.0;
    let mut orders_by_status = BTreeMap::new();
    for entry in state.orders.iter() {
        let order = entry.value();
        revenue_total += order.amount;
        *orders_by_status.entry(order.status.as_str()).or_insert(0) += 1;
    }

    Json(DashboardStats {
        drivers_total: state.drivers.len(),
        drivers_available,
        staff_total: state.staff.len(),
        orders_total: state.orders.len(),
        revenue_total,
        orders_by_status,
    })
}

#[derive(Deserialize)]
pub struct CalendarQuery {
    pub month: u32,
    pub year: i32,
}

async fn calendar(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarMonth>, AppError> {
    calendar_month(&state.orders_snapshot(), query.year, query.month).map(Json)
}
