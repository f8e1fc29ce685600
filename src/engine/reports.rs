use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Order, OrderStatus};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub delivered: usize,
    pub cancelled: usize,
}

impl CalendarDay {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total: 0,
            pending: 0,
            in_progress: 0,
            delivered: 0,
            cancelled: 0,
        }
    }

    fn record(&mut self, status: OrderStatus) {
        self.total += 1;
        match status {
            OrderStatus::Pending => self.pending += 1,
            OrderStatus::InProgress => self.in_progress += 1,
            OrderStatus::Delivered => self.delivered += 1,
            OrderStatus::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    /// Only days with at least one order, in date order.
    pub days: Vec<CalendarDay>,
}

/// Per-day order counts by status for one month.
pub fn calendar_month<'a>(
    orders: impl IntoIterator<Item = &'a Order>,
    year: i32,
    month: u32,
) -> Result<CalendarMonth, AppError> {
    if !(1..=12).contains(&month) {
        return Err(AppError::BadRequest(format!(
            "month must be between 1 and 12, got {month}"
        )));
    }

    let mut days: BTreeMap<NaiveDate, CalendarDay> = BTreeMap::new();
    for order in orders {
        let day = order.calendar_day();
        if day.year() != year || day.month() != month {
            continue;
        }
        days.entry(day)
            .or_insert_with(|| CalendarDay::empty(day))
            .record(order.status);
    }

    Ok(CalendarMonth {
        year,
        month,
        days: days.into_values().collect(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverHistory {
    pub driver_id: Uuid,
    pub total_delivered: usize,
    pub total_revenue: f64,
    /// Most recent delivery first.
    pub deliveries: Vec<Order>,
}

pub fn driver_history<'a>(
    orders: impl IntoIterator<Item = &'a Order>,
    driver_id: Uuid,
) -> DriverHistory {
    let mut deliveries: Vec<Order> = orders
        .into_iter()
        .filter(|order| {
            order.assigned_driver == Some(driver_id) && order.status == OrderStatus::Delivered
        })
        .cloned()
        .collect();
    deliveries.sort_by(|a, b| b.delivered_at.cmp(&a.delivered_at));

    DriverHistory {
        driver_id,
        total_delivered: deliveries.len(),
        total_revenue: deliveries.iter().map(|order| order.amount).sum(),
        deliveries,
    }
}
