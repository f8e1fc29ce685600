use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::staff::{StaffMember, StaffRole};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/staff", post(create_staff).get(list_staff))
        .route(
            "/staff/:id",
            get(get_staff).patch(update_staff).delete(delete_staff),
        )
        .route("/staff/:id/toggle-active", post(toggle_staff_active))
}

#[derive(Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: StaffRole,
}

#[derive(Deserialize)]
pub struct UpdateStaffRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<StaffRole>,
}

fn validate_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::BadRequest(format!("invalid email: {email}"))),
    }
}

fn ensure_email_free(state: &AppState, email: &str, except: Option<Uuid>) -> Result<(), AppError> {
    let taken = state
        .staff
        .iter()
        .any(|entry| entry.value().email == email && Some(*entry.key()) != except);

    if taken {
        return Err(AppError::Conflict(format!("email {email} is already in use")));
    }
    Ok(())
}

async fn create_staff(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateStaffRequest>,
) -> Result<Json<StaffMember>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    let email = validate_email(&payload.email)?;
    ensure_email_free(&state, &email, None)?;

    let member = StaffMember {
        id: Uuid::new_v4(),
        name: payload.name,
        email,
        phone: payload.phone,
        role: payload.role,
        active: true,
        created_at: Utc::now(),
    };

    state.staff.insert(member.id, member.clone());
    info!(staff_id = %member.id, role = ?member.role, "staff member created");
    Ok(Json(member))
}

async fn list_staff(State(state): State<Arc<AppState>>) -> Json<Vec<StaffMember>> {
    let mut members: Vec<StaffMember> = state
        .staff
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    members.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    Json(members)
}

async fn get_staff(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StaffMember>, AppError> {
    let member = state
        .staff
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("staff member {} not found", id)))?;

    Ok(Json(member.value().clone()))
}

async fn update_staff(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStaffRequest>,
) -> Result<Json<StaffMember>, AppError> {
    if payload.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    let email = payload.email.as_deref().map(validate_email).transpose()?;
    if let Some(email) = &email {
        ensure_email_free(&state, email, Some(id))?;
    }

    let mut member = state
        .staff
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("staff member {} not found", id)))?;

    if let Some(name) = payload.name {
        member.name = name;
    }
    if let Some(email) = email {
        member.email = email;
    }
    if let Some(phone) = payload.phone {
        member.phone = phone;
    }
    if let Some(role) = payload.role {
        member.role = role;
    }

    Ok(Json(member.clone()))
}

async fn delete_staff(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .staff
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("staff member {} not found", id)))?;

    info!(staff_id = %id, "staff member deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_staff_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StaffMember>, AppError> {
    let mut member = state
        .staff
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("staff member {} not found", id)))?;

    member.active = !member.active;
    info!(staff_id = %id, active = member.active, "staff account toggled");

    Ok(Json(member.clone()))
}

#[cfg(test)]
mod tests {
    use super::validate_email;

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            validate_email("  Nadia@Rabat-Logistics.ma ").unwrap(),
            "nadia@rabat-logistics.ma"
        );
    }

    #[test]
    fn email_needs_local_part_and_domain() {
        assert!(validate_email("nadia").is_err());
        assert!(validate_email("@rabat.ma").is_err());
        assert!(validate_email("nadia@localhost").is_err());
    }
}
