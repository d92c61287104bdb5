use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::valid_point;
use crate::models::provider::{Provider, ProviderStatus};
use crate::models::request::{GeoPoint, VehicleClass};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/providers", post(create_provider).get(list_providers))
        .route("/providers/:id", delete(remove_provider))
        .route("/providers/:id/status", patch(update_status))
        .route("/providers/:id/location", patch(update_location))
        .route("/providers/:id/rating", post(rate_provider))
}

#[derive(Deserialize)]
pub struct CreateProviderRequest {
    pub name: String,
    pub owner_id: Option<Uuid>,
    pub vehicle_class: VehicleClass,
    pub vehicle_reg: Option<String>,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ProviderStatus,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct RateProviderRequest {
    pub rating: f64,
}

async fn create_provider(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProviderRequest>,
) -> Result<Json<Provider>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if !valid_point(&payload.location) {
        return Err(AppError::Validation(
            "location coordinates are out of range".to_string(),
        ));
    }
    if let Some(registration) = &payload.vehicle_reg {
        if !state.vehicles.contains_key(registration) {
            return Err(AppError::NotFound(format!(
                "vehicle {registration} not found"
            )));
        }
    }

    let provider = Provider {
        id: Uuid::new_v4(),
        name: payload.name,
        owner_id: payload.owner_id,
        vehicle_class: payload.vehicle_class,
        vehicle_reg: payload.vehicle_reg,
        status: ProviderStatus::Offline,
        location: payload.location,
        active_request_id: None,
        rating: 0.0,
        rating_count: 0,
        updated_at: Utc::now(),
    };

    state.providers.insert(provider.id, provider.clone());
    Ok(Json(provider))
}

async fn list_providers(State(state): State<Arc<AppState>>) -> Json<Vec<Provider>> {
    let providers = state
        .providers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(providers)
}

async fn remove_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Provider>, AppError> {
    if let Some((_, provider)) = state
        .providers
        .remove_if(&id, |_, provider| provider.status != ProviderStatus::Booked)
    {
        return Ok(Json(provider));
    }

    if state.providers.contains_key(&id) {
        Err(AppError::Conflict(
            "provider has an active request".to_string(),
        ))
    } else {
        Err(AppError::NotFound(format!("provider {id} not found")))
    }
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Provider>, AppError> {
    if payload.status == ProviderStatus::Booked {
        return Err(AppError::Validation(
            "booked is set by the matching engine".to_string(),
        ));
    }

    let mut provider = state
        .providers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("provider {id} not found")))?;

    if provider.status == ProviderStatus::Booked {
        return Err(AppError::Conflict(
            "provider has an active request".to_string(),
        ));
    }

    provider.status = payload.status;
    provider.updated_at = Utc::now();

    Ok(Json(provider.clone()))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Provider>, AppError> {
    if !valid_point(&payload.location) {
        return Err(AppError::Validation(
            "location coordinates are out of range".to_string(),
        ));
    }

    let mut provider = state
        .providers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("provider {id} not found")))?;

    provider.location = payload.location;
    provider.updated_at = Utc::now();

    Ok(Json(provider.clone()))
}

async fn rate_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RateProviderRequest>,
) -> Result<Json<Provider>, AppError> {
    if !payload.rating.is_finite() {
        return Err(AppError::Validation("rating must be a number".to_string()));
    }

    let mut provider = state
        .providers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("provider {id} not found")))?;

    provider.apply_rating(payload.rating);
    provider.updated_at = Utc::now();

    Ok(Json(provider.clone()))
}
