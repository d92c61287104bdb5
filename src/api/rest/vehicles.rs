use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vehicles", post(register_vehicle).get(list_vehicles))
        .route("/vehicles/:registration", delete(remove_vehicle))
}

#[derive(Deserialize)]
pub struct RegisterVehicleRequest {
    pub registration: String,
    pub owner_id: Uuid,
}

async fn register_vehicle(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    let registration = payload.registration.trim().to_string();
    if registration.is_empty() {
        return Err(AppError::Validation(
            "registration cannot be empty".to_string(),
        ));
    }
    if state.vehicles.contains_key(&registration) {
        return Err(AppError::Conflict(format!(
            "vehicle {registration} already registered"
        )));
    }

    let vehicle = Vehicle {
        registration: registration.clone(),
        owner_id: payload.owner_id,
        status: VehicleStatus::Idle,
        active_request_id: None,
    };

    state.vehicles.insert(registration, vehicle.clone());
    Ok(Json(vehicle))
}

async fn list_vehicles(State(state): State<Arc<AppState>>) -> Json<Vec<Vehicle>> {
    let vehicles = state
        .vehicles
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(vehicles)
}

async fn remove_vehicle(
    State(state): State<Arc<AppState>>,
    Path(registration): Path<String>,
) -> Result<Json<Vehicle>, AppError> {
    if let Some((_, vehicle)) = state
        .vehicles
        .remove_if(&registration, |_, vehicle| {
            vehicle.status != VehicleStatus::Booked
        })
    {
        return Ok(Json(vehicle));
    }

    if state.vehicles.contains_key(&registration) {
        Err(AppError::Conflict(
            "vehicle is booked on an active request".to_string(),
        ))
    } else {
        Err(AppError::NotFound(format!("vehicle {registration} not found")))
    }
}
