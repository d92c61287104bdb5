use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::matching::{self, CandidateSummary};
use crate::error::AppError;
use crate::lifecycle;
use crate::models::request::{RequestStatus, TripRequest};
use crate::registry::{self, NewRequest, OpenRequestFilter};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests", post(create_request))
        .route("/requests/open", get(list_open_requests))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/candidates", get(list_candidates))
        .route("/requests/:id/assign", post(assign_request))
        .route("/requests/:id/transition", post(transition_request))
        .route("/requests/:id/force-cancel", post(force_cancel_request))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub provider_id: Uuid,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub to: RequestStatus,
    pub actor_id: Uuid,
}

#[derive(Deserialize)]
pub struct ForceCancelRequest {
    pub actor_id: Uuid,
    pub reason: Option<String>,
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewRequest>,
) -> Result<Json<TripRequest>, AppError> {
    let request = registry::create_request(&state, payload)?;
    Ok(Json(request))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TripRequest>, AppError> {
    let request = registry::get_request(&state, id)?;
    Ok(Json(request))
}

async fn list_open_requests(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<OpenRequestFilter>,
) -> Json<Vec<TripRequest>> {
    Json(registry::list_open_requests(&state, &filter))
}

async fn list_candidates(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CandidateSummary>>, AppError> {
    let request = registry::get_request(&state, id)?;
    let candidates = matching::find_candidates(&state, &request);

    if candidates.is_empty() {
        return Err(AppError::NoProviderAvailable);
    }

    Ok(Json(candidates))
}

async fn assign_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<TripRequest>, AppError> {
    let request = matching::assign(&state, id, payload.provider_id)?;
    Ok(Json(request))
}

async fn transition_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<TripRequest>, AppError> {
    let request = lifecycle::transition(&state, id, payload.to, payload.actor_id)?;
    Ok(Json(request))
}

async fn force_cancel_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ForceCancelRequest>,
) -> Result<Json<TripRequest>, AppError> {
    let request = lifecycle::force_cancel(&state, id, payload.actor_id, payload.reason.as_deref())?;
    Ok(Json(request))
}
