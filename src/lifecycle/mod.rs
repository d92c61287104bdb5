use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::event::TransitionEvent;
use crate::models::provider::ProviderStatus;
use crate::models::request::{RequestStatus, StatusEntry, TripRequest};
use crate::models::vehicle::VehicleStatus;
use crate::registry;
use crate::state::AppState;

/// The legal moves out of each state. `assigned` is only ever entered
/// through the matching engine, but it sits in this table so the engine
/// shares the same legality check.
pub fn allowed_transitions(from: RequestStatus) -> &'static [RequestStatus] {
    use RequestStatus::*;

    match from {
        Fetching => &[Assigned, Cancelled],
        Assigned => &[Arrived, Cancelled],
        Arrived => &[Ongoing],
        Ongoing => &[Completed],
        Completed | Cancelled => &[],
    }
}

pub fn can_transition(from: RequestStatus, to: RequestStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Advances a request along the lifecycle. Terminal moves release the
/// provider and vehicle in the same unit as the status write, so a
/// finished request can never leave its provider stuck on `booked`.
pub fn transition(
    state: &AppState,
    request_id: Uuid,
    to: RequestStatus,
    actor_id: Uuid,
) -> Result<TripRequest, AppError> {
    if to == RequestStatus::Assigned {
        return Err(AppError::IllegalTransition(
            "assignment goes through the matching engine".to_string(),
        ));
    }

    let (snapshot, provider_id, from) = {
        let mut request = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

        let from = request.status;
        let provider_id = request.assigned_provider_id;
        registry::append_status(&mut request, to, actor_id)?;

        let releases = to == RequestStatus::Completed
            || (to == RequestStatus::Cancelled && from == RequestStatus::Assigned);
        if releases {
            release_booking(state, &mut request);
        }

        (request.clone(), provider_id, from)
    };

    state
        .metrics
        .transitions_total
        .with_label_values(&[to.as_str()])
        .inc();
    if from == RequestStatus::Fetching {
        state.metrics.open_requests.dec();
    }

    emit(state, &snapshot, provider_id);
    info!(request_id = %request_id, status = to.as_str(), "request transitioned");

    Ok(snapshot)
}

/// Operator-forced cancellation: the admin escape hatch out of `arrived`
/// and `ongoing`, where customer self-service cancellation is not legal.
/// Performs the same release side effect as a normal terminal move.
pub fn force_cancel(
    state: &AppState,
    request_id: Uuid,
    actor_id: Uuid,
    reason: Option<&str>,
) -> Result<TripRequest, AppError> {
    let (snapshot, provider_id) = {
        let mut request = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

        if request.status.is_terminal() {
            return Err(AppError::IllegalTransition(format!(
                "request is already {}",
                request.status.as_str()
            )));
        }

        if request.status == RequestStatus::Fetching {
            state.metrics.open_requests.dec();
        }

        let provider_id = request.assigned_provider_id;
        request.status_history.push(StatusEntry {
            status: RequestStatus::Cancelled,
            actor_id,
            at: Utc::now(),
        });
        request.status = RequestStatus::Cancelled;
        release_booking(state, &mut request);

        (request.clone(), provider_id)
    };

    state
        .metrics
        .transitions_total
        .with_label_values(&["cancelled"])
        .inc();

    emit(state, &snapshot, provider_id);
    warn!(
        request_id = %request_id,
        actor_id = %actor_id,
        reason = reason.unwrap_or("unspecified"),
        "request force-cancelled by operator"
    );

    Ok(snapshot)
}

/// Returns the provider to `online` and its vehicle to `idle`, clearing
/// both back-references. Called with the request's entry guard held, which
/// keeps the release and the status write one unit.
fn release_booking(state: &AppState, request: &mut TripRequest) {
    let Some(provider_id) = request.assigned_provider_id.take() else {
        return;
    };

    if let Some(mut provider) = state.providers.get_mut(&provider_id) {
        provider.status = ProviderStatus::Online;
        provider.active_request_id = None;
        provider.updated_at = Utc::now();

        if let Some(registration) = provider.vehicle_reg.clone() {
            if let Some(mut vehicle) = state.vehicles.get_mut(&registration) {
                vehicle.status = VehicleStatus::Idle;
                vehicle.active_request_id = None;
            }
        }
    }
}

// The provider id is passed in separately because a terminal move clears
// the request's assignment field before the event goes out.
pub(crate) fn emit(state: &AppState, request: &TripRequest, provider_id: Option<Uuid>) {
    let event = TransitionEvent {
        request_id: request.id,
        provider_id,
        new_status: request.status,
        at: Utc::now(),
    };
    let _ = state.transition_events_tx.send(event);
}
