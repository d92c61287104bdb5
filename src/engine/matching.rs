use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::lifecycle;
use crate::models::provider::ProviderStatus;
use crate::models::request::{RequestStatus, TripRequest};
use crate::models::vehicle::VehicleStatus;
use crate::registry;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub provider_id: Uuid,
    pub name: String,
    pub rating: f64,
    /// Absent for tour bookings, which carry no origin to measure from.
    pub distance_km: Option<f64>,
}

/// Eligible providers for a request: online, unassigned, matching vehicle
/// class, and within the matching radius of the origin. Nearest first,
/// ties broken by provider id so the ordering is deterministic.
pub fn find_candidates(state: &AppState, request: &TripRequest) -> Vec<CandidateSummary> {
    let mut candidates: Vec<CandidateSummary> = state
        .providers
        .iter()
        .filter_map(|entry| {
            let provider = entry.value();
            let eligible = provider.status == ProviderStatus::Online
                && provider.active_request_id.is_none()
                && provider.vehicle_class == request.vehicle_class;
            if !eligible {
                return None;
            }

            let distance_km = match &request.origin {
                Some(origin) => {
                    let d = haversine_km(&origin.point, &provider.location);
                    if d > state.match_radius_km {
                        return None;
                    }
                    Some(d)
                }
                None => None,
            };

            Some(CandidateSummary {
                provider_id: provider.id,
                name: provider.name.clone(),
                rating: provider.rating,
                distance_km,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        let by_distance = match (a.distance_km, b.distance_km) {
            (Some(da), Some(db)) => da.total_cmp(&db),
            _ => std::cmp::Ordering::Equal,
        };
        by_distance.then(a.provider_id.cmp(&b.provider_id))
    });

    candidates
}

/// Binds a request to a provider. The request, provider, and (if present)
/// vehicle entries are locked in that order, every precondition is
/// re-checked under the locks, and only then are the four fields written.
/// Any failed precondition returns `Conflict` with nothing mutated, so of
/// two racing callers exactly one wins.
pub fn assign(
    state: &AppState,
    request_id: Uuid,
    provider_id: Uuid,
) -> Result<TripRequest, AppError> {
    let start = Instant::now();
    let result = try_assign(state, request_id, provider_id);

    let outcome = if result.is_ok() { "success" } else { "error" };
    state
        .metrics
        .matching_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .assignments_total
        .with_label_values(&[outcome])
        .inc();

    result
}

fn try_assign(
    state: &AppState,
    request_id: Uuid,
    provider_id: Uuid,
) -> Result<TripRequest, AppError> {
    let snapshot = {
        let mut request = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

        if request.status != RequestStatus::Fetching {
            return Err(AppError::Conflict(format!(
                "request is {}, not fetching",
                request.status.as_str()
            )));
        }

        let mut provider = state
            .providers
            .get_mut(&provider_id)
            .ok_or_else(|| AppError::NotFound(format!("provider {provider_id} not found")))?;

        if provider.status != ProviderStatus::Online {
            return Err(AppError::Conflict("provider is not online".to_string()));
        }
        if provider.active_request_id.is_some() {
            return Err(AppError::Conflict(
                "provider already has an active request".to_string(),
            ));
        }
        if provider.vehicle_class != request.vehicle_class {
            return Err(AppError::Conflict("vehicle class mismatch".to_string()));
        }

        let mut vehicle = match &provider.vehicle_reg {
            Some(registration) => {
                // The vehicle may have been removed while idle; that is a
                // lost precondition for the caller, not a server fault.
                let vehicle = state.vehicles.get_mut(registration).ok_or_else(|| {
                    AppError::Conflict(format!("vehicle {registration} is no longer registered"))
                })?;
                if vehicle.status != VehicleStatus::Idle {
                    return Err(AppError::Conflict("vehicle is not idle".to_string()));
                }
                Some(vehicle)
            }
            None => None,
        };

        // All preconditions hold with the locks in hand; commit as one unit.
        registry::append_status(&mut request, RequestStatus::Assigned, provider_id)?;
        request.assigned_provider_id = Some(provider_id);

        provider.status = ProviderStatus::Booked;
        provider.active_request_id = Some(request_id);
        provider.updated_at = Utc::now();

        if let Some(vehicle) = vehicle.as_mut() {
            vehicle.status = VehicleStatus::Booked;
            vehicle.active_request_id = Some(request_id);
        }

        request.clone()
    };

    state.metrics.open_requests.dec();
    state
        .metrics
        .transitions_total
        .with_label_values(&["assigned"])
        .inc();

    lifecycle::emit(state, &snapshot, Some(provider_id));
    info!(request_id = %request_id, provider_id = %provider_id, "request assigned");

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{assign, find_candidates};
    use crate::error::AppError;
    use crate::models::provider::{Provider, ProviderStatus};
    use crate::models::request::{GeoPoint, Place, RequestKind, RequestStatus, VehicleClass};
    use crate::registry::{self, NewRequest};
    use crate::state::AppState;

    fn seed_provider(
        state: &AppState,
        id_seed: u128,
        lat: f64,
        lng: f64,
        status: ProviderStatus,
    ) -> Uuid {
        let id = Uuid::from_u128(id_seed);
        state.providers.insert(
            id,
            Provider {
                id,
                name: format!("provider-{id_seed}"),
                owner_id: None,
                vehicle_class: VehicleClass::Sedan,
                vehicle_reg: None,
                status,
                location: GeoPoint { lat, lng },
                active_request_id: None,
                rating: 4.0,
                rating_count: 10,
                updated_at: Utc::now(),
            },
        );
        id
    }

    fn seed_ride(state: &AppState) -> Uuid {
        let request = registry::create_request(
            state,
            NewRequest {
                kind: RequestKind::Ride,
                customer_id: Uuid::new_v4(),
                origin: Some(Place {
                    name: "Gulberg".to_string(),
                    point: GeoPoint {
                        lat: 31.5204,
                        lng: 74.3587,
                    },
                }),
                destination: Some(Place {
                    name: "Model Town".to_string(),
                    point: GeoPoint {
                        lat: 31.4811,
                        lng: 74.3242,
                    },
                }),
                vehicle_class: Some(VehicleClass::Sedan),
                weight_kg: None,
                seats: None,
            },
        )
        .unwrap();
        request.id
    }

    #[test]
    fn candidates_are_nearest_first() {
        let state = AppState::new(5.0, 16);
        let near = seed_provider(&state, 1, 31.5210, 74.3590, ProviderStatus::Online);
        let far = seed_provider(&state, 2, 31.5400, 74.3800, ProviderStatus::Online);
        let request_id = seed_ride(&state);

        let request = registry::get_request(&state, request_id).unwrap();
        let candidates = find_candidates(&state, &request);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].provider_id, near);
        assert_eq!(candidates[1].provider_id, far);
    }

    #[test]
    fn offline_and_out_of_radius_providers_are_excluded() {
        let state = AppState::new(2.0, 16);
        seed_provider(&state, 1, 31.5210, 74.3590, ProviderStatus::Offline);
        // Roughly 9 km away, outside the 2 km radius.
        seed_provider(&state, 2, 31.60, 74.40, ProviderStatus::Online);
        let request_id = seed_ride(&state);

        let request = registry::get_request(&state, request_id).unwrap();
        assert!(find_candidates(&state, &request).is_empty());
    }

    #[test]
    fn equidistant_candidates_tie_break_on_id() {
        let state = AppState::new(5.0, 16);
        let b = seed_provider(&state, 9, 31.5204, 74.3600, ProviderStatus::Online);
        let a = seed_provider(&state, 3, 31.5204, 74.3600, ProviderStatus::Online);
        let request_id = seed_ride(&state);

        let request = registry::get_request(&state, request_id).unwrap();
        let candidates = find_candidates(&state, &request);

        assert_eq!(candidates[0].provider_id, a.min(b));
        assert_eq!(candidates[1].provider_id, a.max(b));
    }

    #[test]
    fn assign_updates_request_and_provider_together() {
        let state = AppState::new(5.0, 16);
        let provider_id = seed_provider(&state, 1, 31.5210, 74.3590, ProviderStatus::Online);
        let request_id = seed_ride(&state);

        let request = assign(&state, request_id, provider_id).unwrap();
        assert_eq!(request.status, RequestStatus::Assigned);
        assert_eq!(request.assigned_provider_id, Some(provider_id));

        let provider = state.providers.get(&provider_id).unwrap();
        assert_eq!(provider.status, ProviderStatus::Booked);
        assert_eq!(provider.active_request_id, Some(request_id));
    }

    #[test]
    fn assign_rejects_a_booked_provider_without_touching_it() {
        let state = AppState::new(5.0, 16);
        let provider_id = seed_provider(&state, 1, 31.5210, 74.3590, ProviderStatus::Online);
        let first = seed_ride(&state);
        let second = seed_ride(&state);

        assign(&state, first, provider_id).unwrap();
        let err = assign(&state, second, provider_id).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let request = registry::get_request(&state, second).unwrap();
        assert_eq!(request.status, RequestStatus::Fetching);
        assert!(request.assigned_provider_id.is_none());

        let provider = state.providers.get(&provider_id).unwrap();
        assert_eq!(provider.active_request_id, Some(first));
    }

    #[test]
    fn assign_conflicts_when_the_referenced_vehicle_is_gone() {
        let state = AppState::new(5.0, 16);
        let provider_id = seed_provider(&state, 1, 31.5210, 74.3590, ProviderStatus::Online);
        state.providers.get_mut(&provider_id).unwrap().vehicle_reg =
            Some("LEB-0000".to_string());
        let request_id = seed_ride(&state);

        let err = assign(&state, request_id, provider_id).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let request = registry::get_request(&state, request_id).unwrap();
        assert_eq!(request.status, RequestStatus::Fetching);
        let provider = state.providers.get(&provider_id).unwrap();
        assert_eq!(provider.status, ProviderStatus::Online);
    }

    #[test]
    fn assign_rejects_vehicle_class_mismatch() {
        let state = AppState::new(5.0, 16);
        let provider_id = seed_provider(&state, 1, 31.5210, 74.3590, ProviderStatus::Online);
        state.providers.get_mut(&provider_id).unwrap().vehicle_class = VehicleClass::Mini;
        let request_id = seed_ride(&state);

        let err = assign(&state, request_id, provider_id).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
