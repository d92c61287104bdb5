use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::pricing;
use crate::error::AppError;
use crate::geo::{haversine_km, valid_point};
use crate::lifecycle;
use crate::models::request::{
    GeoPoint, Place, RequestKind, RequestStatus, StatusEntry, TripRequest, VehicleClass,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewRequest {
    pub kind: RequestKind,
    pub customer_id: Uuid,
    pub origin: Option<Place>,
    pub destination: Option<Place>,
    pub vehicle_class: Option<VehicleClass>,
    pub weight_kg: Option<f64>,
    pub seats: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenRequestFilter {
    pub vehicle_class: Option<VehicleClass>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
}

/// Validates the input per kind, fixes the fare, and stores the request
/// with its initial `fetching` history entry.
pub fn create_request(state: &AppState, input: NewRequest) -> Result<TripRequest, AppError> {
    let (vehicle_class, fare) = match input.kind {
        RequestKind::Ride => {
            let (origin, destination) = require_route(&input)?;
            let class = match input.vehicle_class {
                Some(
                    class @ (VehicleClass::Mini | VehicleClass::Sedan | VehicleClass::Suv),
                ) => class,
                Some(_) => {
                    return Err(AppError::Validation(
                        "ride requests take a ride vehicle class".to_string(),
                    ));
                }
                None => {
                    return Err(AppError::Validation(
                        "vehicle_class is required for ride requests".to_string(),
                    ));
                }
            };
            let distance = haversine_km(&origin.point, &destination.point);
            (class, pricing::trip_fare(class, distance))
        }
        RequestKind::Freight => {
            let (origin, destination) = require_route(&input)?;
            let weight = input.weight_kg.ok_or_else(|| {
                AppError::Validation("weight_kg is required for freight requests".to_string())
            })?;
            if !weight.is_finite() || weight <= 0.0 {
                return Err(AppError::Validation(
                    "weight_kg must be a positive number".to_string(),
                ));
            }
            let class = pricing::freight_class(weight);
            let distance = haversine_km(&origin.point, &destination.point);
            (class, pricing::trip_fare(class, distance))
        }
        RequestKind::TourBooking => {
            let seats = input.seats.ok_or_else(|| {
                AppError::Validation("seats is required for tour bookings".to_string())
            })?;
            if seats == 0 {
                return Err(AppError::Validation("seats must be at least 1".to_string()));
            }
            // Tours have no route of their own, but a pickup point may
            // still be supplied and must be sane if it is.
            for place in input.origin.iter().chain(input.destination.iter()) {
                if !valid_point(&place.point) {
                    return Err(AppError::Validation(format!(
                        "coordinates for '{}' are out of range",
                        place.name
                    )));
                }
            }
            (VehicleClass::Coach, pricing::tour_fare(seats))
        }
    };

    let created_at = Utc::now();
    let request = TripRequest {
        id: Uuid::new_v4(),
        customer_id: input.customer_id,
        kind: input.kind,
        origin: input.origin,
        destination: input.destination,
        vehicle_class,
        status: RequestStatus::Fetching,
        assigned_provider_id: None,
        fare,
        created_at,
        status_history: vec![StatusEntry {
            status: RequestStatus::Fetching,
            actor_id: input.customer_id,
            at: created_at,
        }],
    };

    state.requests.insert(request.id, request.clone());
    state.metrics.open_requests.inc();

    Ok(request)
}

pub fn get_request(state: &AppState, id: Uuid) -> Result<TripRequest, AppError> {
    state
        .requests
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))
}

/// Appends a history row and advances the status, after checking the move
/// against the lifecycle table. Prior rows are never touched.
pub fn append_status(
    request: &mut TripRequest,
    to: RequestStatus,
    actor_id: Uuid,
) -> Result<(), AppError> {
    if !lifecycle::can_transition(request.status, to) {
        return Err(AppError::IllegalTransition(format!(
            "{} -> {} is not a legal transition",
            request.status.as_str(),
            to.as_str()
        )));
    }

    request.status_history.push(StatusEntry {
        status: to,
        actor_id,
        at: Utc::now(),
    });
    request.status = to;

    Ok(())
}

/// Snapshot of `fetching` requests matching the filter. Re-queryable, not
/// a live subscription; callers re-run it to pick up new demand.
pub fn list_open_requests(state: &AppState, filter: &OpenRequestFilter) -> Vec<TripRequest> {
    let center = match (filter.lat, filter.lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        _ => None,
    };

    let mut open: Vec<TripRequest> = state
        .requests
        .iter()
        .filter_map(|entry| {
            let request = entry.value();
            if request.status != RequestStatus::Fetching {
                return None;
            }
            if let Some(class) = filter.vehicle_class {
                if request.vehicle_class != class {
                    return None;
                }
            }
            if let (Some(center), Some(radius)) = (&center, filter.radius_km) {
                match &request.origin {
                    Some(origin) => {
                        if haversine_km(&origin.point, center) > radius {
                            return None;
                        }
                    }
                    None => return None,
                }
            }
            Some(request.clone())
        })
        .collect();

    open.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    open
}

fn require_route<'a>(input: &'a NewRequest) -> Result<(&'a Place, &'a Place), AppError> {
    let origin = input
        .origin
        .as_ref()
        .ok_or_else(|| AppError::Validation("origin is required".to_string()))?;
    let destination = input
        .destination
        .as_ref()
        .ok_or_else(|| AppError::Validation("destination is required".to_string()))?;

    for place in [origin, destination] {
        if place.name.trim().is_empty() {
            return Err(AppError::Validation(
                "place name cannot be empty".to_string(),
            ));
        }
        if !valid_point(&place.point) {
            return Err(AppError::Validation(format!(
                "coordinates for '{}' are out of range",
                place.name
            )));
        }
    }

    Ok((origin, destination))
}
