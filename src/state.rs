use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::event::TransitionEvent;
use crate::models::provider::Provider;
use crate::models::request::TripRequest;
use crate::models::vehicle::Vehicle;
use crate::observability::metrics::Metrics;

/// Shared in-process store. Multi-record mutations (assignment, release)
/// take entry guards in a fixed order — request, then provider, then
/// vehicle — so concurrent writers serialize instead of deadlocking.
pub struct AppState {
    pub requests: DashMap<Uuid, TripRequest>,
    pub providers: DashMap<Uuid, Provider>,
    pub vehicles: DashMap<String, Vehicle>,
    pub transition_events_tx: broadcast::Sender<TransitionEvent>,
    pub match_radius_km: f64,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(match_radius_km: f64, event_buffer_size: usize) -> Self {
        let (transition_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            requests: DashMap::new(),
            providers: DashMap::new(),
            vehicles: DashMap::new(),
            transition_events_tx,
            match_radius_km,
            metrics: Metrics::new(),
        }
    }
}
