use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A geocoordinate with the human-readable name shown to customers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub point: GeoPoint,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Ride,
    Freight,
    TourBooking,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    Mini,
    Sedan,
    Suv,
    LightFreight,
    MediumFreight,
    HeavyFreight,
    Coach,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Fetching,
    Assigned,
    Arrived,
    Ongoing,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Fetching => "fetching",
            RequestStatus::Assigned => "assigned",
            RequestStatus::Arrived => "arrived",
            RequestStatus::Ongoing => "ongoing",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

/// One row of the append-only status log. Rows are only ever pushed,
/// never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: RequestStatus,
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRequest {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub kind: RequestKind,
    pub origin: Option<Place>,
    pub destination: Option<Place>,
    pub vehicle_class: VehicleClass,
    pub status: RequestStatus,
    pub assigned_provider_id: Option<Uuid>,
    /// Fare in rupees, fixed at creation.
    pub fare: i64,
    pub created_at: DateTime<Utc>,
    pub status_history: Vec<StatusEntry>,
}
