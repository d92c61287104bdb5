use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Idle,
    Booked,
}

/// A fleet vehicle, keyed by registration number. Its booking state
/// mirrors whichever request currently holds its provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub registration: String,
    pub owner_id: Uuid,
    pub status: VehicleStatus,
    pub active_request_id: Option<Uuid>,
}
