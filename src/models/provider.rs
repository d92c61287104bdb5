use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::request::{GeoPoint, VehicleClass};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Offline,
    Online,
    Booked,
}

/// A supply unit: a driver, freight rider, or tour operator.
///
/// `status` and `active_request_id` move together: `Booked` always carries
/// the id of the request holding the provider, and `Offline`/`Online`
/// always carry `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    /// Rent-a-car or tour-company account, if the provider is fleet-owned.
    pub owner_id: Option<Uuid>,
    pub vehicle_class: VehicleClass,
    pub vehicle_reg: Option<String>,
    pub status: ProviderStatus,
    pub location: GeoPoint,
    pub active_request_id: Option<Uuid>,
    pub rating: f64,
    pub rating_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    /// Folds a new rating into the running mean.
    pub fn apply_rating(&mut self, value: f64) {
        let value = value.clamp(0.0, 5.0);
        let total = self.rating * self.rating_count as f64 + value;
        self.rating_count += 1;
        self.rating = total / self.rating_count as f64;
    }
}
