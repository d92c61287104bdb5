use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::request::RequestStatus;

/// Emitted on every successful status transition. Consumed by the
/// notification dispatcher and any connected WebSocket clients; delivery
/// is best-effort and never rolls back the transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub request_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub new_status: RequestStatus,
    pub at: DateTime<Utc>,
}
