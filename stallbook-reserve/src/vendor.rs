use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use stallbook_core::repository::ReservationRepository;
use stallbook_core::{CoreError, CoreResult};
use stallbook_shared::models::messages::{VendorReservationRow, STATUS_FAILED, STATUS_SUCCESS};

/// Serves `get-vendor-reservations` requests arriving from the identity
/// service: looks up the vendor's reservations with stall and fair names
/// joined in, and shapes the reply envelope.
pub struct VendorReservationService {
    reservations: Arc<dyn ReservationRepository>,
}

impl VendorReservationService {
    pub fn new(reservations: Arc<dyn ReservationRepository>) -> Self {
        Self { reservations }
    }

    pub async fn list(&self, vendor_id: Uuid) -> CoreResult<Vec<VendorReservationRow>> {
        self.reservations.list_for_vendor(vendor_id).await
    }

    /// Handle one raw request payload and produce the reply payload. Always
    /// returns an envelope — a bad request or a repository error becomes a
    /// FAILED reply rather than silence, so the asking side is never left to
    /// time out on our account.
    pub async fn handle_request(&self, payload: &str) -> Value {
        let request: Value = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(e) => return failure_reply(None, &format!("invalid request payload: {}", e)),
        };
        let correlation_id = request.get("correlationId").and_then(Value::as_str).map(str::to_string);
        let vendor_id = request
            .get("vendorId")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok());

        let Some(vendor_id) = vendor_id else {
            return failure_reply(correlation_id.as_deref(), "missing or invalid vendorId");
        };

        match self.list(vendor_id).await {
            Ok(rows) => json!({
                "correlationId": correlation_id,
                "reservations": rows,
                "status": STATUS_SUCCESS,
                "message": "ok",
            }),
            Err(CoreError::NotFound(msg)) => failure_reply(correlation_id.as_deref(), &msg),
            Err(e) => {
                tracing::error!(vendor_id = %vendor_id, "Vendor reservation lookup failed: {}", e);
                failure_reply(correlation_id.as_deref(), "reservation lookup failed")
            }
        }
    }
}

fn failure_reply(correlation_id: Option<&str>, message: &str) -> Value {
    json!({
        "correlationId": correlation_id,
        "reservations": [],
        "status": STATUS_FAILED,
        "message": message,
    })
}
