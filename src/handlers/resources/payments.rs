use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::WriteMode;
use crate::database::models::{OrderPaymentStatus, PaymentStatus, StringEnum};
use crate::database::record::{from_json, get_str, now_timestamp, value_as_i64, Record};
use crate::database::CrudOperations;
use crate::handlers::AppState;

/// Defaults on create; moving to `completed` stamps `paid_at`
pub fn prepare_payment(data: &mut Record, mode: WriteMode) {
    if mode == WriteMode::Create {
        data.entry("status").or_insert(Value::from(PaymentStatus::Pending.to_string()));
        data.entry("currency").or_insert(Value::from("XOF"));
    }
    let completed = get_str(data, "status") == Some(PaymentStatus::Completed.as_str());
    if completed && !data.contains_key("paid_at") {
        data.insert("paid_at".into(), Value::String(now_timestamp()));
    }
}

/// A completed payment marks its order as paid. Failures are logged only.
pub fn settle_order(state: AppState, payment: Record) -> BoxFuture<'static, ()> {
    async move {
        if get_str(&payment, "status") != Some(PaymentStatus::Completed.as_str()) {
            return;
        }
        let Some(order_id) = payment.get("order_id").and_then(value_as_i64) else {
            return;
        };

        let orders = CrudOperations::new("orders", state.store.clone());
        let patch = match from_json(json!({ "payment_status": OrderPaymentStatus::Paid })) {
            Ok(patch) => patch,
            Err(e) => {
                warn!("Could not build order patch: {}", e);
                return;
            }
        };
        match orders.update(order_id, patch).await {
            Ok(_) => info!("Order #{} marked as paid", order_id),
            Err(e) => warn!("Failed to mark order #{} as paid: {}", order_id, e),
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_payments_get_paid_at() {
        let mut data = from_json(json!({"amount": 5000, "status": "completed"})).unwrap();
        prepare_payment(&mut data, WriteMode::Create);
        assert!(data["paid_at"].is_string());
        assert_eq!(data["currency"], json!("XOF"));

        let mut data = from_json(json!({"amount": 5000})).unwrap();
        prepare_payment(&mut data, WriteMode::Create);
        assert_eq!(data["status"], json!("pending"));
        assert!(data.get("paid_at").is_none());
    }
}
