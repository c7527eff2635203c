use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use glaciar_payments::signature::parse_signature_header;
use glaciar_payments::{PaymentNotification, WebhookAck};

use crate::state::AppState;

/// Body of a gateway notification. Only used to locate the payment; the
/// reconciler re-fetches everything from the gateway API.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookBody {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub action: Option<String>,
    pub data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub id: serde_json::Value,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_webhook))
}

/// The gateway notifies in two shapes: query-string (`?topic=payment&id=N`
/// or `?type=payment&data.id=N`) and JSON body. Accept both.
fn extract_notification(
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    body: &WebhookBody,
) -> Option<PaymentNotification> {
    let topic = query
        .get("type")
        .or_else(|| query.get("topic"))
        .cloned()
        .or_else(|| body.type_.clone())?;

    let payment_id = query
        .get("data.id")
        .or_else(|| query.get("id"))
        .cloned()
        .or_else(|| {
            body.data.as_ref().map(|d| match &d.id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })?;

    let signature = headers
        .get("x-signature")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_signature_header);
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    Some(PaymentNotification { topic, payment_id, request_id, signature })
}

/// POST /v1/webhooks/payments
/// Receive payment status updates from the gateway. Any 2xx acknowledges;
/// a 5xx asks the gateway to redeliver.
async fn handle_payment_webhook(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Option<Json<WebhookBody>>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let Some(notification) = extract_notification(&query, &headers, &body) else {
        tracing::info!("webhook without topic or payment id, acknowledging");
        return Ok((StatusCode::OK, Json(json!({ "status": "ignored" }))));
    };

    tracing::info!(
        topic = %notification.topic,
        payment_id = %notification.payment_id,
        "payment webhook received"
    );

    let ack = state
        .reconciler
        .handle_notification(notification, Utc::now())
        .await
        .map_err(|e| {
            tracing::error!("webhook processing failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let (status, label) = match ack {
        WebhookAck::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
        WebhookAck::Ignored => (StatusCode::OK, "ignored"),
        WebhookAck::Processed => (StatusCode::OK, "processed"),
        WebhookAck::AlreadyProcessed => (StatusCode::OK, "already_processed"),
        WebhookAck::Pending => (StatusCode::OK, "pending"),
        WebhookAck::Failed => (StatusCode::OK, "failed"),
    };

    Ok((status, Json(json!({ "status": label }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert("x-signature", "ts=1700000000,v1=abcd".parse().unwrap());
        h.insert("x-request-id", "req-9".parse().unwrap());
        h
    }

    #[test]
    fn new_style_query_is_parsed() {
        let mut query = HashMap::new();
        query.insert("type".to_string(), "payment".to_string());
        query.insert("data.id".to_string(), "12345".to_string());

        let n = extract_notification(&query, &headers(), &WebhookBody::default()).unwrap();
        assert_eq!(n.topic, "payment");
        assert_eq!(n.payment_id, "12345");
        assert_eq!(n.request_id.as_deref(), Some("req-9"));
        assert_eq!(n.signature.unwrap().ts, "1700000000");
    }

    #[test]
    fn legacy_query_is_parsed() {
        let mut query = HashMap::new();
        query.insert("topic".to_string(), "payment".to_string());
        query.insert("id".to_string(), "777".to_string());

        let n = extract_notification(&query, &HeaderMap::new(), &WebhookBody::default()).unwrap();
        assert_eq!(n.payment_id, "777");
        assert!(n.signature.is_none());
    }

    #[test]
    fn json_body_with_numeric_id_is_parsed() {
        let body = WebhookBody {
            type_: Some("payment".into()),
            action: Some("payment.updated".into()),
            data: Some(WebhookData { id: json!(9981) }),
        };

        let n = extract_notification(&HashMap::new(), &HeaderMap::new(), &body).unwrap();
        assert_eq!(n.payment_id, "9981");
    }

    #[test]
    fn missing_payment_id_yields_none() {
        let mut query = HashMap::new();
        query.insert("type".to_string(), "payment".to_string());

        assert!(extract_notification(&query, &HeaderMap::new(), &WebhookBody::default()).is_none());
    }
}
