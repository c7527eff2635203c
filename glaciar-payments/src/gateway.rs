use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use glaciar_core::error::BoxError;
use glaciar_core::gateway::{
    CheckoutPreference, CheckoutRequest, GatewayPayment, GatewayPaymentStatus, PaymentGateway,
};

/// Mercado-Pago-style REST client: hosted checkout preferences plus the
/// payment-lookup endpoint the webhook reconciler trusts for amount/status.
pub struct MercadoPagoClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PreferenceDto {
    id: String,
    init_point: String,
}

#[derive(Debug, Deserialize)]
struct PaymentDto {
    id: i64,
    status: String,
    status_detail: Option<String>,
    transaction_amount: f64,
    external_reference: Option<String>,
}

impl MercadoPagoClient {
    pub fn new(base_url: String, access_token: String) -> Self {
        Self { http: reqwest::Client::new(), base_url, access_token }
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_preference(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutPreference, BoxError> {
        let body = json!({
            "items": [{
                "title": request.title,
                "quantity": 1,
                "currency_id": "CLP",
                "unit_price": request.amount,
            }],
            "payer": { "email": request.payer_email },
            "external_reference": request.external_reference,
            "back_urls": {
                "success": request.success_url,
                "failure": request.failure_url,
                "pending": request.pending_url,
            },
            "auto_return": "approved",
            "notification_url": request.notification_url,
        });

        let response = self
            .http
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let dto: PreferenceDto = response.json().await?;
        debug!(preference = %dto.id, "checkout preference created");
        Ok(CheckoutPreference { id: dto.id, init_point: dto.init_point })
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, BoxError> {
        let response = self
            .http
            .get(format!("{}/v1/payments/{payment_id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?;

        let dto: PaymentDto = response.json().await?;
        Ok(GatewayPayment {
            id: dto.id.to_string(),
            status: GatewayPaymentStatus::parse(&dto.status),
            status_detail: dto.status_detail,
            // CLP has no decimals; the API still reports a float.
            transaction_amount: dto.transaction_amount.round() as i64,
            external_reference: dto.external_reference,
        })
    }
}
