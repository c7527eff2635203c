use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use glaciar_core::error::{EngineError, Rejection};
use glaciar_core::gateway::{CheckoutRequest, PaymentGateway};
use glaciar_core::package::{OrderStatus, PackageOrder};
use glaciar_core::repository::{CatalogRepository, CouponRepository, OrderRepository};

use crate::coupons::apply_coupon;
use crate::engine::CheckoutUrls;

#[derive(Debug, Clone)]
pub struct PurchasePackageRequest {
    pub package_id: Uuid,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub order_id: Uuid,
    pub init_point: String,
}

/// Package/gift-card purchase initiation. The order is created in `created`
/// status; the webhook reconciler moves it to `paid` and cuts the codes.
pub struct PackageService {
    catalog: Arc<dyn CatalogRepository>,
    orders: Arc<dyn OrderRepository>,
    coupons: Arc<dyn CouponRepository>,
    gateway: Arc<dyn PaymentGateway>,
    urls: CheckoutUrls,
}

impl PackageService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        orders: Arc<dyn OrderRepository>,
        coupons: Arc<dyn CouponRepository>,
        gateway: Arc<dyn PaymentGateway>,
        urls: CheckoutUrls,
    ) -> Self {
        Self { catalog, orders, coupons, gateway, urls }
    }

    pub async fn purchase(
        &self,
        request: PurchasePackageRequest,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOutcome, EngineError> {
        let package = self
            .catalog
            .get_package(request.package_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(Rejection::PackageNotFound)?;

        // Server-side price only; the coupon usage counter for orders is
        // bumped at paid time by the reconciler, not here.
        let original_price = package.price;
        let mut coupon_id = None;
        let mut discount_amount = 0;
        if let Some(coupon_code) = request.coupon_code.as_deref() {
            let coupon = self
                .coupons
                .find_by_code(coupon_code)
                .await?
                .ok_or_else(|| Rejection::CouponInvalid("el cupón no existe".into()))?;
            let applied = apply_coupon(&coupon, original_price, Some(package.id), now)?;
            coupon_id = Some(applied.coupon_id);
            discount_amount = applied.discount_amount;
        }
        let final_price = (original_price - discount_amount).max(0);

        let order = PackageOrder {
            id: Uuid::new_v4(),
            package_id: package.id,
            buyer_name: request.buyer_name,
            buyer_email: request.buyer_email,
            buyer_phone: request.buyer_phone,
            status: OrderStatus::Created,
            coupon_id,
            original_price,
            discount_amount,
            final_price,
            payment_id: None,
            preference_id: None,
            status_detail: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(&order).await?;

        let preference = self
            .gateway
            .create_preference(&CheckoutRequest {
                external_reference: format!("order:{}", order.id),
                title: package.name.clone(),
                amount: final_price,
                payer_email: order.buyer_email.clone(),
                success_url: self.urls.success.clone(),
                failure_url: self.urls.failure.clone(),
                pending_url: self.urls.pending.clone(),
                notification_url: self.urls.notification.clone(),
            })
            .await?;
        self.orders.set_preference(order.id, &preference.id).await?;

        info!(order_id = %order.id, package = %package.name, "package order created");
        Ok(PurchaseOutcome { order_id: order.id, init_point: preference.init_point })
    }
}
