use chrono::{DateTime, Utc};
use uuid::Uuid;

use glaciar_core::coupon::DiscountCoupon;
use glaciar_core::error::Rejection;

/// Result of applying a coupon to a server-side price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDiscount {
    pub coupon_id: Uuid,
    pub discount_amount: i64,
    pub final_price: i64,
}

/// Validate a coupon against an amount and compute the discounted price.
/// `package_id` is set only for package purchases; the allowed-package
/// restriction is ignored for plain bookings.
pub fn apply_coupon(
    coupon: &DiscountCoupon,
    amount: i64,
    package_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<AppliedDiscount, Rejection> {
    if !coupon.is_active {
        return Err(Rejection::CouponInvalid("el cupón no está activo".into()));
    }
    if coupon.valid_from.is_some_and(|from| now < from) {
        return Err(Rejection::CouponInvalid("el cupón aún no es válido".into()));
    }
    if coupon.valid_until.is_some_and(|until| now > until) {
        return Err(Rejection::CouponInvalid("el cupón está vencido".into()));
    }
    if coupon.max_uses.is_some_and(|max| coupon.current_uses >= max) {
        return Err(Rejection::CouponInvalid("el cupón alcanzó su límite de usos".into()));
    }
    if coupon.min_purchase_amount.is_some_and(|min| amount < min) {
        return Err(Rejection::CouponInvalid("no se alcanza el monto mínimo de compra".into()));
    }
    if let Some(package_id) = package_id {
        if !coupon.allowed_package_ids.is_empty()
            && !coupon.allowed_package_ids.contains(&package_id)
        {
            return Err(Rejection::CouponInvalid("el cupón no aplica a este paquete".into()));
        }
    }

    let discount_amount = coupon.discount_for(amount);
    Ok(AppliedDiscount {
        coupon_id: coupon.id,
        discount_amount,
        final_price: (amount - discount_amount).max(0),
    })
}
