use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// Percentage or fixed-amount discount with usage cap, validity window,
/// minimum purchase, and optional package restriction list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCoupon {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub min_purchase_amount: Option<i64>,
    /// When non-empty, the coupon only applies to these packages.
    pub allowed_package_ids: Vec<Uuid>,
    pub is_active: bool,
}

impl DiscountCoupon {
    /// Discount for a given price: percentage floors, fixed is capped so the
    /// discount never exceeds the price.
    pub fn discount_for(&self, price: i64) -> i64 {
        match self.discount_type {
            DiscountType::Percentage => price * self.discount_value / 100,
            DiscountType::Fixed => self.discount_value.min(price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon(discount_type: DiscountType, value: i64) -> DiscountCoupon {
        DiscountCoupon {
            id: Uuid::new_v4(),
            code: "FRIO20".to_string(),
            discount_type,
            discount_value: value,
            valid_from: None,
            valid_until: None,
            max_uses: None,
            current_uses: 0,
            min_purchase_amount: None,
            allowed_package_ids: vec![],
            is_active: true,
        }
    }

    #[test]
    fn percentage_discount_floors() {
        let c = coupon(DiscountType::Percentage, 20);
        assert_eq!(c.discount_for(30000), 6000);
        // 15% of 999 floors to 149.
        let c = coupon(DiscountType::Percentage, 15);
        assert_eq!(c.discount_for(999), 149);
    }

    #[test]
    fn fixed_discount_never_exceeds_price() {
        let c = coupon(DiscountType::Fixed, 5000);
        assert_eq!(c.discount_for(30000), 5000);
        assert_eq!(c.discount_for(3000), 3000);
    }
}
