use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use glaciar_core::coupon::{DiscountCoupon, DiscountType};
use glaciar_core::error::BoxError;
use glaciar_core::repository::CouponRepository;

pub struct StoreCouponRepository {
    pool: PgPool,
}

impl StoreCouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    discount_type: String,
    discount_value: i64,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    max_uses: Option<i32>,
    current_uses: i32,
    min_purchase_amount: Option<i64>,
    allowed_package_ids: Vec<Uuid>,
    is_active: bool,
}

impl CouponRow {
    fn into_coupon(self) -> Result<DiscountCoupon, BoxError> {
        let discount_type = match self.discount_type.as_str() {
            "percentage" => DiscountType::Percentage,
            "fixed" => DiscountType::Fixed,
            other => return Err(format!("unknown discount type: {other}").into()),
        };
        Ok(DiscountCoupon {
            id: self.id,
            code: self.code,
            discount_type,
            discount_value: self.discount_value,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            max_uses: self.max_uses,
            current_uses: self.current_uses,
            min_purchase_amount: self.min_purchase_amount,
            allowed_package_ids: self.allowed_package_ids,
            is_active: self.is_active,
        })
    }
}

#[async_trait]
impl CouponRepository for StoreCouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCoupon>, BoxError> {
        let row = sqlx::query_as::<_, CouponRow>(
            "SELECT id, code, discount_type, discount_value, valid_from, valid_until, \
             max_uses, current_uses, min_purchase_amount, allowed_package_ids, is_active \
             FROM discount_coupons WHERE UPPER(code) = UPPER($1)",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CouponRow::into_coupon).transpose()
    }

    async fn increment_uses(&self, id: Uuid) -> Result<(), BoxError> {
        sqlx::query("UPDATE discount_coupons SET current_uses = current_uses + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
