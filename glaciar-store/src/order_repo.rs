use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use glaciar_core::error::BoxError;
use glaciar_core::package::{OrderStatus, PackageOrder};
use glaciar_core::repository::OrderRepository;

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    package_id: Uuid,
    buyer_name: String,
    buyer_email: String,
    buyer_phone: Option<String>,
    status: String,
    coupon_id: Option<Uuid>,
    original_price: i64,
    discount_amount: i64,
    final_price: i64,
    payment_id: Option<String>,
    preference_id: Option<String>,
    status_detail: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(status: &str) -> Result<OrderStatus, BoxError> {
    match status {
        "created" => Ok(OrderStatus::Created),
        "pending_payment" => Ok(OrderStatus::PendingPayment),
        "paid" => Ok(OrderStatus::Paid),
        "failed" => Ok(OrderStatus::Failed),
        "cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(format!("unknown order status: {other}").into()),
    }
}

impl OrderRow {
    fn into_order(self) -> Result<PackageOrder, BoxError> {
        Ok(PackageOrder {
            id: self.id,
            package_id: self.package_id,
            buyer_name: self.buyer_name,
            buyer_email: self.buyer_email,
            buyer_phone: self.buyer_phone,
            status: parse_status(&self.status)?,
            coupon_id: self.coupon_id,
            original_price: self.original_price,
            discount_amount: self.discount_amount,
            final_price: self.final_price,
            payment_id: self.payment_id,
            preference_id: self.preference_id,
            status_detail: self.status_detail,
            paid_at: self.paid_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, package_id, buyer_name, buyer_email, buyer_phone, status, \
    coupon_id, original_price, discount_amount, final_price, payment_id, preference_id, \
    status_detail, paid_at, created_at, updated_at";

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn insert(&self, order: &PackageOrder) -> Result<(), BoxError> {
        sqlx::query(
            "INSERT INTO package_orders \
             (id, package_id, buyer_name, buyer_email, buyer_phone, status, coupon_id, \
              original_price, discount_amount, final_price, payment_id, preference_id, \
              status_detail) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(order.id)
        .bind(order.package_id)
        .bind(&order.buyer_name)
        .bind(&order.buyer_email)
        .bind(&order.buyer_phone)
        .bind(order.status.as_str())
        .bind(order.coupon_id)
        .bind(order.original_price)
        .bind(order.discount_amount)
        .bind(order.final_price)
        .bind(&order.payment_id)
        .bind(&order.preference_id)
        .bind(&order.status_detail)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PackageOrder>, BoxError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM package_orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(OrderRow::into_order).transpose()
    }

    async fn set_preference(&self, id: Uuid, preference_id: &str) -> Result<(), BoxError> {
        sqlx::query(
            "UPDATE package_orders SET preference_id = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(preference_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn try_mark_paid(
        &self,
        id: Uuid,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE package_orders \
             SET status = 'paid', payment_id = $1, paid_at = $2, updated_at = NOW() \
             WHERE id = $3 AND status IN ('created', 'pending_payment')",
        )
        .bind(payment_id)
        .bind(paid_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_pending(
        &self,
        id: Uuid,
        payment_id: &str,
        detail: &str,
    ) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE package_orders \
             SET status = 'pending_payment', payment_id = $1, status_detail = $2, \
                 updated_at = NOW() \
             WHERE id = $3 AND status IN ('created', 'pending_payment')",
        )
        .bind(payment_id)
        .bind(detail)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn try_mark_failed(
        &self,
        id: Uuid,
        payment_id: Option<&str>,
        detail: &str,
    ) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE package_orders \
             SET status = 'failed', payment_id = COALESCE($1, payment_id), \
                 status_detail = $2, updated_at = NOW() \
             WHERE id = $3 AND status IN ('created', 'pending_payment')",
        )
        .bind(payment_id)
        .bind(detail)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
