use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use glaciar_core::booking::{Booking, BookingStatus, Customer};
use glaciar_core::error::BoxError;
use glaciar_core::repository::BookingRepository;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    professional_id: Uuid,
    service_id: Uuid,
    slot_id: Uuid,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    status: String,
    coupon_id: Option<Uuid>,
    session_code_id: Option<Uuid>,
    original_price: i64,
    discount_amount: i64,
    final_price: i64,
    payment_id: Option<String>,
    preference_id: Option<String>,
    status_detail: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(status: &str) -> Result<BookingStatus, BoxError> {
    match status {
        "PENDING_PAYMENT" => Ok(BookingStatus::PendingPayment),
        "CONFIRMED" => Ok(BookingStatus::Confirmed),
        "CANCELLED" => Ok(BookingStatus::Cancelled),
        "COMPLETED" => Ok(BookingStatus::Completed),
        other => Err(format!("unknown booking status: {other}").into()),
    }
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, BoxError> {
        Ok(Booking {
            id: self.id,
            professional_id: self.professional_id,
            service_id: self.service_id,
            slot_id: self.slot_id,
            customer: Customer {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
            },
            start_at: self.start_at,
            end_at: self.end_at,
            status: parse_status(&self.status)?,
            coupon_id: self.coupon_id,
            session_code_id: self.session_code_id,
            original_price: self.original_price,
            discount_amount: self.discount_amount,
            final_price: self.final_price,
            payment_id: self.payment_id,
            preference_id: self.preference_id,
            status_detail: self.status_detail,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, professional_id, service_id, slot_id, customer_name, \
    customer_email, customer_phone, start_at, end_at, status, coupon_id, session_code_id, \
    original_price, discount_amount, final_price, payment_id, preference_id, status_detail, \
    created_at, updated_at";

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), BoxError> {
        sqlx::query(
            "INSERT INTO bookings \
             (id, professional_id, service_id, slot_id, customer_name, customer_email, \
              customer_phone, start_at, end_at, status, coupon_id, session_code_id, \
              original_price, discount_amount, final_price, payment_id, preference_id, \
              status_detail) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                     $16, $17, $18)",
        )
        .bind(booking.id)
        .bind(booking.professional_id)
        .bind(booking.service_id)
        .bind(booking.slot_id)
        .bind(&booking.customer.name)
        .bind(&booking.customer.email)
        .bind(&booking.customer.phone)
        .bind(booking.start_at)
        .bind(booking.end_at)
        .bind(booking.status.as_str())
        .bind(booking.coupon_id)
        .bind(booking.session_code_id)
        .bind(booking.original_price)
        .bind(booking.discount_amount)
        .bind(booking.final_price)
        .bind(&booking.payment_id)
        .bind(&booking.preference_id)
        .bind(&booking.status_detail)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BoxError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn set_preference(&self, id: Uuid, preference_id: &str) -> Result<(), BoxError> {
        sqlx::query("UPDATE bookings SET preference_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(preference_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn try_confirm(&self, id: Uuid, payment_id: &str) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE bookings \
             SET status = 'CONFIRMED', payment_id = $1, updated_at = NOW() \
             WHERE id = $2 AND status = 'PENDING_PAYMENT'",
        )
        .bind(payment_id)
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
            "UPDATE bookings \
             SET payment_id = $1, status_detail = $2, updated_at = NOW() \
             WHERE id = $3 AND status = 'PENDING_PAYMENT'",
        )
        .bind(payment_id)
        .bind(detail)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn try_cancel_pending(
        &self,
        id: Uuid,
        payment_id: Option<&str>,
        detail: &str,
    ) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE bookings \
             SET status = 'CANCELLED', payment_id = COALESCE($1, payment_id), \
                 status_detail = $2, updated_at = NOW() \
             WHERE id = $3 AND status = 'PENDING_PAYMENT'",
        )
        .bind(payment_id)
        .bind(detail)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn try_cancel(&self, id: Uuid, detail: &str) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE bookings \
             SET status = 'CANCELLED', status_detail = $1, updated_at = NOW() \
             WHERE id = $2 AND status IN ('PENDING_PAYMENT', 'CONFIRMED')",
        )
        .bind(detail)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
