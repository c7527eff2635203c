use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use glaciar_core::error::BoxError;
use glaciar_core::package::SessionCode;
use glaciar_core::repository::SessionCodeRepository;

pub struct StoreSessionCodeRepository {
    pool: PgPool,
}

impl StoreSessionCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CodeRow {
    id: Uuid,
    code: String,
    order_id: Uuid,
    payment_id: Option<String>,
    applicable_service_ids: Vec<Uuid>,
    buyer_email: String,
    purchased_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_used: bool,
    used_in_booking_id: Option<Uuid>,
    used_at: Option<DateTime<Utc>>,
    gift_token: Option<String>,
}

impl From<CodeRow> for SessionCode {
    fn from(row: CodeRow) -> Self {
        SessionCode {
            id: row.id,
            code: row.code,
            order_id: row.order_id,
            payment_id: row.payment_id,
            applicable_service_ids: row.applicable_service_ids,
            buyer_email: row.buyer_email,
            purchased_at: row.purchased_at,
            expires_at: row.expires_at,
            is_used: row.is_used,
            used_in_booking_id: row.used_in_booking_id,
            used_at: row.used_at,
            gift_token: row.gift_token,
        }
    }
}

const CODE_COLUMNS: &str = "id, code, order_id, payment_id, applicable_service_ids, \
    buyer_email, purchased_at, expires_at, is_used, used_in_booking_id, used_at, gift_token";

#[async_trait]
impl SessionCodeRepository for StoreSessionCodeRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<SessionCode>, BoxError> {
        let sql = format!("SELECT {CODE_COLUMNS} FROM session_codes WHERE code = $1");
        let row = sqlx::query_as::<_, CodeRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(SessionCode::from))
    }

    async fn get(&self, id: Uuid) -> Result<Option<SessionCode>, BoxError> {
        let sql = format!("SELECT {CODE_COLUMNS} FROM session_codes WHERE id = $1");
        let row = sqlx::query_as::<_, CodeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(SessionCode::from))
    }

    async fn try_mark_used(
        &self,
        id: Uuid,
        booking_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE session_codes \
             SET is_used = TRUE, used_in_booking_id = $1, used_at = $2 \
             WHERE id = $3 AND is_used = FALSE",
        )
        .bind(booking_id)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn try_release(&self, id: Uuid) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE session_codes \
             SET is_used = FALSE, used_in_booking_id = NULL, used_at = NULL \
             WHERE id = $1 AND is_used = TRUE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_batch(&self, codes: &[SessionCode]) -> Result<(), BoxError> {
        let mut tx = self.pool.begin().await?;

        for code in codes {
            sqlx::query(
                "INSERT INTO session_codes \
                 (id, code, order_id, payment_id, applicable_service_ids, buyer_email, \
                  purchased_at, expires_at, gift_token) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(code.id)
            .bind(&code.code)
            .bind(code.order_id)
            .bind(&code.payment_id)
            .bind(&code.applicable_service_ids)
            .bind(&code.buyer_email)
            .bind(code.purchased_at)
            .bind(code.expires_at)
            .bind(&code.gift_token)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn code_exists(&self, code: &str) -> Result<bool, BoxError> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM session_codes WHERE code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;

        Ok(row.0)
    }

    async fn unused_count_for_payment(&self, payment_id: &str) -> Result<i64, BoxError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM session_codes WHERE payment_id = $1 AND is_used = FALSE",
        )
        .bind(payment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}
