use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use glaciar_core::error::BoxError;
use glaciar_core::repository::ScheduleRepository;
use glaciar_core::schedule::{
    AvailabilityRule, CandidateSlot, GeneratedSlot, RecurrenceKind,
};

pub struct StoreScheduleRepository {
    pool: PgPool,
}

impl StoreScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    id: Uuid,
    professional_id: Uuid,
    service_id: Uuid,
    recurrence: String,
    day_of_week: Option<i16>,
    specific_date: Option<NaiveDate>,
    start_time: NaiveTime,
    end_time: NaiveTime,
    duration_minutes: i64,
    max_days_in_future: i64,
    min_hours_before_booking: i64,
    is_active: bool,
}

impl RuleRow {
    fn into_rule(self) -> Result<AvailabilityRule, BoxError> {
        let recurrence = match self.recurrence.as_str() {
            "WEEKLY" => RecurrenceKind::Weekly,
            "ONCE" => RecurrenceKind::Once,
            other => return Err(format!("unknown recurrence kind: {other}").into()),
        };
        Ok(AvailabilityRule {
            id: self.id,
            professional_id: self.professional_id,
            service_id: self.service_id,
            recurrence,
            day_of_week: self.day_of_week.map(|d| d as u8),
            specific_date: self.specific_date,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            max_days_in_future: self.max_days_in_future,
            min_hours_before_booking: self.min_hours_before_booking,
            is_active: self.is_active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SlotRow {
    id: Uuid,
    professional_id: Uuid,
    service_id: Uuid,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    max_capacity: i32,
    confirmed_bookings: i32,
    is_active: bool,
}

impl From<SlotRow> for GeneratedSlot {
    fn from(row: SlotRow) -> Self {
        GeneratedSlot {
            id: row.id,
            professional_id: row.professional_id,
            service_id: row.service_id,
            start_at: row.start_at,
            end_at: row.end_at,
            max_capacity: row.max_capacity,
            confirmed_bookings: row.confirmed_bookings,
            is_active: row.is_active,
        }
    }
}

const SLOT_COLUMNS: &str = "id, professional_id, service_id, start_at, end_at, \
                            max_capacity, confirmed_bookings, is_active";

#[async_trait]
impl ScheduleRepository for StoreScheduleRepository {
    async fn list_active_rules(&self) -> Result<Vec<AvailabilityRule>, BoxError> {
        let rows = sqlx::query_as::<_, RuleRow>(
            "SELECT id, professional_id, service_id, recurrence, day_of_week, \
             specific_date, start_time, end_time, duration_minutes, \
             max_days_in_future, min_hours_before_booking, is_active \
             FROM availability_rules WHERE is_active",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RuleRow::into_rule).collect()
    }

    async fn slots_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        professional_id: Option<Uuid>,
        service_id: Option<Uuid>,
    ) -> Result<Vec<GeneratedSlot>, BoxError> {
        let sql = format!(
            "SELECT {SLOT_COLUMNS} FROM slots \
             WHERE is_active AND start_at >= $1 AND start_at < $2 \
             AND ($3::uuid IS NULL OR professional_id = $3) \
             AND ($4::uuid IS NULL OR service_id = $4) \
             ORDER BY start_at"
        );
        let rows = sqlx::query_as::<_, SlotRow>(&sql)
            .bind(from)
            .bind(to)
            .bind(professional_id)
            .bind(service_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(GeneratedSlot::from).collect())
    }

    async fn find_slot(
        &self,
        professional_id: Uuid,
        service_id: Uuid,
        start_at: DateTime<Utc>,
    ) -> Result<Option<GeneratedSlot>, BoxError> {
        let sql = format!(
            "SELECT {SLOT_COLUMNS} FROM slots \
             WHERE is_active AND professional_id = $1 AND service_id = $2 AND start_at = $3"
        );
        let row = sqlx::query_as::<_, SlotRow>(&sql)
            .bind(professional_id)
            .bind(service_id)
            .bind(start_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(GeneratedSlot::from))
    }

    async fn get_slot(&self, id: Uuid) -> Result<Option<GeneratedSlot>, BoxError> {
        let sql = format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id = $1");
        let row = sqlx::query_as::<_, SlotRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(GeneratedSlot::from))
    }

    async fn insert_slots(&self, slots: &[CandidateSlot]) -> Result<u64, BoxError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        // The partial unique index on (professional_id, service_id, start_at)
        // makes reruns of the materializer harmless.
        for slot in slots {
            let result = sqlx::query(
                "INSERT INTO slots \
                 (id, professional_id, service_id, start_at, end_at, max_capacity) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(slot.professional_id)
            .bind(slot.service_id)
            .bind(slot.start_at)
            .bind(slot.end_at)
            .bind(slot.max_capacity)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn create_slot(&self, slot: &CandidateSlot) -> Result<GeneratedSlot, BoxError> {
        let sql = format!(
            "INSERT INTO slots \
             (id, professional_id, service_id, start_at, end_at, max_capacity) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (professional_id, service_id, start_at) WHERE is_active \
             DO UPDATE SET updated_at = NOW() \
             RETURNING {SLOT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SlotRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(slot.professional_id)
            .bind(slot.service_id)
            .bind(slot.start_at)
            .bind(slot.end_at)
            .bind(slot.max_capacity)
            .fetch_one(&self.pool)
            .await?;

        Ok(GeneratedSlot::from(row))
    }

    async fn try_consume_capacity(&self, slot_id: Uuid) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE slots \
             SET confirmed_bookings = confirmed_bookings + 1, updated_at = NOW() \
             WHERE id = $1 AND is_active AND confirmed_bookings < max_capacity",
        )
        .bind(slot_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn release_capacity(&self, slot_id: Uuid) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE slots \
             SET confirmed_bookings = confirmed_bookings - 1, updated_at = NOW() \
             WHERE id = $1 AND confirmed_bookings > 0",
        )
        .bind(slot_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
