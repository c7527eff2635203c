use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use glaciar_core::error::{EngineError, Rejection};
use glaciar_core::repository::ScheduleRepository;
use glaciar_core::schedule::{GeneratedSlot, Service};
use glaciar_core::timezone::studio_date;
use glaciar_schedule::generate;

/// Resolve-or-create: find the active slot for an exact start time, or
/// create it just-in-time when an availability rule justifies that time.
/// Kept as its own operation so the booking flow stays a plain pipeline.
pub struct SlotResolver {
    schedule: Arc<dyn ScheduleRepository>,
}

impl SlotResolver {
    pub fn new(schedule: Arc<dyn ScheduleRepository>) -> Self {
        Self { schedule }
    }

    /// Returns a slot with spare capacity, or `NoCapacity` when the slot
    /// exists but is full, or `InvalidSlot` when no rule produces this
    /// exact time.
    ///
    /// The returned capacity check is a soft gate only; confirmation-time
    /// CAS is what actually guards the counter.
    pub async fn resolve_or_create(
        &self,
        professional_id: Uuid,
        service: &Service,
        start_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<GeneratedSlot, EngineError> {
        if let Some(slot) = self
            .schedule
            .find_slot(professional_id, service.id, start_at)
            .await?
        {
            if slot.remaining_capacity() <= 0 {
                return Err(Rejection::NoCapacity.into());
            }
            return Ok(slot);
        }

        // Not materialized yet: only create it if the rules produce this
        // exact time (recurrence, lead time and horizon all re-checked).
        let rules = self.schedule.list_active_rules().await?;
        let date = studio_date(start_at);
        let candidate = generate(
            date,
            now,
            &rules,
            std::slice::from_ref(service),
            Some(professional_id),
            Some(service.id),
        )
        .into_iter()
        .find(|c| c.start_at == start_at)
        .ok_or(Rejection::InvalidSlot)?;

        debug!(%professional_id, service_id = %service.id, %start_at, "creating slot just-in-time");
        Ok(self.schedule.create_slot(&candidate).await?)
    }
}
