use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use glaciar_core::error::BoxError;
use glaciar_core::repository::{CatalogRepository, ScheduleRepository};
use glaciar_core::schedule::AvailableSlot;
use glaciar_core::timezone::day_bounds_utc;

use crate::generator::generate;

/// Read side of the schedule: bookable slots for a date, with live
/// remaining capacity.
pub struct AvailabilityService {
    schedule: Arc<dyn ScheduleRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl AvailabilityService {
    pub fn new(schedule: Arc<dyn ScheduleRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { schedule, catalog }
    }

    /// Materialized slots win; when none exist for the date the slots are
    /// computed live from rules (full capacity, not persisted). Live slots
    /// cannot see concurrent just-in-time bookings between two reads — a
    /// staleness window bounded by how far ahead the materializer runs.
    pub async fn get_availability(
        &self,
        date: NaiveDate,
        professional_filter: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailableSlot>, BoxError> {
        let (from, to) = day_bounds_utc(date);

        let persisted = self
            .schedule
            .slots_in_range(from, to, professional_filter, None)
            .await?;

        let mut slots: Vec<AvailableSlot> = if persisted.is_empty() {
            debug!(%date, "no materialized slots, generating live");
            let rules = self.schedule.list_active_rules().await?;
            let services = self.catalog.list_services().await?;
            generate(date, now, &rules, &services, professional_filter, None)
                .into_iter()
                .map(|c| AvailableSlot {
                    professional_id: c.professional_id,
                    service_id: c.service_id,
                    start_at: c.start_at,
                    end_at: c.end_at,
                    max_capacity: c.max_capacity,
                    available_capacity: c.max_capacity,
                })
                .collect()
        } else {
            persisted
                .into_iter()
                .filter(|s| s.remaining_capacity() > 0)
                .map(|s| AvailableSlot {
                    professional_id: s.professional_id,
                    service_id: s.service_id,
                    start_at: s.start_at,
                    end_at: s.end_at,
                    max_capacity: s.max_capacity,
                    available_capacity: s.remaining_capacity(),
                })
                .collect()
        };

        slots.sort_by_key(|s| s.start_at);
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glaciar_core::testing::MemoryStore;
    use chrono::{Duration, NaiveTime, TimeZone};
    use glaciar_core::schedule::{AvailabilityRule, GeneratedSlot, RecurrenceKind, Service};

    fn store_with_rule() -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::default();
        let professional_id = Uuid::new_v4();
        let service = Service {
            id: Uuid::new_v4(),
            name: "Breathwork".to_string(),
            price: 25000,
            duration_minutes: 60,
            max_capacity: 8,
            is_active: true,
        };
        let service_id = service.id;
        store.services.lock().unwrap().push(service);
        store.rules.lock().unwrap().push(AvailabilityRule {
            id: Uuid::new_v4(),
            professional_id,
            service_id,
            recurrence: RecurrenceKind::Weekly,
            day_of_week: Some(1),
            specific_date: None,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            duration_minutes: 60,
            max_days_in_future: 30,
            min_hours_before_booking: 2,
            is_active: true,
        });
        (store, professional_id, service_id)
    }

    #[tokio::test]
    async fn falls_back_to_live_generation_with_full_capacity() {
        let (store, _, _) = store_with_rule();
        let store = Arc::new(store);
        let service =
            AvailabilityService::new(store.clone(), store);

        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let slots = service.get_availability(date, None, now).await.unwrap();

        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|s| s.available_capacity == s.max_capacity));
        assert!(slots[0].start_at < slots[1].start_at);
    }

    #[tokio::test]
    async fn persisted_slots_win_and_full_ones_are_hidden() {
        let (store, professional_id, service_id) = store_with_rule();
        let start = Utc.with_ymd_and_hms(2026, 3, 16, 12, 0, 0).unwrap();
        store.with_slot(GeneratedSlot {
            id: Uuid::new_v4(),
            professional_id,
            service_id,
            start_at: start,
            end_at: start + Duration::minutes(60),
            max_capacity: 8,
            confirmed_bookings: 3,
            is_active: true,
        });
        store.with_slot(GeneratedSlot {
            id: Uuid::new_v4(),
            professional_id,
            service_id,
            start_at: start + Duration::minutes(60),
            end_at: start + Duration::minutes(120),
            max_capacity: 8,
            confirmed_bookings: 8,
            is_active: true,
        });

        let store = Arc::new(store);
        let service =
            AvailabilityService::new(store.clone(), store);

        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let slots = service.get_availability(date, None, now).await.unwrap();

        // The full slot is filtered out; the rule fallback is not consulted.
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].available_capacity, 5);
    }
}
