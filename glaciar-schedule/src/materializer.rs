use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use glaciar_core::error::BoxError;
use glaciar_core::repository::{CatalogRepository, ScheduleRepository};
use glaciar_core::timezone::day_bounds_utc;

use crate::generator::generate;

const INSERT_BATCH_SIZE: usize = 500;

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct MaterializeReport {
    pub created: u64,
    pub skipped: u64,
    pub checked: u64,
}

/// Batch job that expands rules over a date range and persists the slots,
/// de-duplicating against already-materialized ones. Additive and
/// idempotent: re-running the same range converges to the same state.
pub struct Materializer {
    schedule: Arc<dyn ScheduleRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl Materializer {
    pub fn new(schedule: Arc<dyn ScheduleRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { schedule, catalog }
    }

    pub async fn materialize(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
        professional_filter: Option<Uuid>,
        service_filter: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<MaterializeReport, BoxError> {
        let (range_start, _) = day_bounds_utc(date_from);
        let (_, range_end) = day_bounds_utc(date_to);

        let existing: HashSet<(Uuid, Uuid, DateTime<Utc>)> = self
            .schedule
            .slots_in_range(range_start, range_end, None, None)
            .await?
            .iter()
            .map(|s| s.dedup_key())
            .collect();

        let rules = self.schedule.list_active_rules().await?;
        let services = self.catalog.list_services().await?;

        let mut report = MaterializeReport::default();
        let mut pending = Vec::new();

        let mut date = date_from;
        while date <= date_to {
            for candidate in generate(date, now, &rules, &services, professional_filter, service_filter)
            {
                report.checked += 1;
                let key = (candidate.professional_id, candidate.service_id, candidate.start_at);
                if existing.contains(&key) {
                    report.skipped += 1;
                    continue;
                }
                pending.push(candidate);
            }
            date += Duration::days(1);
        }

        for chunk in pending.chunks(INSERT_BATCH_SIZE) {
            report.created += self.schedule.insert_slots(chunk).await?;
        }

        info!(
            from = %date_from,
            to = %date_to,
            created = report.created,
            skipped = report.skipped,
            "slot materialization finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glaciar_core::testing::MemoryStore;
    use chrono::{NaiveTime, TimeZone};
    use glaciar_core::schedule::{AvailabilityRule, RecurrenceKind, Service};

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::default();
        let professional_id = Uuid::new_v4();
        let service = Service {
            id: Uuid::new_v4(),
            name: "Yoga".to_string(),
            price: 18000,
            duration_minutes: 60,
            max_capacity: 10,
            is_active: true,
        };
        let service_id = service.id;
        store.services.lock().unwrap().push(service);
        // Every day of the week, two one-hour slots.
        for dow in 0..7 {
            store.rules.lock().unwrap().push(AvailabilityRule {
                id: Uuid::new_v4(),
                professional_id,
                service_id,
                recurrence: RecurrenceKind::Weekly,
                day_of_week: Some(dow),
                specific_date: None,
                start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                duration_minutes: 60,
                max_days_in_future: 60,
                min_hours_before_booking: 2,
                is_active: true,
            });
        }
        store
    }

    #[tokio::test]
    async fn repeated_runs_converge() {
        let store = Arc::new(seeded_store());
        let materializer = Materializer::new(store.clone(), store.clone());

        let from = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 3, 22).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();

        let first = materializer.materialize(from, to, None, None, now).await.unwrap();
        assert_eq!(first.created, 14);
        assert_eq!(first.skipped, 0);
        assert_eq!(first.checked, 14);

        let second = materializer.materialize(from, to, None, None, now).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped, 14);
        assert_eq!(store.slots.lock().unwrap().len(), 14);
    }

    #[tokio::test]
    async fn overlapping_rerun_only_fills_the_gap() {
        let store = Arc::new(seeded_store());
        let materializer = Materializer::new(store.clone(), store.clone());

        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let from = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        let mid = NaiveDate::from_ymd_opt(2026, 3, 18).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();

        materializer.materialize(from, mid, None, None, now).await.unwrap();
        let report = materializer.materialize(from, to, None, None, now).await.unwrap();

        // Three already-materialized days are skipped, two new days created.
        assert_eq!(report.skipped, 6);
        assert_eq!(report.created, 4);
    }
}
