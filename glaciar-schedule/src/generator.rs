use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use uuid::Uuid;

use glaciar_core::schedule::{AvailabilityRule, CandidateSlot, Service};
use glaciar_core::timezone::{local_to_utc, studio_date};

/// Expand availability rules into concrete bookable slots for one date.
///
/// Pure: same inputs, same output. Overlapping rules for the same
/// professional/service/time are not deduplicated here; persistence-side
/// callers own that.
pub fn generate(
    date: NaiveDate,
    now: DateTime<Utc>,
    rules: &[AvailabilityRule],
    services: &[Service],
    professional_filter: Option<Uuid>,
    service_filter: Option<Uuid>,
) -> Vec<CandidateSlot> {
    let today = studio_date(now);
    let days_ahead = (date - today).num_days();

    let mut slots = Vec::new();

    for rule in rules {
        if !rule.is_active {
            continue;
        }
        if professional_filter.is_some_and(|p| p != rule.professional_id) {
            continue;
        }
        if service_filter.is_some_and(|s| s != rule.service_id) {
            continue;
        }
        if !rule.applies_on(date) {
            continue;
        }
        if days_ahead > rule.max_days_in_future {
            continue;
        }
        // A zero/negative duration would tile forever.
        if rule.duration_minutes <= 0 {
            continue;
        }
        let Some(service) = services.iter().find(|s| s.id == rule.service_id && s.is_active)
        else {
            continue;
        };

        // Half-open tiling of [start, end): a slot's end is the next slot's
        // start, and a trailing remainder shorter than one duration is dropped.
        let start_min = i64::from(rule.start_time.num_seconds_from_midnight()) / 60;
        let end_min = i64::from(rule.end_time.num_seconds_from_midnight()) / 60;
        let mut cursor = start_min;

        while cursor + rule.duration_minutes <= end_min {
            let local_start = date.and_hms_opt(0, 0, 0).expect("midnight exists")
                + Duration::minutes(cursor);
            let start_at = local_to_utc(local_start);
            let end_at = start_at + Duration::minutes(rule.duration_minutes);
            cursor += rule.duration_minutes;

            // Lead time: the slot must start at least min_hours_before_booking
            // from now.
            if start_at - now < Duration::hours(rule.min_hours_before_booking) {
                continue;
            }

            slots.push(CandidateSlot {
                professional_id: rule.professional_id,
                service_id: rule.service_id,
                start_at,
                end_at,
                max_capacity: service.max_capacity,
            });
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};
    use glaciar_core::schedule::RecurrenceKind;

    fn service(id: Uuid, capacity: i32) -> Service {
        Service {
            id,
            name: "Ice Bath".to_string(),
            price: 30000,
            duration_minutes: 60,
            max_capacity: capacity,
            is_active: true,
        }
    }

    fn weekly_rule(professional_id: Uuid, service_id: Uuid, day_of_week: u8) -> AvailabilityRule {
        AvailabilityRule {
            id: Uuid::new_v4(),
            professional_id,
            service_id,
            recurrence: RecurrenceKind::Weekly,
            day_of_week: Some(day_of_week),
            specific_date: None,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            duration_minutes: 60,
            max_days_in_future: 30,
            min_hours_before_booking: 2,
            is_active: true,
        }
    }

    #[test]
    fn weekly_rule_emits_single_slot_ten_days_out() {
        let professional = Uuid::new_v4();
        let svc = service(Uuid::new_v4(), 6);
        // 2026-03-16 is a Monday (day_of_week 1); now is ten days before.
        let date = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 6, 12, 0, 0).unwrap();
        let rule = weekly_rule(professional, svc.id, 1);

        let slots = generate(date, now, &[rule], &[svc.clone()], None, None);

        assert_eq!(slots.len(), 1);
        // 09:00 local is 12:00 UTC.
        assert_eq!(slots[0].start_at.to_rfc3339(), "2026-03-16T12:00:00+00:00");
        assert_eq!(slots[0].end_at - slots[0].start_at, Duration::minutes(60));
        assert_eq!(slots[0].max_capacity, 6);
    }

    #[test]
    fn generation_is_deterministic() {
        let professional = Uuid::new_v4();
        let svc = service(Uuid::new_v4(), 6);
        let date = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 6, 12, 0, 0).unwrap();
        let rule = weekly_rule(professional, svc.id, 1);

        let a = generate(date, now, &[rule.clone()], &[svc.clone()], None, None);
        let b = generate(date, now, &[rule], &[svc], None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn trailing_remainder_is_dropped() {
        let professional = Uuid::new_v4();
        let svc = service(Uuid::new_v4(), 4);
        let date = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 6, 12, 0, 0).unwrap();
        let mut rule = weekly_rule(professional, svc.id, 1);
        // 09:00-10:30 with 60-minute slots: only [09:00, 10:00) fits.
        rule.end_time = NaiveTime::from_hms_opt(10, 30, 0).unwrap();

        let slots = generate(date, now, &[rule], &[svc], None, None);
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn slots_inside_lead_time_are_rejected() {
        let professional = Uuid::new_v4();
        let svc = service(Uuid::new_v4(), 4);
        let date = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        // 11:00 UTC = 08:00 local, one hour before the 09:00 slot but the
        // rule wants two.
        let now = Utc.with_ymd_and_hms(2026, 3, 16, 11, 0, 0).unwrap();
        let rule = weekly_rule(professional, svc.id, 1);

        let slots = generate(date, now, &[rule], &[svc], None, None);
        assert!(slots.is_empty());
    }

    #[test]
    fn dates_beyond_horizon_are_rejected() {
        let professional = Uuid::new_v4();
        let svc = service(Uuid::new_v4(), 4);
        // 45 days out with a 30-day horizon. 2026-04-20 is a Monday.
        let date = NaiveDate::from_ymd_opt(2026, 4, 20).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 6, 12, 0, 0).unwrap();
        let rule = weekly_rule(professional, svc.id, 1);

        let slots = generate(date, now, &[rule], &[svc], None, None);
        assert!(slots.is_empty());
    }

    #[test]
    fn once_rule_matches_exact_date_only() {
        let professional = Uuid::new_v4();
        let svc = service(Uuid::new_v4(), 4);
        let date = NaiveDate::from_ymd_opt(2026, 3, 17).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let mut rule = weekly_rule(professional, svc.id, 2);
        rule.recurrence = RecurrenceKind::Once;
        rule.day_of_week = None;
        rule.specific_date = Some(date);

        assert_eq!(generate(date, now, &[rule.clone()], &[svc.clone()], None, None).len(), 1);

        let other = NaiveDate::from_ymd_opt(2026, 3, 24).unwrap();
        assert!(generate(other, now, &[rule], &[svc], None, None).is_empty());
    }

    #[test]
    fn no_matching_rules_yields_empty_list() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 6, 12, 0, 0).unwrap();
        assert!(generate(date, now, &[], &[], None, None).is_empty());
    }

    #[test]
    fn filters_restrict_professional_and_service() {
        let pro_a = Uuid::new_v4();
        let pro_b = Uuid::new_v4();
        let svc = service(Uuid::new_v4(), 4);
        let date = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 6, 12, 0, 0).unwrap();
        let rules = vec![weekly_rule(pro_a, svc.id, 1), weekly_rule(pro_b, svc.id, 1)];

        let all = generate(date, now, &rules, std::slice::from_ref(&svc), None, None);
        assert_eq!(all.len(), 2);

        let only_a = generate(date, now, &rules, &[svc], Some(pro_a), None);
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].professional_id, pro_a);
    }
}
