use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an availability rule repeats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceKind {
    Weekly,
    Once,
}

/// A recurring or one-off template for when a professional offers a service.
/// Created by studio staff; read-only to this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub service_id: Uuid,
    pub recurrence: RecurrenceKind,
    /// 0 = Sunday .. 6 = Saturday. Only meaningful for `Weekly`.
    pub day_of_week: Option<u8>,
    /// Only meaningful for `Once`.
    pub specific_date: Option<NaiveDate>,
    /// Studio-local wall clock.
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
    pub max_days_in_future: i64,
    pub min_hours_before_booking: i64,
    pub is_active: bool,
}

impl AvailabilityRule {
    /// Whether this rule covers the given studio-local date.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self.recurrence {
            RecurrenceKind::Weekly => {
                let weekday = date.weekday().num_days_from_sunday() as u8;
                self.day_of_week == Some(weekday)
            }
            RecurrenceKind::Once => self.specific_date == Some(date),
        }
    }
}

/// A bookable class/session type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    /// Price in CLP (zero-decimal currency).
    pub price: i64,
    pub duration_minutes: i64,
    /// Maximum simultaneous attendees per slot.
    pub max_capacity: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professional {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

/// A materialized, concrete bookable interval.
///
/// Invariant: `0 <= confirmed_bookings <= max_capacity`; at most one active
/// row exists per (professional, service, start_at).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSlot {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub service_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub max_capacity: i32,
    pub confirmed_bookings: i32,
    pub is_active: bool,
}

impl GeneratedSlot {
    pub fn remaining_capacity(&self) -> i32 {
        self.max_capacity - self.confirmed_bookings
    }

    /// Identity key used for de-duplication when materializing.
    pub fn dedup_key(&self) -> (Uuid, Uuid, DateTime<Utc>) {
        (self.professional_id, self.service_id, self.start_at)
    }
}

/// A slot produced by rule expansion, before any persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub professional_id: Uuid,
    pub service_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub max_capacity: i32,
}

/// What the availability endpoint returns: a slot plus live remaining room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub professional_id: Uuid,
    pub service_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub max_capacity: i32,
    pub available_capacity: i32,
}
