//! # Slot availability
//!
//! A provider's day is cut into fixed 30-minute slots starting at
//! `working_hours.start`. A slot is unavailable when any non-cancelled
//! appointment of the same provider overlaps it. Intervals are half-open, so
//! an appointment ending at 10:00 leaves the 10:00 slot free.
//!
//! Slots are derived on every call and never cached: the booking workflow
//! recomputes them right before it writes.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::{
    clock::Clock,
    errors::{CareError, CareResult},
    models::{
        appointment::{Appointment, AppointmentFilter},
        provider::Provider,
        time_slot::TimeSlot,
    },
    store::{AppointmentStore, ProviderDirectory},
};

/// Slot granularity in minutes.
pub const SLOT_MINUTES: u32 = 30;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    pub fn new(date: NaiveDate, start: NaiveTime, minutes: u32) -> Self {
        let start = date.and_time(start);
        Self {
            start,
            end: start + Duration::minutes(i64::from(minutes)),
        }
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl From<&Appointment> for Interval {
    fn from(appointment: &Appointment) -> Self {
        Interval {
            start: appointment.starts_at(),
            end: appointment.ends_at(),
        }
    }
}

/// Lazy sequence of the slots of one provider-day.
///
/// Cloning yields an independent iterator from the same position, so the
/// sequence can be restarted without touching the store again.
#[derive(Debug, Clone)]
pub struct Slots {
    date: NaiveDate,
    cursor: NaiveDateTime,
    end: NaiveDateTime,
    booked: Vec<Interval>,
}

impl Iterator for Slots {
    type Item = TimeSlot;

    fn next(&mut self) -> Option<TimeSlot> {
        let slot_end = self.cursor + Duration::minutes(i64::from(SLOT_MINUTES));
        if slot_end > self.end {
            return None;
        }

        let interval = Interval {
            start: self.cursor,
            end: slot_end,
        };
        let available = !self.booked.iter().any(|b| b.overlaps(&interval));
        let slot = TimeSlot {
            date: self.date,
            start_time: self.cursor.time(),
            duration_minutes: SLOT_MINUTES,
            available,
        };

        self.cursor = slot_end;
        Some(slot)
    }
}

/// Slots of `provider` on `date`, marked against `existing` appointments.
///
/// Appointments of other providers, other dates, or in `cancelled` status are
/// ignored. A `date` before `today` yields an empty sequence.
pub fn compute_slots(
    provider: &Provider,
    date: NaiveDate,
    existing: &[Appointment],
    today: NaiveDate,
) -> Slots {
    let start = date.and_time(provider.working_hours.start);
    let end = date.and_time(provider.working_hours.end);

    if date < today {
        return Slots {
            date,
            cursor: end,
            end,
            booked: Vec::new(),
        };
    }

    let booked = existing
        .iter()
        .filter(|a| a.provider_id == provider.id && a.date == date && a.status.occupies_slot())
        .map(Interval::from)
        .collect();

    Slots {
        date,
        cursor: start,
        end,
        booked,
    }
}

/// Store-backed slot lookup used by the API and the booking workflow.
#[derive(Clone)]
pub struct SlotService {
    directory: Arc<dyn ProviderDirectory>,
    store: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
}

impl SlotService {
    pub fn new(
        directory: Arc<dyn ProviderDirectory>,
        store: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            store,
            clock,
        }
    }

    pub async fn provider(&self, provider_id: &str) -> CareResult<Provider> {
        self.directory
            .get(provider_id)
            .await?
            .ok_or_else(|| CareError::NotFound(format!("Provider with ID {} not found", provider_id)))
    }

    pub async fn slots_for(&self, provider_id: &str, date: NaiveDate) -> CareResult<Vec<TimeSlot>> {
        let provider = self.provider(provider_id).await?;
        self.slots_for_provider(&provider, date).await
    }

    /// Reads the provider's calendar fresh from the store on every call.
    pub async fn slots_for_provider(
        &self,
        provider: &Provider,
        date: NaiveDate,
    ) -> CareResult<Vec<TimeSlot>> {
        let today = self.clock.today();
        if date < today {
            debug!(provider = %provider.id, %date, "date in the past, no slots offered");
            return Ok(Vec::new());
        }

        let existing = self
            .store
            .query(&AppointmentFilter::occupying(&provider.id, date))
            .await?;

        Ok(compute_slots(provider, date, &existing, today).collect())
    }

    /// The freshly computed slot starting at `start_time`, if the provider has one.
    pub async fn find_slot(
        &self,
        provider: &Provider,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> CareResult<Option<TimeSlot>> {
        let slots = self.slots_for_provider(provider, date).await?;
        Ok(slots.into_iter().find(|s| s.start_time == start_time))
    }
}
