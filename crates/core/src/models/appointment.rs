use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::provider::ConsultationType;

/// Opaque, globally unique appointment identifier.
///
/// Generated ids look like `APT-<unix millis>-<random hex>`; callers must not
/// rely on the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(String);

impl AppointmentId {
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "APT-{}-{}",
            Utc::now().timestamp_millis(),
            &suffix[..12]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AppointmentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for AppointmentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::Completed
        )
    }

    /// Whether an appointment in this status still holds its time slot.
    pub fn occupies_slot(&self) -> bool {
        *self != AppointmentStatus::Cancelled
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(format!("unknown appointment status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: i64,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: String,
    pub provider_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub consultation_type: ConsultationType,
    pub reason: String,
    pub symptoms: Vec<String>,
    pub status: AppointmentStatus,
    pub payment: Payment,
    pub notes: Option<String>,
    pub provider_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.starts_at() + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// A candidate appointment that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_id: String,
    pub provider_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub consultation_type: ConsultationType,
    pub reason: String,
    pub symptoms: Vec<String>,
    pub payment: Payment,
    pub notes: Option<String>,
}

impl NewAppointment {
    pub fn into_appointment(
        self,
        id: AppointmentId,
        status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Appointment {
        Appointment {
            id,
            patient_id: self.patient_id,
            provider_id: self.provider_id,
            date: self.date,
            start_time: self.start_time,
            duration_minutes: self.duration_minutes,
            consultation_type: self.consultation_type,
            reason: self.reason,
            symptoms: self.symptoms,
            status,
            payment: self.payment,
            notes: self.notes,
            provider_notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Query parameters for `AppointmentStore::query`. Unset fields match all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentFilter {
    pub patient_id: Option<String>,
    pub provider_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub exclude_cancelled: bool,
}

impl AppointmentFilter {
    /// Every appointment that still blocks time on a provider's calendar.
    pub fn occupying(provider_id: &str, date: NaiveDate) -> Self {
        Self {
            provider_id: Some(provider_id.to_string()),
            date: Some(date),
            exclude_cancelled: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.patient_id
            .as_ref()
            .is_none_or(|id| *id == appointment.patient_id)
            && self
                .provider_id
                .as_ref()
                .is_none_or(|id| *id == appointment.provider_id)
            && self.date.is_none_or(|d| d == appointment.date)
            && self.status.is_none_or(|s| s == appointment.status)
            && !(self.exclude_cancelled && appointment.status == AppointmentStatus::Cancelled)
    }
}

/// Body of `POST /api/appointments`: one request driving the whole booking
/// workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub provider_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub consultation_type: ConsultationType,
    pub patient_name: String,
    pub email: String,
    pub phone: String,
    pub reason: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub notes: Option<String>,
}

/// Body of `POST /api/appointments/hold`: a provider-initiated hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldAppointmentRequest {
    pub patient_id: String,
    pub provider_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub consultation_type: ConsultationType,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionAppointmentRequest {
    pub to: AppointmentStatus,
    pub provider_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQuery {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

/// An appointment together with the transitions the caller may trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub allowed_transitions: Vec<AppointmentStatus>,
}
