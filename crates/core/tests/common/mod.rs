#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use carebook_core::{
    clock::FixedClock,
    errors::CareResult,
    models::{
        appointment::{
            Appointment, AppointmentFilter, AppointmentId, AppointmentStatus, Payment,
            PaymentStatus,
        },
        principal::{AuthGrant, Credentials, Principal, Role},
        provider::{ConsultationOption, ConsultationType, Provider, WorkingHours},
    },
    session::AuthBackend,
    store::{AppointmentStore, ProviderDirectory, TransitionCommand},
};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use mockall::mock;

mock! {
    pub Store {}

    #[async_trait]
    impl AppointmentStore for Store {
        async fn get(&self, id: &AppointmentId) -> CareResult<Option<Appointment>>;
        async fn query(&self, filter: &AppointmentFilter) -> CareResult<Vec<Appointment>>;
        async fn create(&self, appointment: &Appointment) -> CareResult<AppointmentId>;
        async fn transition(
            &self,
            id: &AppointmentId,
            command: TransitionCommand,
        ) -> CareResult<Appointment>;
    }
}

mock! {
    pub Directory {}

    #[async_trait]
    impl ProviderDirectory for Directory {
        async fn get(&self, provider_id: &str) -> CareResult<Option<Provider>>;
        async fn list(&self) -> CareResult<Vec<Provider>>;
    }
}

mock! {
    pub Auth {}

    #[async_trait]
    impl AuthBackend for Auth {
        async fn login(&self, credentials: &Credentials) -> CareResult<AuthGrant>;
        async fn logout(&self, token: &str) -> CareResult<()>;
    }
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// The booking date used throughout: Monday 2024-01-15.
pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

/// "Now" is five days before `day()`.
pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()))
}

pub fn dr_x() -> Provider {
    Provider {
        id: "doc-x".to_string(),
        name: "Dr. X".to_string(),
        specialization: "General Medicine".to_string(),
        consultation_types: vec![
            ConsultationOption {
                kind: ConsultationType::InPerson,
                fee: 1500,
                duration_minutes: 30,
            },
            ConsultationOption {
                kind: ConsultationType::Video,
                fee: 1200,
                duration_minutes: 25,
            },
        ],
        working_hours: WorkingHours {
            start: t(9, 0),
            end: t(17, 0),
        },
    }
}

pub fn priya() -> Principal {
    Principal::new("pat-priya", Role::Patient, "Priya Sharma")
}

pub fn arjun() -> Principal {
    Principal::new("pat-arjun", Role::Patient, "Arjun Nair")
}

pub fn doctor() -> Principal {
    Principal::new("doc-x", Role::Doctor, "Dr. X")
}

pub fn admin() -> Principal {
    Principal::new("adm-root", Role::Admin, "Clinic Admin")
}

/// A 30-minute in-person appointment of Priya with Dr. X.
pub fn appointment_at(start: NaiveTime, status: AppointmentStatus) -> Appointment {
    let at = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
    Appointment {
        id: AppointmentId::from(format!("APT-1-{}", start.format("%H%M"))),
        patient_id: "pat-priya".to_string(),
        provider_id: "doc-x".to_string(),
        date: day(),
        start_time: start,
        duration_minutes: 30,
        consultation_type: ConsultationType::InPerson,
        reason: "Checkup".to_string(),
        symptoms: Vec::new(),
        status,
        payment: Payment {
            amount: 1500,
            status: PaymentStatus::Pending,
        },
        notes: None,
        provider_notes: None,
        created_at: at,
        updated_at: at,
    }
}
