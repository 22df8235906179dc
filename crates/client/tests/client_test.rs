use std::sync::Arc;

use carebook_api::{app, seed::seed_demo_accounts, ApiState};
use carebook_client::{config::ClientConfig, CareClient};
use carebook_core::{
    clock::FixedClock,
    errors::CareError,
    guard::{Decision, STAFF},
    models::{
        appointment::{AppointmentQuery, AppointmentStatus, BookAppointmentRequest},
        principal::Role,
        provider::ConsultationType,
    },
};
use carebook_db::{
    memory::{InMemoryAccountStore, InMemoryAppointmentStore, InMemoryProviderDirectory},
    seed::{demo_providers, DEMO_PASSWORD},
};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Serves the API on an ephemeral port and returns its base URL.
async fn spawn_server() -> String {
    let accounts = Arc::new(InMemoryAccountStore::new());
    seed_demo_accounts(accounts.as_ref()).await.unwrap();

    let state = ApiState::new(
        Arc::new(InMemoryAppointmentStore::new()),
        Arc::new(InMemoryProviderDirectory::with_providers(demo_providers())),
        accounts,
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap())),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(Arc::new(state))).await.unwrap();
    });

    format!("http://{}/", addr)
}

fn client(url: &str, dir: &TempDir) -> CareClient {
    CareClient::from_config(ClientConfig::new(url, dir.path().join("session.json"))).unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

fn booking(start: NaiveTime) -> BookAppointmentRequest {
    BookAppointmentRequest {
        provider_id: "doc-ananya".to_string(),
        date: day(),
        start_time: start,
        consultation_type: ConsultationType::Video,
        patient_name: "Priya Sharma".to_string(),
        email: "priya@example.com".to_string(),
        phone: "9876543210".to_string(),
        reason: "Persistent cough".to_string(),
        symptoms: vec!["cough".to_string()],
        notes: None,
    }
}

#[tokio::test]
async fn test_session_survives_a_new_client() {
    let url = spawn_server().await;
    let dir = TempDir::new().unwrap();

    let first = client(&url, &dir);
    assert!(matches!(first.me().await, Err(CareError::Authentication(_))));

    let principal = first.login("priya@example.com", DEMO_PASSWORD).await.unwrap();
    assert_eq!(principal.role, Role::Patient);
    assert!(dir.path().join("session.json").exists());

    let second = client(&url, &dir);
    assert_eq!(second.current_principal(), Some(principal.clone()));
    assert_eq!(second.me().await.unwrap(), principal);
    assert_eq!(second.authorize(STAFF), Decision::DenyForbidden);

    second.logout().await.unwrap();
    assert!(!dir.path().join("session.json").exists());
    assert_eq!(second.authorize(STAFF), Decision::DenyUnauthenticated);
}

#[tokio::test]
async fn test_bad_credentials_are_rejected() {
    let url = spawn_server().await;
    let dir = TempDir::new().unwrap();
    let client = client(&url, &dir);

    assert!(matches!(
        client.login("priya@example.com", "wrong").await,
        Err(CareError::Authentication(_))
    ));
    assert_eq!(client.current_principal(), None);
}

#[tokio::test]
async fn test_booking_flow_and_error_mapping() {
    let url = spawn_server().await;
    let priya_dir = TempDir::new().unwrap();
    let arjun_dir = TempDir::new().unwrap();
    let doctor_dir = TempDir::new().unwrap();

    let priya = client(&url, &priya_dir);
    let arjun = client(&url, &arjun_dir);
    let doctor = client(&url, &doctor_dir);
    priya.login("priya@example.com", DEMO_PASSWORD).await.unwrap();
    arjun.login("arjun@example.com", DEMO_PASSWORD).await.unwrap();
    doctor.login("ananya@example.com", DEMO_PASSWORD).await.unwrap();

    priya.health().await.unwrap();
    assert_eq!(priya.providers().await.unwrap().len(), 2);

    let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
    let booked = priya.book(&booking(ten)).await.unwrap();
    assert_eq!(booked.appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(booked.appointment.payment.amount, 1200);
    assert_eq!(booked.allowed_transitions, vec![AppointmentStatus::Cancelled]);

    let slots = arjun.slots("doc-ananya", day()).await.unwrap();
    assert!(slots.slots.iter().any(|s| s.start_time == ten && !s.available));

    match arjun.book(&booking(ten)).await {
        Err(CareError::Validation(errors)) => assert!(errors.get("slot").is_some()),
        other => panic!("expected a validation error, got {:?}", other.map(|r| r.appointment.id)),
    }

    let id = booked.appointment.id;
    assert!(matches!(arjun.cancel(&id).await, Err(CareError::Forbidden(_))));
    assert!(matches!(
        doctor.transition(&id, AppointmentStatus::Completed, None).await,
        Err(CareError::InvalidTransition {
            from: AppointmentStatus::Scheduled,
            to: AppointmentStatus::Completed
        })
    ));

    let confirmed = doctor.transition(&id, AppointmentStatus::Confirmed, None).await.unwrap();
    assert_eq!(confirmed.appointment.status, AppointmentStatus::Confirmed);
    assert!(matches!(priya.cancel(&id).await, Err(CareError::Forbidden(_))));

    let mine = priya.appointments(&AppointmentQuery::default()).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert!(arjun.appointments(&AppointmentQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_calls_without_a_session_fail_locally() {
    let url = spawn_server().await;
    let dir = TempDir::new().unwrap();
    let client = client(&url, &dir);

    assert!(matches!(
        client.providers().await,
        Err(CareError::Authentication(_))
    ));
    assert!(matches!(
        client.provider("doc-ananya").await,
        Err(CareError::Authentication(_))
    ));
}
