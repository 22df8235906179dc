use carebook_core::models::{
    appointment::{
        Appointment, AppointmentFilter, AppointmentId, AppointmentResponse, AppointmentStatus,
        BookAppointmentRequest, Payment, PaymentStatus,
    },
    principal::{Credentials, Principal, Role},
    provider::{ConsultationOption, ConsultationType, Provider, WorkingHours},
};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn appointment(status: AppointmentStatus) -> Appointment {
    let at = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
    Appointment {
        id: AppointmentId::from("APT-1-abc"),
        patient_id: "pat-priya".to_string(),
        provider_id: "doc-ananya".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        duration_minutes: 25,
        consultation_type: ConsultationType::Video,
        reason: "Follow-up".to_string(),
        symptoms: vec!["cough".to_string()],
        status,
        payment: Payment {
            amount: 1200,
            status: PaymentStatus::Pending,
        },
        notes: None,
        provider_notes: None,
        created_at: at,
        updated_at: at,
    }
}

#[test]
fn test_generated_ids_are_unique_and_prefixed() {
    let a = AppointmentId::generate();
    let b = AppointmentId::generate();

    assert_ne!(a, b);
    assert!(a.as_str().starts_with("APT-"));
    assert_eq!(a.as_str().split('-').count(), 3);
}

#[test]
fn test_appointment_wire_format_is_camel_case() {
    let value = serde_json::to_value(appointment(AppointmentStatus::Scheduled)).unwrap();

    assert_eq!(value["id"], json!("APT-1-abc"));
    assert_eq!(value["patientId"], json!("pat-priya"));
    assert_eq!(value["startTime"], json!("10:00:00"));
    assert_eq!(value["durationMinutes"], json!(25));
    assert_eq!(value["consultationType"], json!("video"));
    assert_eq!(value["status"], json!("scheduled"));
    assert_eq!(value["payment"], json!({ "amount": 1200, "status": "pending" }));
}

#[test]
fn test_appointment_response_flattens_appointment() {
    let response = AppointmentResponse {
        appointment: appointment(AppointmentStatus::Scheduled),
        allowed_transitions: vec![AppointmentStatus::Cancelled],
    };
    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value["id"], json!("APT-1-abc"));
    assert_eq!(value["allowedTransitions"], json!(["cancelled"]));
}

#[test]
fn test_appointment_ends_after_its_duration() {
    let a = appointment(AppointmentStatus::Scheduled);
    assert_eq!(
        a.ends_at(),
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 25, 0)
            .unwrap()
    );
}

#[rstest]
#[case(AppointmentStatus::Pending, false, true)]
#[case(AppointmentStatus::Scheduled, false, true)]
#[case(AppointmentStatus::Confirmed, false, true)]
#[case(AppointmentStatus::Cancelled, true, false)]
#[case(AppointmentStatus::Completed, true, true)]
fn test_status_properties(
    #[case] status: AppointmentStatus,
    #[case] terminal: bool,
    #[case] occupies: bool,
) {
    assert_eq!(status.is_terminal(), terminal);
    assert_eq!(status.occupies_slot(), occupies);
    assert_eq!(status.as_str().parse::<AppointmentStatus>(), Ok(status));
}

#[test]
fn test_unknown_status_is_rejected() {
    assert!("rescheduled".parse::<AppointmentStatus>().is_err());
    assert!("doctor ".parse::<Role>().is_err());
}

#[test]
fn test_occupying_filter_skips_cancelled() {
    let filter = AppointmentFilter::occupying("doc-ananya", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

    assert!(filter.matches(&appointment(AppointmentStatus::Scheduled)));
    assert!(filter.matches(&appointment(AppointmentStatus::Completed)));
    assert!(!filter.matches(&appointment(AppointmentStatus::Cancelled)));

    let mut other_day = appointment(AppointmentStatus::Scheduled);
    other_day.date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
    assert!(!filter.matches(&other_day));
}

#[test]
fn test_default_filter_matches_everything() {
    let filter = AppointmentFilter::default();
    for status in AppointmentStatus::ALL {
        assert!(filter.matches(&appointment(status)));
    }
}

#[test]
fn test_provider_consultation_lookup() {
    let provider = Provider {
        id: "doc-ananya".to_string(),
        name: "Dr. Ananya Rao".to_string(),
        specialization: "General Medicine".to_string(),
        consultation_types: vec![ConsultationOption {
            kind: ConsultationType::Video,
            fee: 1200,
            duration_minutes: 25,
        }],
        working_hours: WorkingHours {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        },
    };

    assert!(provider.offers(ConsultationType::Video));
    assert!(!provider.offers(ConsultationType::Phone));
    assert_eq!(provider.consultation(ConsultationType::Video).map(|c| c.fee), Some(1200));

    let value = serde_json::to_value(&provider).unwrap();
    assert_eq!(
        value["consultationTypes"],
        json!([{ "type": "video", "fee": 1200, "durationMinutes": 25 }])
    );
}

#[test]
fn test_book_request_symptoms_default_to_empty() {
    let request: BookAppointmentRequest = serde_json::from_value(json!({
        "providerId": "doc-ananya",
        "date": "2024-01-15",
        "startTime": "10:00:00",
        "consultationType": "in_person",
        "patientName": "Priya Sharma",
        "email": "priya@example.com",
        "phone": "9876543210",
        "reason": "Checkup",
        "notes": null
    }))
    .unwrap();

    assert!(request.symptoms.is_empty());
    assert_eq!(request.consultation_type, ConsultationType::InPerson);
}

#[test]
fn test_credentials_debug_redacts_password() {
    let credentials = Credentials {
        email: "priya@example.com".to_string(),
        password: "hunter2".to_string(),
    };
    let debug = format!("{:?}", credentials);

    assert!(debug.contains("priya@example.com"));
    assert!(!debug.contains("hunter2"));
}

#[test]
fn test_principal_round_trips_role() {
    let principal = Principal::new("doc-ananya", Role::Doctor, "Dr. Ananya Rao");
    let value = serde_json::to_value(&principal).unwrap();

    assert_eq!(
        value,
        json!({ "id": "doc-ananya", "role": "doctor", "displayName": "Dr. Ananya Rao" })
    );
    assert_eq!(serde_json::from_value::<Principal>(value).unwrap(), principal);
}
