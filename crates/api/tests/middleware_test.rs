use axum::{body::to_bytes, http::StatusCode, response::Response};
use carebook_api::middleware::{
    auth::{generate_token, hash_password, verify_password, TOKEN_LENGTH},
    error_handling::{map_error, status_for},
};
use carebook_core::{
    errors::{CareError, ValidationErrors},
    models::appointment::AppointmentStatus,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Value;

async fn body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[rstest]
#[case(CareError::invalid("email", "bad"), StatusCode::BAD_REQUEST)]
#[case(CareError::Authentication("no session".into()), StatusCode::UNAUTHORIZED)]
#[case(CareError::Forbidden("wrong role".into()), StatusCode::FORBIDDEN)]
#[case(CareError::NotFound("missing".into()), StatusCode::NOT_FOUND)]
#[case(
    CareError::InvalidTransition { from: AppointmentStatus::Completed, to: AppointmentStatus::Scheduled },
    StatusCode::UNPROCESSABLE_ENTITY
)]
#[case(CareError::Conflict("taken".into()), StatusCode::CONFLICT)]
#[case(
    CareError::StaleState { expected: AppointmentStatus::Scheduled, actual: AppointmentStatus::Cancelled },
    StatusCode::CONFLICT
)]
#[case(CareError::Database(eyre::eyre!("connection reset")), StatusCode::INTERNAL_SERVER_ERROR)]
#[case(CareError::Internal("lock poisoned".into()), StatusCode::INTERNAL_SERVER_ERROR)]
fn test_status_mapping(#[case] error: CareError, #[case] status: StatusCode) {
    assert_eq!(status_for(&error), status);
    assert_eq!(map_error(error).status(), status);
}

#[tokio::test]
async fn test_guard_denials_carry_distinct_redirects() {
    let unauthenticated = body(map_error(CareError::Authentication("login required".into()))).await;
    assert_eq!(unauthenticated["kind"], "unauthenticated");
    assert_eq!(unauthenticated["redirect"], "/login");

    let forbidden = body(map_error(CareError::Forbidden("staff only".into()))).await;
    assert_eq!(forbidden["kind"], "forbidden");
    assert_eq!(forbidden["redirect"], "/not-permitted");
    assert_eq!(forbidden["detail"], "staff only");
}

#[tokio::test]
async fn test_validation_body_lists_every_field() {
    let mut errors = ValidationErrors::new();
    errors.push("email", "invalid email");
    errors.push("phone", "invalid phone");

    let json = body(map_error(CareError::Validation(errors))).await;
    let fields: Vec<&str> = json["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "phone"]);
}

#[tokio::test]
async fn test_transition_errors_name_both_states() {
    let json = body(map_error(CareError::InvalidTransition {
        from: AppointmentStatus::Cancelled,
        to: AppointmentStatus::Confirmed,
    }))
    .await;
    assert_eq!(json["from"], "cancelled");
    assert_eq!(json["to"], "confirmed");

    let json = body(map_error(CareError::StaleState {
        expected: AppointmentStatus::Scheduled,
        actual: AppointmentStatus::Confirmed,
    }))
    .await;
    assert_eq!(json["kind"], "stale_state");
    assert_eq!(json["actual"], "confirmed");
}

#[tokio::test]
async fn test_server_errors_hide_details() {
    let json = body(map_error(CareError::Database(eyre::eyre!("password=hunter2")))).await;

    assert_eq!(json["error"], "Internal server error");
    assert!(!json.to_string().contains("hunter2"));
}

#[test]
fn test_password_hashing() {
    let hash = hash_password("carebook-demo").unwrap();

    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("carebook-demo", &hash));
    assert!(!verify_password("wrong", &hash));
    assert!(!verify_password("carebook-demo", "not a hash"));
}

#[test]
fn test_tokens_are_random() {
    let a = generate_token();
    let b = generate_token();

    assert_eq!(a.len(), TOKEN_LENGTH);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(a, b);
}
