#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum_test::{TestRequest, TestServer};
use carebook_api::{app, seed::seed_demo_accounts, ApiState};
use carebook_core::clock::FixedClock;
use carebook_db::{
    memory::{InMemoryAccountStore, InMemoryAppointmentStore, InMemoryProviderDirectory},
    seed::{demo_providers, DEMO_PASSWORD},
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

/// Booking date used by the route tests; "now" is 2024-01-10.
pub const DAY: &str = "2024-01-15";

pub struct TestContext {
    pub server: TestServer,
}

impl TestContext {
    /// Serves the full router over the in-memory stores with demo data.
    pub async fn new() -> Self {
        let accounts = Arc::new(InMemoryAccountStore::new());
        seed_demo_accounts(accounts.as_ref()).await.unwrap();

        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()));
        let state = ApiState::new(
            Arc::new(InMemoryAppointmentStore::new()),
            Arc::new(InMemoryProviderDirectory::with_providers(demo_providers())),
            accounts,
            clock,
        );

        let server = TestServer::new(app(Arc::new(state))).unwrap();
        Self { server }
    }

    pub async fn login(&self, email: &str) -> String {
        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": DEMO_PASSWORD }))
            .await;
        response.assert_status_ok();

        let grant: Value = response.json();
        grant["token"].as_str().unwrap().to_string()
    }

    /// Books `start` with Dr. Ananya as the logged-in patient.
    pub async fn book(&self, token: &str, start: &str) -> Value {
        let response = bearer(self.server.post("/api/appointments"), token)
            .json(&booking_body(start))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }
}

pub fn bearer(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

pub fn booking_body(start: &str) -> Value {
    json!({
        "providerId": "doc-ananya",
        "date": DAY,
        "startTime": start,
        "consultationType": "in_person",
        "patientName": "Priya Sharma",
        "email": "priya@example.com",
        "phone": "9876543210",
        "reason": "Persistent cough",
        "symptoms": ["cough", "fever"]
    })
}
