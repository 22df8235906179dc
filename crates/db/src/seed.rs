//! Demo data for local development (`SEED_DEMO=1` or the memory backend).

use carebook_core::models::{
    principal::{Account, Principal, Role},
    provider::{ConsultationOption, ConsultationType, Provider, WorkingHours},
};
use chrono::NaiveTime;

/// Password shared by every demo account.
pub const DEMO_PASSWORD: &str = "carebook-demo";

fn hours(start: (u32, u32), end: (u32, u32)) -> WorkingHours {
    WorkingHours {
        start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap_or_default(),
        end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap_or_default(),
    }
}

pub fn demo_providers() -> Vec<Provider> {
    vec![
        Provider {
            id: "doc-ananya".to_string(),
            name: "Dr. Ananya Rao".to_string(),
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
            working_hours: hours((9, 0), (17, 0)),
        },
        Provider {
            id: "doc-vikram".to_string(),
            name: "Dr. Vikram Mehta".to_string(),
            specialization: "Cardiology".to_string(),
            consultation_types: vec![
                ConsultationOption {
                    kind: ConsultationType::InPerson,
                    fee: 2500,
                    duration_minutes: 45,
                },
                ConsultationOption {
                    kind: ConsultationType::Phone,
                    fee: 800,
                    duration_minutes: 15,
                },
            ],
            working_hours: hours((10, 0), (14, 0)),
        },
    ]
}

/// Demo logins, all sharing `password_hash`.
pub fn demo_accounts(password_hash: &str) -> Vec<Account> {
    let account = |id: &str, role: Role, name: &str, email: &str| Account {
        principal: Principal::new(id, role, name),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
    };

    vec![
        account("pat-priya", Role::Patient, "Priya Sharma", "priya@example.com"),
        account("pat-arjun", Role::Patient, "Arjun Nair", "arjun@example.com"),
        account("doc-ananya", Role::Doctor, "Dr. Ananya Rao", "ananya@example.com"),
        account("doc-vikram", Role::Doctor, "Dr. Vikram Mehta", "vikram@example.com"),
        account("adm-root", Role::Admin, "Clinic Admin", "admin@example.com"),
    ]
}
