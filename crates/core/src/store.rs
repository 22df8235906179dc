//! Boundary traits between the appointment core and its collaborators.
//!
//! `carebook-db` provides PostgreSQL and in-memory implementations; the core
//! only ever talks to these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    errors::CareResult,
    models::{
        appointment::{Appointment, AppointmentFilter, AppointmentId, AppointmentStatus},
        principal::{Account, Principal},
        provider::Provider,
    },
};

/// A compare-and-set status change requested by `actor`.
#[derive(Debug, Clone)]
pub struct TransitionCommand {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    pub actor: Principal,
    pub provider_notes: Option<String>,
    pub at: DateTime<Utc>,
}

/// Persistence boundary for appointments.
///
/// Implementations must make the read-check-write of `transition` atomic per
/// appointment id and the overlap-check-insert of `create` atomic per
/// provider. Neither may take a lock spanning unrelated ids or providers.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get(&self, id: &AppointmentId) -> CareResult<Option<Appointment>>;

    /// Matching appointments ordered by date then start time.
    async fn query(&self, filter: &AppointmentFilter) -> CareResult<Vec<Appointment>>;

    /// Inserts `appointment`, failing with `Conflict` if the id exists or a
    /// non-cancelled appointment of the same provider overlaps it.
    async fn create(&self, appointment: &Appointment) -> CareResult<AppointmentId>;

    /// Applies `command` if the stored status still equals `command.from`,
    /// otherwise fails with `StaleState`. The transition policy is checked
    /// against the locked record before writing.
    async fn transition(
        &self,
        id: &AppointmentId,
        command: TransitionCommand,
    ) -> CareResult<Appointment>;
}

/// Read-only provider lookup.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn get(&self, provider_id: &str) -> CareResult<Option<Provider>>;

    async fn list(&self) -> CareResult<Vec<Provider>>;
}

/// Server-side accounts and the bearer tokens issued to them.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> CareResult<Option<Account>>;

    async fn insert_account(&self, account: &Account) -> CareResult<()>;

    async fn store_token(&self, token: &str, principal_id: &str) -> CareResult<()>;

    async fn resolve_token(&self, token: &str) -> CareResult<Option<Principal>>;

    async fn revoke_token(&self, token: &str) -> CareResult<()>;
}
