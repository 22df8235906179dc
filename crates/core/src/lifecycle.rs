//! # Appointment lifecycle
//!
//! ```text
//!   pending ──┐                 ┌──> completed
//!             ├──> confirmed ───┤
//!   scheduled ┘        │        └──> cancelled
//!      │               │
//!      └───────────────┴──────────> cancelled
//! ```
//!
//! `pending` (provider-initiated hold) and `scheduled` (direct booking) are
//! the two entry states; `cancelled` and `completed` are terminal.
//!
//! Permission is checked before the table: a principal whose role can never
//! reach the requested status gets `Forbidden`, and so does a patient acting
//! on an appointment that is not theirs or a doctor acting outside their own
//! calendar. Only then is an unknown edge reported as `InvalidTransition`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    errors::{CareError, CareResult},
    guard::{self, ANY_ROLE, STAFF},
    models::{
        appointment::{
            Appointment, AppointmentFilter, AppointmentId, AppointmentStatus, NewAppointment,
        },
        principal::{Principal, Role},
    },
    store::{AppointmentStore, TransitionCommand},
};

/// How many times a transition re-reads after losing a race before giving up.
const MAX_STALE_RETRIES: usize = 3;

/// Who may trigger an edge of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Doctors and admins.
    Staff,
    /// Doctors, admins, and the patient the appointment belongs to.
    StaffOrOwner,
}

impl Permission {
    /// Role-level check; ownership is verified separately.
    pub fn permits(&self, role: Role) -> bool {
        match (self, role) {
            (_, Role::Doctor | Role::Admin) => true,
            (Permission::StaffOrOwner, Role::Patient) => true,
            (Permission::Staff, Role::Patient) => false,
        }
    }
}

/// The transition table. `None` means the edge does not exist.
pub fn transition_rule(from: AppointmentStatus, to: AppointmentStatus) -> Option<Permission> {
    use AppointmentStatus::*;

    match (from, to) {
        (Pending, Confirmed) | (Scheduled, Confirmed) => Some(Permission::Staff),
        (Pending, Cancelled) | (Scheduled, Cancelled) => Some(Permission::StaffOrOwner),
        (Confirmed, Completed) | (Confirmed, Cancelled) => Some(Permission::Staff),
        _ => None,
    }
}

/// Roles that could ever move an appointment into `to`.
fn roles_reaching(to: AppointmentStatus) -> &'static [Role] {
    match to {
        AppointmentStatus::Cancelled => &[Role::Patient, Role::Doctor, Role::Admin],
        AppointmentStatus::Pending
        | AppointmentStatus::Scheduled
        | AppointmentStatus::Confirmed
        | AppointmentStatus::Completed => STAFF,
    }
}

/// Decides whether `actor` may move `appointment` to `to`.
///
/// Used by the manager before writing and by stores against the locked
/// record, so both sides agree on the same table.
pub fn check_transition(
    actor: &Principal,
    appointment: &Appointment,
    to: AppointmentStatus,
) -> CareResult<()> {
    guard::require(Some(actor), roles_reaching(to))?;

    if actor.role == Role::Patient && actor.id != appointment.patient_id {
        return Err(CareError::Forbidden(format!(
            "appointment {} does not belong to this patient",
            appointment.id
        )));
    }
    if actor.role == Role::Doctor && actor.id != appointment.provider_id {
        return Err(CareError::Forbidden(format!(
            "appointment {} is not on this doctor's calendar",
            appointment.id
        )));
    }

    let from = appointment.status;
    match transition_rule(from, to) {
        None => Err(CareError::InvalidTransition { from, to }),
        Some(permission) if !permission.permits(actor.role) => Err(CareError::Forbidden(format!(
            "role '{}' may not move an appointment from {} to {}",
            actor.role, from, to
        ))),
        Some(_) => Ok(()),
    }
}

/// Targets `actor` could move `appointment` to right now.
pub fn allowed_transitions(actor: &Principal, appointment: &Appointment) -> Vec<AppointmentStatus> {
    AppointmentStatus::ALL
        .into_iter()
        .filter(|to| check_transition(actor, appointment, *to).is_ok())
        .collect()
}

/// Read scoping: patients see their own appointments, doctors see their own
/// calendar, admins see everything.
pub fn can_read(actor: &Principal, appointment: &Appointment) -> bool {
    match actor.role {
        Role::Patient => appointment.patient_id == actor.id,
        Role::Doctor => appointment.provider_id == actor.id,
        Role::Admin => true,
    }
}

/// Sole owner of persisted appointments.
pub struct LifecycleManager {
    store: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn AppointmentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Persists a direct booking in `scheduled` status.
    ///
    /// Patients may only book for themselves; admins may book for anyone.
    pub async fn book(&self, actor: &Principal, candidate: NewAppointment) -> CareResult<Appointment> {
        let actor = guard::require(Some(actor), &[Role::Patient, Role::Admin])?;
        if actor.role == Role::Patient && actor.id != candidate.patient_id {
            return Err(CareError::Forbidden(
                "patients can only book appointments for themselves".to_string(),
            ));
        }

        self.create(candidate, AppointmentStatus::Scheduled).await
    }

    /// Persists a provider-initiated hold in `pending` status.
    pub async fn hold(&self, actor: &Principal, candidate: NewAppointment) -> CareResult<Appointment> {
        let actor = guard::require(Some(actor), STAFF)?;
        if actor.role == Role::Doctor && actor.id != candidate.provider_id {
            return Err(CareError::Forbidden(
                "doctors can only hold time on their own calendar".to_string(),
            ));
        }

        self.create(candidate, AppointmentStatus::Pending).await
    }

    async fn create(
        &self,
        candidate: NewAppointment,
        status: AppointmentStatus,
    ) -> CareResult<Appointment> {
        let appointment = candidate.into_appointment(AppointmentId::generate(), status, self.clock.now());
        let id = self.store.create(&appointment).await?;

        info!(
            appointment = %id,
            provider = %appointment.provider_id,
            date = %appointment.date,
            start = %appointment.start_time,
            %status,
            "appointment created"
        );
        Ok(appointment)
    }

    /// Moves appointment `id` to `to` on behalf of `actor`.
    ///
    /// The policy is checked against a fresh read. If another writer commits
    /// first the store reports `StaleState`, and the request is re-checked
    /// against the post-commit status rather than written blindly.
    pub async fn transition(
        &self,
        actor: &Principal,
        id: &AppointmentId,
        to: AppointmentStatus,
        provider_notes: Option<String>,
    ) -> CareResult<Appointment> {
        let mut attempt = 0;
        loop {
            let current = self
                .store
                .get(id)
                .await?
                .ok_or_else(|| CareError::NotFound(format!("Appointment with ID {} not found", id)))?;

            if let Err(e) = check_transition(actor, &current, to) {
                warn!(
                    appointment = %id,
                    principal = %actor.id,
                    from = %current.status,
                    %to,
                    error = %e,
                    "transition rejected"
                );
                return Err(e);
            }

            let command = TransitionCommand {
                from: current.status,
                to,
                actor: actor.clone(),
                provider_notes: provider_notes.clone(),
                at: self.clock.now(),
            };

            match self.store.transition(id, command).await {
                Ok(updated) => {
                    info!(
                        appointment = %id,
                        principal = %actor.id,
                        from = %current.status,
                        %to,
                        "appointment transitioned"
                    );
                    return Ok(updated);
                }
                Err(CareError::StaleState { expected, actual }) if attempt < MAX_STALE_RETRIES => {
                    attempt += 1;
                    debug!(appointment = %id, %expected, %actual, attempt, "lost transition race, re-checking");
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn confirm(&self, actor: &Principal, id: &AppointmentId) -> CareResult<Appointment> {
        self.transition(actor, id, AppointmentStatus::Confirmed, None).await
    }

    pub async fn cancel(&self, actor: &Principal, id: &AppointmentId) -> CareResult<Appointment> {
        self.transition(actor, id, AppointmentStatus::Cancelled, None).await
    }

    pub async fn complete(
        &self,
        actor: &Principal,
        id: &AppointmentId,
        provider_notes: Option<String>,
    ) -> CareResult<Appointment> {
        self.transition(actor, id, AppointmentStatus::Completed, provider_notes)
            .await
    }

    pub async fn get(&self, actor: &Principal, id: &AppointmentId) -> CareResult<Appointment> {
        let actor = guard::require(Some(actor), ANY_ROLE)?;
        let appointment = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| CareError::NotFound(format!("Appointment with ID {} not found", id)))?;

        if !can_read(actor, &appointment) {
            return Err(CareError::Forbidden(format!(
                "appointment {} is not visible to this principal",
                id
            )));
        }
        Ok(appointment)
    }

    /// Appointments matching `filter`, narrowed to what `actor` may read.
    pub async fn list(
        &self,
        actor: &Principal,
        mut filter: AppointmentFilter,
    ) -> CareResult<Vec<Appointment>> {
        let actor = guard::require(Some(actor), ANY_ROLE)?;
        match actor.role {
            Role::Patient => {
                scope(&mut filter.patient_id, &actor.id, "patient")?;
            }
            Role::Doctor => {
                scope(&mut filter.provider_id, &actor.id, "provider")?;
            }
            Role::Admin => {}
        }

        self.store.query(&filter).await
    }
}

fn scope(field: &mut Option<String>, own_id: &str, what: &str) -> CareResult<()> {
    match field {
        Some(requested) if requested != own_id => Err(CareError::Forbidden(format!(
            "cannot list appointments of another {}",
            what
        ))),
        _ => {
            *field = Some(own_id.to_string());
            Ok(())
        }
    }
}
