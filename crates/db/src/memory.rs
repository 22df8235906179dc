//! In-process implementations of the store traits.
//!
//! Used by the `memory` storage backend and throughout the test suites. Each
//! appointment sits behind its own async mutex so transitions on different ids
//! never wait on each other; bookings take a per-provider lock around the
//! overlap check and insert.

use std::collections::HashMap;
use std::sync::{Arc, RwLock as StdRwLock};

use async_trait::async_trait;
use carebook_core::{
    errors::{CareError, CareResult},
    lifecycle::check_transition,
    models::{
        appointment::{Appointment, AppointmentFilter, AppointmentId},
        principal::{Account, Principal},
        provider::Provider,
    },
    slots::Interval,
    store::{AccountStore, AppointmentStore, ProviderDirectory, TransitionCommand},
};
use tokio::sync::{Mutex, RwLock};

fn poisoned() -> CareError {
    CareError::Internal("in-memory store lock poisoned".into())
}

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    records: RwLock<HashMap<AppointmentId, Arc<Mutex<Appointment>>>>,
    provider_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, id: &AppointmentId) -> Option<Arc<Mutex<Appointment>>> {
        self.records.read().await.get(id).cloned()
    }

    async fn provider_lock(&self, provider_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.provider_locks.lock().await;
        locks.entry(provider_id.to_string()).or_default().clone()
    }

    async fn snapshot(&self) -> Vec<Appointment> {
        let records: Vec<Arc<Mutex<Appointment>>> =
            self.records.read().await.values().cloned().collect();

        let mut appointments = Vec::with_capacity(records.len());
        for record in records {
            appointments.push(record.lock().await.clone());
        }
        appointments
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn get(&self, id: &AppointmentId) -> CareResult<Option<Appointment>> {
        match self.record(id).await {
            Some(record) => Ok(Some(record.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn query(&self, filter: &AppointmentFilter) -> CareResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|a| filter.matches(a))
            .collect();
        appointments.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
        Ok(appointments)
    }

    async fn create(&self, appointment: &Appointment) -> CareResult<AppointmentId> {
        let lock = self.provider_lock(&appointment.provider_id).await;
        let _booking = lock.lock().await;

        if self.records.read().await.contains_key(&appointment.id) {
            return Err(CareError::Conflict(format!(
                "appointment {} already exists",
                appointment.id
            )));
        }

        let candidate = Interval::from(appointment);
        let taken = self.snapshot().await.into_iter().any(|existing| {
            existing.provider_id == appointment.provider_id
                && existing.status.occupies_slot()
                && Interval::from(&existing).overlaps(&candidate)
        });
        if taken {
            return Err(CareError::Conflict(format!(
                "provider {} is already booked at {} on {}",
                appointment.provider_id, appointment.start_time, appointment.date
            )));
        }

        self.records.write().await.insert(
            appointment.id.clone(),
            Arc::new(Mutex::new(appointment.clone())),
        );
        Ok(appointment.id.clone())
    }

    async fn transition(
        &self,
        id: &AppointmentId,
        command: TransitionCommand,
    ) -> CareResult<Appointment> {
        let record = self
            .record(id)
            .await
            .ok_or_else(|| CareError::NotFound(format!("Appointment with ID {} not found", id)))?;
        let mut current = record.lock().await;

        if current.status != command.from {
            return Err(CareError::StaleState {
                expected: command.from,
                actual: current.status,
            });
        }
        check_transition(&command.actor, &current, command.to)?;

        current.status = command.to;
        if let Some(notes) = command.provider_notes {
            current.provider_notes = Some(notes);
        }
        current.updated_at = command.at;
        Ok(current.clone())
    }
}

#[derive(Default)]
pub struct InMemoryProviderDirectory {
    providers: StdRwLock<HashMap<String, Provider>>,
}

impl InMemoryProviderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_providers(providers: impl IntoIterator<Item = Provider>) -> Self {
        let directory = Self::new();
        for provider in providers {
            directory.insert(provider);
        }
        directory
    }

    pub fn insert(&self, provider: Provider) {
        if let Ok(mut providers) = self.providers.write() {
            providers.insert(provider.id.clone(), provider);
        }
    }
}

#[async_trait]
impl ProviderDirectory for InMemoryProviderDirectory {
    async fn get(&self, provider_id: &str) -> CareResult<Option<Provider>> {
        let providers = self.providers.read().map_err(|_| poisoned())?;
        Ok(providers.get(provider_id).cloned())
    }

    async fn list(&self) -> CareResult<Vec<Provider>> {
        let providers = self.providers.read().map_err(|_| poisoned())?;
        let mut list: Vec<Provider> = providers.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }
}

#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: StdRwLock<HashMap<String, Account>>,
    tokens: StdRwLock<HashMap<String, String>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> CareResult<Option<Account>> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(accounts.get(&email.to_lowercase()).cloned())
    }

    async fn insert_account(&self, account: &Account) -> CareResult<()> {
        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        let key = account.email.to_lowercase();
        if accounts.contains_key(&key) {
            return Err(CareError::Conflict(format!(
                "account {} already exists",
                account.email
            )));
        }
        accounts.insert(key, account.clone());
        Ok(())
    }

    async fn store_token(&self, token: &str, principal_id: &str) -> CareResult<()> {
        let mut tokens = self.tokens.write().map_err(|_| poisoned())?;
        tokens.insert(token.to_string(), principal_id.to_string());
        Ok(())
    }

    async fn resolve_token(&self, token: &str) -> CareResult<Option<Principal>> {
        let principal_id = {
            let tokens = self.tokens.read().map_err(|_| poisoned())?;
            match tokens.get(token) {
                Some(id) => id.clone(),
                None => return Ok(None),
            }
        };

        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(accounts
            .values()
            .find(|a| a.principal.id == principal_id)
            .map(|a| a.principal.clone()))
    }

    async fn revoke_token(&self, token: &str) -> CareResult<()> {
        let mut tokens = self.tokens.write().map_err(|_| poisoned())?;
        tokens.remove(token);
        Ok(())
    }
}
