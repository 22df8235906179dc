//! # Booking workflow
//!
//! A booking attempt moves forward through four stages:
//!
//! 1. `SelectingProvider` - pick who to see
//! 2. `SelectingSlot` - pick an available slot on a date
//! 3. `EnteringDetails` - contact details, reason, symptoms, consultation type
//! 4. `Confirmed` - the appointment has been persisted
//!
//! `back()` steps to the previous stage and keeps whatever was already
//! entered. Field validation failures are collected per field and never move
//! the workflow. On submission the slot is recomputed from the store: if it
//! was taken in the meantime the workflow returns to `SelectingSlot`, any
//! other persistence failure leaves it in `EnteringDetails`.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    errors::{CareError, CareResult, ValidationErrors},
    guard::{self, PATIENT_ONLY},
    lifecycle::LifecycleManager,
    models::{
        appointment::{
            Appointment, BookAppointmentRequest, NewAppointment, Payment, PaymentStatus,
        },
        principal::Principal,
        provider::{ConsultationType, Provider},
        time_slot::TimeSlot,
    },
    slots::SlotService,
};

pub const PATIENT_NAME_MAX: usize = 100;
pub const REASON_MAX: usize = 500;
pub const SYMPTOMS_MAX: usize = 20;
pub const SYMPTOM_MAX: usize = 50;
pub const NOTES_MAX: usize = 1000;
pub const PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStage {
    SelectingProvider,
    SelectingSlot,
    EnteringDetails,
    Confirmed,
}

impl fmt::Display for BookingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingStage::SelectingProvider => "selecting provider",
            BookingStage::SelectingSlot => "selecting slot",
            BookingStage::EnteringDetails => "entering details",
            BookingStage::Confirmed => "confirmed",
        };
        f.write_str(name)
    }
}

/// Patient-entered fields of the details stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetails {
    pub patient_name: String,
    pub email: String,
    pub phone: String,
    pub reason: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub notes: Option<String>,
    pub consultation_type: Option<ConsultationType>,
}

/// Everything accumulated during one booking attempt.
#[derive(Debug, Clone, Default)]
pub struct BookingDraft {
    pub provider: Option<Provider>,
    pub date: Option<NaiveDate>,
    pub slot: Option<TimeSlot>,
    pub details: PatientDetails,
    pub errors: ValidationErrors,
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == PHONE_DIGITS && phone.bytes().all(|b| b.is_ascii_digit())
}

fn check_symptom(symptom: &str, errors: &mut ValidationErrors) {
    if symptom.trim().is_empty() {
        errors.push("symptoms", "symptoms cannot be blank");
    } else if symptom.chars().count() > SYMPTOM_MAX {
        errors.push(
            "symptoms",
            format!("each symptom must be at most {} characters", SYMPTOM_MAX),
        );
    }
}

/// Reason and notes limits, shared by patient bookings and provider holds.
pub fn check_visit_text(reason: &str, notes: Option<&str>, errors: &mut ValidationErrors) {
    if reason.trim().is_empty() {
        errors.push("reason", "reason for visit is required");
    } else if reason.chars().count() > REASON_MAX {
        errors.push(
            "reason",
            format!("reason must be at most {} characters", REASON_MAX),
        );
    }

    if notes.is_some_and(|notes| notes.chars().count() > NOTES_MAX) {
        errors.push(
            "notes",
            format!("notes must be at most {} characters", NOTES_MAX),
        );
    }
}

/// Validates the details stage against `provider`'s offering.
pub fn validate_details(details: &PatientDetails, provider: &Provider) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let name_len = details.patient_name.trim().chars().count();
    if name_len == 0 {
        errors.push("patientName", "patient name is required");
    } else if details.patient_name.chars().count() > PATIENT_NAME_MAX {
        errors.push(
            "patientName",
            format!("patient name must be at most {} characters", PATIENT_NAME_MAX),
        );
    }

    if !is_valid_email(&details.email) {
        errors.push("email", "a valid email address is required");
    }

    if !is_valid_phone(&details.phone) {
        errors.push(
            "phone",
            format!("phone number must be exactly {} digits", PHONE_DIGITS),
        );
    }

    check_visit_text(&details.reason, details.notes.as_deref(), &mut errors);

    if details.symptoms.len() > SYMPTOMS_MAX {
        errors.push(
            "symptoms",
            format!("at most {} symptoms can be listed", SYMPTOMS_MAX),
        );
    }
    for symptom in &details.symptoms {
        check_symptom(symptom, &mut errors);
    }

    match details.consultation_type {
        None => errors.push("consultationType", "consultation type is required"),
        Some(kind) if !provider.offers(kind) => errors.push(
            "consultationType",
            format!("{} does not offer {} consultations", provider.name, kind),
        ),
        Some(_) => {}
    }

    errors
}

/// In-progress booking for one patient.
#[derive(Debug, Clone)]
pub struct BookingWorkflow {
    patient: Principal,
    stage: BookingStage,
    draft: BookingDraft,
    appointment: Option<Appointment>,
}

impl BookingWorkflow {
    pub fn new(patient: Principal) -> Self {
        Self {
            patient,
            stage: BookingStage::SelectingProvider,
            draft: BookingDraft::default(),
            appointment: None,
        }
    }

    pub fn stage(&self) -> BookingStage {
        self.stage
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn patient(&self) -> &Principal {
        &self.patient
    }

    /// The persisted appointment once the workflow is `Confirmed`.
    pub fn appointment(&self) -> Option<&Appointment> {
        self.appointment.as_ref()
    }

    fn expect_stage(&self, expected: BookingStage) -> CareResult<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(CareError::invalid(
                "stage",
                format!("expected stage '{}', booking is at '{}'", expected, self.stage),
            ))
        }
    }

    pub fn select_provider(&mut self, provider: Provider) -> CareResult<()> {
        self.expect_stage(BookingStage::SelectingProvider)?;

        let changed = self
            .draft
            .provider
            .as_ref()
            .is_none_or(|current| current.id != provider.id);
        if changed {
            // Slot and consultation type belong to the previous provider.
            self.draft.date = None;
            self.draft.slot = None;
            self.draft.details.consultation_type = None;
        }

        debug!(provider = %provider.id, "provider selected");
        self.draft.provider = Some(provider);
        self.stage = BookingStage::SelectingSlot;
        Ok(())
    }

    pub fn select_slot(&mut self, slot: TimeSlot) -> CareResult<()> {
        self.expect_stage(BookingStage::SelectingSlot)?;

        if !slot.available {
            return Err(CareError::invalid(
                "slot",
                format!("the {} slot on {} is not available", slot.start_time, slot.date),
            ));
        }

        debug!(date = %slot.date, start = %slot.start_time, "slot selected");
        self.draft.date = Some(slot.date);
        self.draft.slot = Some(slot);
        self.stage = BookingStage::EnteringDetails;
        Ok(())
    }

    /// Replaces the details and validates them. Symptoms are deduplicated.
    pub fn set_details(&mut self, mut details: PatientDetails) -> CareResult<()> {
        self.expect_stage(BookingStage::EnteringDetails)?;

        let mut unique: Vec<String> = Vec::with_capacity(details.symptoms.len());
        for symptom in details.symptoms.drain(..) {
            let symptom = symptom.trim().to_string();
            if !unique.contains(&symptom) {
                unique.push(symptom);
            }
        }
        details.symptoms = unique;
        self.draft.details = details;

        let errors = match &self.draft.provider {
            Some(provider) => validate_details(&self.draft.details, provider),
            None => ValidationErrors::single("provider", "no provider selected"),
        };
        self.draft.errors = errors.clone();
        errors.into_result().map_err(CareError::Validation)
    }

    /// Adds one symptom. Returns `false` when it was already listed.
    pub fn add_symptom(&mut self, symptom: &str) -> CareResult<bool> {
        self.expect_stage(BookingStage::EnteringDetails)?;

        let symptom = symptom.trim();
        let mut errors = ValidationErrors::new();
        check_symptom(symptom, &mut errors);
        errors.into_result()?;

        let symptoms = &mut self.draft.details.symptoms;
        if symptoms.iter().any(|s| s == symptom) {
            return Ok(false);
        }
        if symptoms.len() >= SYMPTOMS_MAX {
            return Err(CareError::invalid(
                "symptoms",
                format!("at most {} symptoms can be listed", SYMPTOMS_MAX),
            ));
        }
        symptoms.push(symptom.to_string());
        Ok(true)
    }

    pub fn remove_symptom(&mut self, symptom: &str) -> bool {
        let symptoms = &mut self.draft.details.symptoms;
        let before = symptoms.len();
        symptoms.retain(|s| s != symptom.trim());
        symptoms.len() != before
    }

    /// Steps back one stage, keeping everything already entered.
    pub fn back(&mut self) -> BookingStage {
        self.stage = match self.stage {
            BookingStage::SelectingProvider => BookingStage::SelectingProvider,
            BookingStage::SelectingSlot => BookingStage::SelectingProvider,
            BookingStage::EnteringDetails => BookingStage::SelectingSlot,
            BookingStage::Confirmed => BookingStage::Confirmed,
        };
        self.stage
    }

    /// Assembles the candidate appointment, validating every stage's input.
    pub fn candidate(&mut self) -> Result<NewAppointment, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let Some(provider) = self.draft.provider.as_ref() else {
            errors.push("provider", "no provider selected");
            self.draft.errors = errors.clone();
            return Err(errors);
        };
        let Some(slot) = self.draft.slot.as_ref() else {
            errors.push("slot", "no time slot selected");
            self.draft.errors = errors.clone();
            return Err(errors);
        };

        let details = &self.draft.details;
        let errors = validate_details(details, provider);
        self.draft.errors = errors.clone();
        errors.into_result()?;

        let kind = details
            .consultation_type
            .ok_or_else(|| ValidationErrors::single("consultationType", "consultation type is required"))?;
        let option = provider.consultation(kind).ok_or_else(|| {
            ValidationErrors::single("consultationType", "consultation type is not offered")
        })?;
        if !provider.fits(slot.date, slot.start_time, option.duration_minutes) {
            let errors = ValidationErrors::single(
                "slot",
                format!(
                    "a {}-minute {} visit at {} runs past {}",
                    option.duration_minutes, kind, slot.start_time, provider.working_hours.end
                ),
            );
            self.draft.errors = errors.clone();
            return Err(errors);
        }

        Ok(NewAppointment {
            patient_id: self.patient.id.clone(),
            provider_id: provider.id.clone(),
            date: slot.date,
            start_time: slot.start_time,
            duration_minutes: option.duration_minutes,
            consultation_type: kind,
            reason: details.reason.trim().to_string(),
            symptoms: details.symptoms.clone(),
            payment: Payment {
                amount: option.fee,
                status: PaymentStatus::Pending,
            },
            notes: details.notes.clone().filter(|n| !n.trim().is_empty()),
        })
    }

    fn return_to_slot_selection(&mut self) {
        self.draft.slot = None;
        self.stage = BookingStage::SelectingSlot;
    }

    fn confirm(&mut self, appointment: Appointment) {
        self.appointment = Some(appointment);
        self.stage = BookingStage::Confirmed;
    }
}

/// Drives booking workflows against live slot data and the lifecycle manager.
pub struct BookingService {
    slots: SlotService,
    lifecycle: Arc<LifecycleManager>,
}

impl BookingService {
    pub fn new(slots: SlotService, lifecycle: Arc<LifecycleManager>) -> Self {
        Self { slots, lifecycle }
    }

    pub fn slots(&self) -> &SlotService {
        &self.slots
    }

    /// Opens a workflow; only patients may book.
    pub fn start(&self, principal: Option<&Principal>) -> CareResult<BookingWorkflow> {
        let patient = guard::require(principal, PATIENT_ONLY)?;
        Ok(BookingWorkflow::new(patient.clone()))
    }

    pub async fn choose_provider(
        &self,
        workflow: &mut BookingWorkflow,
        provider_id: &str,
    ) -> CareResult<()> {
        let provider = self.slots.provider(provider_id).await?;
        workflow.select_provider(provider)
    }

    /// Looks up the current slot at `start_time` and selects it.
    pub async fn choose_slot(
        &self,
        workflow: &mut BookingWorkflow,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> CareResult<TimeSlot> {
        let provider = workflow
            .draft()
            .provider
            .clone()
            .ok_or_else(|| CareError::invalid("provider", "no provider selected"))?;

        let slot = self
            .slots
            .find_slot(&provider, date, start_time)
            .await?
            .ok_or_else(|| {
                CareError::invalid(
                    "slot",
                    format!("{} has no bookable slot at {} on {}", provider.name, start_time, date),
                )
            })?;

        workflow.select_slot(slot.clone())?;
        Ok(slot)
    }

    /// Re-validates the slot against the store and persists the appointment.
    pub async fn submit(&self, workflow: &mut BookingWorkflow) -> CareResult<Appointment> {
        workflow.expect_stage(BookingStage::EnteringDetails)?;
        let candidate = workflow.candidate()?;

        let provider = workflow
            .draft()
            .provider
            .clone()
            .ok_or_else(|| CareError::invalid("provider", "no provider selected"))?;

        let fresh = self
            .slots
            .find_slot(&provider, candidate.date, candidate.start_time)
            .await?;
        if !fresh.is_some_and(|slot| slot.available) {
            workflow.return_to_slot_selection();
            return Err(CareError::Conflict(format!(
                "the {} slot on {} is no longer available",
                candidate.start_time, candidate.date
            )));
        }

        match self.lifecycle.book(workflow.patient(), candidate).await {
            Ok(appointment) => {
                info!(appointment = %appointment.id, patient = %appointment.patient_id, "booking confirmed");
                workflow.confirm(appointment.clone());
                Ok(appointment)
            }
            Err(CareError::Conflict(message)) => {
                workflow.return_to_slot_selection();
                Err(CareError::Conflict(message))
            }
            Err(e) => Err(e),
        }
    }

    /// Runs every stage in order from a single request.
    pub async fn book(
        &self,
        principal: Option<&Principal>,
        request: BookAppointmentRequest,
    ) -> CareResult<Appointment> {
        let mut workflow = self.start(principal)?;
        self.choose_provider(&mut workflow, &request.provider_id).await?;
        self.choose_slot(&mut workflow, request.date, request.start_time)
            .await?;
        workflow.set_details(PatientDetails {
            patient_name: request.patient_name,
            email: request.email,
            phone: request.phone,
            reason: request.reason,
            symptoms: request.symptoms,
            notes: request.notes,
            consultation_type: Some(request.consultation_type),
        })?;
        self.submit(&mut workflow).await
    }
}
