use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use carebook_core::{
    booking::check_visit_text,
    errors::{CareError, ValidationErrors},
    guard::{ANY_ROLE, STAFF},
    lifecycle::allowed_transitions,
    models::{
        appointment::{
            Appointment, AppointmentFilter, AppointmentId, AppointmentQuery, AppointmentResponse,
            BookAppointmentRequest, HoldAppointmentRequest, NewAppointment, Payment, PaymentStatus,
            TransitionAppointmentRequest,
        },
        principal::Principal,
    },
};
use std::sync::Arc;

use crate::{
    middleware::{auth::CurrentPrincipal, error_handling::AppError},
    ApiState,
};

fn respond(actor: &Principal, appointment: Appointment) -> AppointmentResponse {
    AppointmentResponse {
        allowed_transitions: allowed_transitions(actor, &appointment),
        appointment,
    }
}

/// Runs the full booking workflow for the calling patient.
#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn book_appointment(
    State(state): State<Arc<ApiState>>,
    caller: CurrentPrincipal,
    Json(payload): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), AppError> {
    let appointment = state
        .booking
        .book(caller.principal.as_ref(), payload)
        .await?;

    // The booking succeeded, so the caller is a patient.
    let actor = caller.require(ANY_ROLE)?;
    Ok((StatusCode::CREATED, Json(respond(actor, appointment))))
}

/// Places a provider-initiated hold, created `pending`.
#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn hold_appointment(
    State(state): State<Arc<ApiState>>,
    caller: CurrentPrincipal,
    Json(payload): Json<HoldAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), AppError> {
    let actor = caller.require(STAFF)?;

    let mut errors = ValidationErrors::new();
    check_visit_text(&payload.reason, payload.notes.as_deref(), &mut errors);
    errors.into_result().map_err(CareError::Validation)?;

    let provider = state.slots().provider(&payload.provider_id).await?;
    let option = provider
        .consultation(payload.consultation_type)
        .ok_or_else(|| {
            CareError::invalid(
                "consultationType",
                format!("{} does not offer {}", provider.name, payload.consultation_type),
            )
        })?;
    if !provider.fits(payload.date, payload.start_time, option.duration_minutes) {
        return Err(CareError::invalid(
            "slot",
            format!(
                "a {}-minute visit at {} runs past {}",
                option.duration_minutes, payload.start_time, provider.working_hours.end
            ),
        )
        .into());
    }

    let slot = state
        .slots()
        .find_slot(&provider, payload.date, payload.start_time)
        .await?
        .ok_or_else(|| {
            CareError::invalid(
                "slot",
                format!(
                    "{} has no slot at {} on {}",
                    provider.name, payload.start_time, payload.date
                ),
            )
        })?;
    if !slot.available {
        return Err(CareError::Conflict(format!(
            "the {} slot on {} is already taken",
            slot.start_time, slot.date
        ))
        .into());
    }

    let candidate = NewAppointment {
        patient_id: payload.patient_id,
        provider_id: provider.id.clone(),
        date: payload.date,
        start_time: payload.start_time,
        duration_minutes: option.duration_minutes,
        consultation_type: option.kind,
        reason: payload.reason.trim().to_string(),
        symptoms: Vec::new(),
        payment: Payment {
            amount: option.fee,
            status: PaymentStatus::Pending,
        },
        notes: payload.notes,
    };

    let appointment = state.lifecycle.hold(actor, candidate).await?;
    Ok((StatusCode::CREATED, Json(respond(actor, appointment))))
}

/// Appointments visible to the caller, narrowed by the optional query.
#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn list_appointments(
    State(state): State<Arc<ApiState>>,
    caller: CurrentPrincipal,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    let actor = caller.require(ANY_ROLE)?;
    let filter = AppointmentFilter {
        date: query.date,
        status: query.status,
        ..AppointmentFilter::default()
    };

    let appointments = state.lifecycle.list(actor, filter).await?;
    Ok(Json(
        appointments
            .into_iter()
            .map(|appointment| respond(actor, appointment))
            .collect(),
    ))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn get_appointment(
    State(state): State<Arc<ApiState>>,
    caller: CurrentPrincipal,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let actor = caller.require(ANY_ROLE)?;
    let appointment = state.lifecycle.get(actor, &AppointmentId::from(id)).await?;
    Ok(Json(respond(actor, appointment)))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn transition_appointment(
    State(state): State<Arc<ApiState>>,
    caller: CurrentPrincipal,
    Path(id): Path<String>,
    Json(payload): Json<TransitionAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let actor = caller.require(ANY_ROLE)?;
    let appointment = state
        .lifecycle
        .transition(actor, &AppointmentId::from(id), payload.to, payload.provider_notes)
        .await?;
    Ok(Json(respond(actor, appointment)))
}
