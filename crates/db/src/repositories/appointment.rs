use async_trait::async_trait;
use carebook_core::{
    errors::{CareError, CareResult},
    lifecycle::check_transition,
    models::appointment::{Appointment, AppointmentFilter, AppointmentId},
    store::{AppointmentStore, TransitionCommand},
};
use eyre::Result;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{db_error, models::DbAppointment, DbPool};

const COLUMNS: &str = "id, patient_id, provider_id, date, start_time, duration_minutes, \
    consultation_type, reason, symptoms, status, payment_amount, payment_status, notes, \
    provider_notes, created_at, updated_at";

pub async fn get_appointment_by_id(
    pool: &Pool<Postgres>,
    id: &str,
) -> Result<Option<Appointment>> {
    let row = sqlx::query_as::<_, DbAppointment>(&format!(
        "SELECT {} FROM appointments WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Appointment::try_from).transpose()
}

pub async fn query_appointments(
    pool: &Pool<Postgres>,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM appointments WHERE TRUE",
        COLUMNS
    ));

    if let Some(patient_id) = &filter.patient_id {
        query.push(" AND patient_id = ").push_bind(patient_id.clone());
    }
    if let Some(provider_id) = &filter.provider_id {
        query.push(" AND provider_id = ").push_bind(provider_id.clone());
    }
    if let Some(date) = filter.date {
        query.push(" AND date = ").push_bind(date);
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    if filter.exclude_cancelled {
        query.push(" AND status <> 'cancelled'");
    }
    query.push(" ORDER BY date ASC, start_time ASC");

    let rows = query
        .build_query_as::<DbAppointment>()
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(Appointment::try_from).collect()
}

/// Inserts `appointment` unless it overlaps a live booking of its provider.
///
/// A transaction-scoped advisory lock keyed by provider serializes concurrent
/// bookings of the same provider; other providers are not blocked.
pub async fn create_appointment(
    pool: &Pool<Postgres>,
    appointment: &Appointment,
) -> CareResult<AppointmentId> {
    let mut tx = pool.begin().await.map_err(db_error)?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&appointment.provider_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

    let overlapping = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM appointments
        WHERE provider_id = $1
          AND status <> 'cancelled'
          AND (date + start_time) < $3
          AND (date + start_time + make_interval(mins => duration_minutes)) > $2
        "#,
    )
    .bind(&appointment.provider_id)
    .bind(appointment.starts_at())
    .bind(appointment.ends_at())
    .fetch_one(&mut *tx)
    .await
    .map_err(db_error)?;

    if overlapping > 0 {
        tracing::debug!(
            provider = %appointment.provider_id,
            start = %appointment.starts_at(),
            "booking overlaps an existing appointment"
        );
        return Err(CareError::Conflict(format!(
            "provider {} is already booked at {} on {}",
            appointment.provider_id, appointment.start_time, appointment.date
        )));
    }

    let inserted = sqlx::query(&format!(
        r#"
        INSERT INTO appointments ({})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
        COLUMNS
    ))
    .bind(appointment.id.as_str())
    .bind(&appointment.patient_id)
    .bind(&appointment.provider_id)
    .bind(appointment.date)
    .bind(appointment.start_time)
    .bind(appointment.duration_minutes as i32)
    .bind(appointment.consultation_type.as_str())
    .bind(&appointment.reason)
    .bind(&appointment.symptoms)
    .bind(appointment.status.as_str())
    .bind(appointment.payment.amount)
    .bind(appointment.payment.status.as_str())
    .bind(&appointment.notes)
    .bind(&appointment.provider_notes)
    .bind(appointment.created_at)
    .bind(appointment.updated_at)
    .execute(&mut *tx)
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(CareError::Conflict(format!(
                "appointment {} already exists",
                appointment.id
            )));
        }
        Err(e) => return Err(db_error(e)),
    }

    tx.commit().await.map_err(db_error)?;
    tracing::debug!("Appointment created: id={}", appointment.id);
    Ok(appointment.id.clone())
}

/// Compare-and-set status change under a row lock.
pub async fn transition_appointment(
    pool: &Pool<Postgres>,
    id: &AppointmentId,
    command: TransitionCommand,
) -> CareResult<Appointment> {
    let mut tx = pool.begin().await.map_err(db_error)?;

    let row = sqlx::query_as::<_, DbAppointment>(&format!(
        "SELECT {} FROM appointments WHERE id = $1 FOR UPDATE",
        COLUMNS
    ))
    .bind(id.as_str())
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_error)?
    .ok_or_else(|| CareError::NotFound(format!("Appointment with ID {} not found", id)))?;

    let current = Appointment::try_from(row)?;
    if current.status != command.from {
        return Err(CareError::StaleState {
            expected: command.from,
            actual: current.status,
        });
    }
    check_transition(&command.actor, &current, command.to)?;

    let updated = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = $2, provider_notes = COALESCE($3, provider_notes), updated_at = $4
        WHERE id = $1
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(id.as_str())
    .bind(command.to.as_str())
    .bind(&command.provider_notes)
    .bind(command.at)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_error)?;

    tx.commit().await.map_err(db_error)?;
    Ok(Appointment::try_from(updated)?)
}

/// `AppointmentStore` backed by PostgreSQL.
#[derive(Clone)]
pub struct PgAppointmentStore {
    pool: DbPool,
}

impl PgAppointmentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppointmentStore for PgAppointmentStore {
    async fn get(&self, id: &AppointmentId) -> CareResult<Option<Appointment>> {
        Ok(get_appointment_by_id(&self.pool, id.as_str()).await?)
    }

    async fn query(&self, filter: &AppointmentFilter) -> CareResult<Vec<Appointment>> {
        Ok(query_appointments(&self.pool, filter).await?)
    }

    async fn create(&self, appointment: &Appointment) -> CareResult<AppointmentId> {
        create_appointment(&self.pool, appointment).await
    }

    async fn transition(
        &self,
        id: &AppointmentId,
        command: TransitionCommand,
    ) -> CareResult<Appointment> {
        transition_appointment(&self.pool, id, command).await
    }
}
