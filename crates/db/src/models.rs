use carebook_core::models::{
    appointment::{Appointment, AppointmentId, Payment},
    principal::{Account, Principal},
    provider::{ConsultationOption, Provider, WorkingHours},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: String,
    pub patient_id: String,
    pub provider_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub consultation_type: String,
    pub reason: String,
    pub symptoms: Vec<String>,
    pub status: String,
    pub payment_amount: i64,
    pub payment_status: String,
    pub notes: Option<String>,
    pub provider_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbAppointment> for Appointment {
    type Error = eyre::Report;

    fn try_from(row: DbAppointment) -> Result<Self> {
        Ok(Appointment {
            id: AppointmentId::from(row.id),
            patient_id: row.patient_id,
            provider_id: row.provider_id,
            date: row.date,
            start_time: row.start_time,
            duration_minutes: u32::try_from(row.duration_minutes)
                .map_err(|_| eyre!("negative duration {}", row.duration_minutes))?,
            consultation_type: row.consultation_type.parse().map_err(|e: String| eyre!(e))?,
            reason: row.reason,
            symptoms: row.symptoms,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            payment: Payment {
                amount: row.payment_amount,
                status: row.payment_status.parse().map_err(|e: String| eyre!(e))?,
            },
            notes: row.notes,
            provider_notes: row.provider_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbProvider {
    pub id: String,
    pub name: String,
    pub specialization: String,
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbConsultationOption {
    pub provider_id: String,
    pub kind: String,
    pub fee: i64,
    pub duration_minutes: i32,
}

impl TryFrom<DbConsultationOption> for ConsultationOption {
    type Error = eyre::Report;

    fn try_from(row: DbConsultationOption) -> Result<Self> {
        Ok(ConsultationOption {
            kind: row.kind.parse().map_err(|e: String| eyre!(e))?,
            fee: row.fee,
            duration_minutes: u32::try_from(row.duration_minutes)
                .map_err(|_| eyre!("negative duration {}", row.duration_minutes))?,
        })
    }
}

impl DbProvider {
    pub fn into_provider(self, options: Vec<DbConsultationOption>) -> Result<Provider> {
        let consultation_types = options
            .into_iter()
            .map(ConsultationOption::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Provider {
            id: self.id,
            name: self.name,
            specialization: self.specialization,
            consultation_types,
            working_hours: WorkingHours {
                start: self.work_start,
                end: self.work_end,
            },
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAccount {
    pub id: String,
    pub email: String,
    pub role: String,
    pub display_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl DbAccount {
    pub fn principal(&self) -> Result<Principal> {
        Ok(Principal {
            id: self.id.clone(),
            role: self.role.parse().map_err(|e: String| eyre!(e))?,
            display_name: self.display_name.clone(),
        })
    }
}

impl TryFrom<DbAccount> for Account {
    type Error = eyre::Report;

    fn try_from(row: DbAccount) -> Result<Self> {
        Ok(Account {
            principal: row.principal()?,
            email: row.email,
            password_hash: row.password_hash,
        })
    }
}
