use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::appointment::AppointmentStatus;

/// A single field-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field failure found in one validation pass.
///
/// Validation never stops at the first failure so a form can show all of
/// its problems at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error list holding a single field failure.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// First message recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum CareError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Stale state: expected {expected}, found {actual}")]
    StaleState {
        expected: AppointmentStatus,
        actual: AppointmentStatus,
    },

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl CareError {
    /// Shorthand for a validation error on a single field.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        CareError::Validation(ValidationErrors::single(field, message))
    }

    /// Whether this kind recurs in normal operation.
    ///
    /// Field validation and booking conflicts are user noise; everything else
    /// points at misuse or an infrastructure fault and is logged separately.
    pub fn is_expected(&self) -> bool {
        matches!(self, CareError::Validation(_) | CareError::Conflict(_))
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CareError::NotFound(_) => "not_found",
            CareError::Validation(_) => "validation",
            CareError::Authentication(_) => "unauthenticated",
            CareError::Forbidden(_) => "forbidden",
            CareError::InvalidTransition { .. } => "invalid_transition",
            CareError::Conflict(_) => "conflict",
            CareError::StaleState { .. } => "stale_state",
            CareError::Database(_) => "database",
            CareError::Internal(_) => "internal",
        }
    }
}

impl From<ValidationErrors> for CareError {
    fn from(errors: ValidationErrors) -> Self {
        CareError::Validation(errors)
    }
}

pub type CareResult<T> = Result<T, CareError>;
