//! Role-based access decisions.
//!
//! Decisions are computed from the principal presented with each request and
//! never cached, so a logout or role change takes effect immediately.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    errors::{CareError, CareResult},
    models::principal::{Principal, Role},
};

/// Where a caller that must log in is sent.
pub const LOGIN_REDIRECT: &str = "/login";
/// Where an authenticated caller lacking permission is sent.
pub const NOT_PERMITTED_REDIRECT: &str = "/not-permitted";

/// Any authenticated principal.
pub const ANY_ROLE: &[Role] = &[];
pub const PATIENT_ONLY: &[Role] = &[Role::Patient];
pub const STAFF: &[Role] = &[Role::Doctor, Role::Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    DenyUnauthenticated,
    DenyForbidden,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        *self == Decision::Allow
    }

    /// External signal for the decision; `None` means proceed.
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            Decision::Allow => None,
            Decision::DenyUnauthenticated => Some(LOGIN_REDIRECT),
            Decision::DenyForbidden => Some(NOT_PERMITTED_REDIRECT),
        }
    }
}

pub fn authorize(principal: Option<&Principal>, required: &[Role]) -> Decision {
    let Some(principal) = principal else {
        return Decision::DenyUnauthenticated;
    };

    if required.is_empty() || required.contains(&principal.role) {
        Decision::Allow
    } else {
        Decision::DenyForbidden
    }
}

/// Runs `authorize` and turns a denial into the matching error kind.
pub fn require<'a>(principal: Option<&'a Principal>, required: &[Role]) -> CareResult<&'a Principal> {
    match (authorize(principal, required), principal) {
        (Decision::Allow, Some(principal)) => Ok(principal),
        (Decision::DenyForbidden, Some(principal)) => {
            debug!(principal = %principal.id, role = %principal.role, "role not permitted");
            Err(CareError::Forbidden(format!(
                "role '{}' is not permitted to perform this action",
                principal.role
            )))
        }
        _ => Err(CareError::Authentication("login required".to_string())),
    }
}
