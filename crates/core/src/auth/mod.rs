//! Caller identity for state-changing operations.
//!
//! The status-changing RPCs may only be invoked by the backend: a principal
//! whose role is `system`, or one carrying the admin flag. The check runs
//! before anything is read from the store.

use serde::{Deserialize, Serialize};

use crate::workflow::error::WorkflowError;

/// Role name reserved for backend callers.
pub const SYSTEM_ROLE: &str = "system";

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Caller uid.
    pub uid: String,
    /// Role claim.
    pub role: String,
    /// Admin flag claim.
    #[serde(default)]
    pub admin: bool,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub fn new(uid: impl Into<String>, role: impl Into<String>, admin: bool) -> Self {
        Self {
            uid: uid.into(),
            role: role.into(),
            admin,
        }
    }

    /// Backend principal, used by internal callers.
    #[must_use]
    pub fn system(uid: impl Into<String>) -> Self {
        Self::new(uid, SYSTEM_ROLE, false)
    }

    /// Returns true for backend callers.
    #[must_use]
    pub fn is_backend(&self) -> bool {
        self.role == SYSTEM_ROLE || self.admin
    }
}

/// Requires an authenticated backend caller.
pub fn ensure_backend(principal: Option<&Principal>) -> Result<&Principal, WorkflowError> {
    let principal = principal.ok_or(WorkflowError::Unauthenticated)?;
    if !principal.is_backend() {
        return Err(WorkflowError::NotBackendCaller);
    }
    Ok(principal)
}
