//! Authentication types for JWT.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (caller ID).
    pub sub: Uuid,
    /// Tenant ID (empresa context).
    pub org: Uuid,
    /// Caller role; backend processes carry `system`.
    pub role: String,
    /// Custom admin claim.
    #[serde(default)]
    pub admin: bool,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a caller.
    #[must_use]
    pub fn new(user_id: Uuid, tenant_id: Uuid, role: &str, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            org: tenant_id,
            role: role.to_string(),
            admin: false,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Sets the admin claim.
    #[must_use]
    pub const fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    /// Returns the caller ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the tenant ID from claims.
    #[must_use]
    pub const fn tenant_id(&self) -> Uuid {
        self.org
    }
}
