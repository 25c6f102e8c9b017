//! Identity and role gate for privileged operations.
//!
//! # Responsibility
//! - Resolve the acting identity through an injected provider.
//! - Resolve its role from the `profiles` table.
//! - Deny by default: unknown or missing roles resolve to `member`.
//!
//! # Invariants
//! - Gate checks have no side effects.
//! - Admin-only operations must pass `require_admin()` before any store
//!   read or write.

use crate::repo::person_repo::RepoError;
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use log::warn;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stored string for the admin role.
pub const ROLE_ADMIN: &str = "admin";
/// Stored string for the member role.
pub const ROLE_MEMBER: &str = "member";

/// Authenticated user identity supplied by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    pub user_id: Uuid,
}

impl Identity {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Authorization role of one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::Member => ROLE_MEMBER,
        }
    }

    /// Parses one stored role string. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            ROLE_ADMIN => Some(Self::Admin),
            ROLE_MEMBER => Some(Self::Member),
            _ => None,
        }
    }

    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }
}

/// Source of the current authenticated identity.
///
/// Implementations typically wrap a request session; the gate never caches
/// the result across calls.
pub trait IdentityProvider {
    fn current_identity(&self) -> Option<Identity>;
}

/// Fixed identity provider, used by the CLI and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity(Option<Identity>);

impl StaticIdentity {
    pub fn signed_in(user_id: Uuid) -> Self {
        Self(Some(Identity::new(user_id)))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.0
    }
}

/// Identity paired with its resolved role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizedIdentity {
    pub identity: Identity,
    pub role: Role,
}

impl AuthorizedIdentity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Gate failures.
#[derive(Debug)]
pub enum AccessError {
    /// No identity is signed in.
    Unauthenticated,
    /// Identity is signed in but lacks the admin role.
    Forbidden { user_id: Uuid },
    /// Role lookup failed.
    Store(RepoError),
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "sign-in required"),
            Self::Forbidden { .. } => write!(f, "access denied: admin role required"),
            Self::Store(err) => write!(f, "role lookup failed: {err}"),
        }
    }
}

impl Error for AccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AccessError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Role gate over an explicit connection and identity provider.
pub struct AccessGate<'a> {
    conn: &'a Connection,
    identities: &'a dyn IdentityProvider,
}

impl<'a> AccessGate<'a> {
    pub fn new(conn: &'a Connection, identities: &'a dyn IdentityProvider) -> Self {
        Self { conn, identities }
    }

    /// Returns the signed-in identity, if any.
    pub fn current_identity(&self) -> Option<Identity> {
        self.identities.current_identity()
    }

    /// Resolves the role of `identity`.
    ///
    /// Missing profiles and unrecognized role strings resolve to `Member`.
    pub fn role_of(&self, identity: Identity) -> Result<Role, AccessError> {
        let stored = SqliteProfileRepository::new(self.conn).find_role(identity.user_id)?;
        let role = match stored.as_deref() {
            None => Role::Member,
            Some(value) => Role::parse(value).unwrap_or_else(|| {
                warn!(
                    "event=role_resolve module=access status=error error_code=unknown_role user_id={}",
                    identity.user_id
                );
                Role::Member
            }),
        };
        Ok(role)
    }

    /// Requires any signed-in identity and resolves its role.
    pub fn require_authenticated(&self) -> Result<AuthorizedIdentity, AccessError> {
        let identity = self
            .current_identity()
            .ok_or(AccessError::Unauthenticated)?;
        let role = self.role_of(identity)?;
        Ok(AuthorizedIdentity { identity, role })
    }

    /// Requires a signed-in admin identity.
    pub fn require_admin(&self) -> Result<Identity, AccessError> {
        let authorized = self.require_authenticated()?;
        if !authorized.is_admin() {
            warn!(
                "event=access_check module=access status=denied user_id={}",
                authorized.identity.user_id
            );
            return Err(AccessError::Forbidden {
                user_id: authorized.identity.user_id,
            });
        }
        Ok(authorized.identity)
    }
}
