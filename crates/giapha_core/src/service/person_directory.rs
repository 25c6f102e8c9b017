//! Role-aware member reads.
//!
//! # Invariants
//! - Any signed-in identity can read public person data.
//! - Private details are attached only for admin identities.
//! - Deleting a member is admin-only and cascades its private row.

use crate::access::{AccessError, AccessGate, IdentityProvider};
use crate::model::person::{Person, PersonId};
use crate::model::private_details::PersonPrivateDetails;
use crate::repo::person_repo::{PersonRepository, RepoError, SqlitePersonRepository};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One member as seen by the acting identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberView {
    pub person: Person,
    /// `None` for non-admins, or when no private row exists.
    pub private: Option<PersonPrivateDetails>,
}

#[derive(Debug)]
pub enum DirectoryError {
    Access(AccessError),
    /// Relationships still point at the member.
    StillReferenced(PersonId),
    Repo(RepoError),
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access(err) => write!(f, "{err}"),
            Self::StillReferenced(id) => write!(
                f,
                "member {id} still has relationships; remove them before deleting"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Access(err) => Some(err),
            Self::StillReferenced(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<AccessError> for DirectoryError {
    fn from(value: AccessError) -> Self {
        Self::Access(value)
    }
}

impl From<RepoError> for DirectoryError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Read facade over persons for signed-in users.
pub struct PersonDirectory<'a> {
    gate: AccessGate<'a>,
    repo: SqlitePersonRepository<'a>,
}

impl<'a> PersonDirectory<'a> {
    pub fn new(conn: &'a Connection, identities: &'a dyn IdentityProvider) -> Self {
        Self {
            gate: AccessGate::new(conn, identities),
            repo: SqlitePersonRepository::new(conn),
        }
    }

    /// Loads one member; private details only for admins.
    pub fn get_member(&self, id: PersonId) -> Result<Option<MemberView>, DirectoryError> {
        let actor = self.gate.require_authenticated()?;
        let Some(person) = self.repo.get_person(id)? else {
            return Ok(None);
        };
        let private = if actor.is_admin() {
            self.repo.get_private_details(id)?
        } else {
            None
        };
        Ok(Some(MemberView { person, private }))
    }

    /// Lists public records ordered by name.
    pub fn list_members(&self) -> Result<Vec<Person>, DirectoryError> {
        self.gate.require_authenticated()?;
        Ok(self.repo.list_persons()?)
    }

    /// Deletes one member. Fails with `StillReferenced` while relationships
    /// point at it.
    pub fn delete_member(&self, id: PersonId) -> Result<(), DirectoryError> {
        let admin = self.gate.require_admin()?;
        self.repo.delete_person(id).map_err(|err| match err {
            RepoError::Db(db) if db.is_constraint_violation() => {
                DirectoryError::StillReferenced(id)
            }
            other => DirectoryError::Repo(other),
        })?;
        info!(
            "event=member_delete module=directory status=ok person_id={} user_id={}",
            id, admin.user_id
        );
        Ok(())
    }
}
