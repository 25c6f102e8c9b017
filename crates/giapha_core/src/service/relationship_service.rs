//! Relationship use-case service.
//!
//! # Invariants
//! - Edges never link a person to itself.
//! - Both ends must exist before an edge is created.

use crate::access::{AccessError, AccessGate, IdentityProvider};
use crate::model::person::PersonId;
use crate::model::relationship::{Relationship, RelationshipId, RelationshipKind};
use crate::model::private_details::non_blank;
use crate::repo::person_repo::RepoError;
use crate::repo::relationship_repo::{RelationshipRepository, SqliteRelationshipRepository};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from relationship service operations.
#[derive(Debug)]
pub enum RelationshipServiceError {
    Access(AccessError),
    /// Both ends are the same person.
    SelfRelationship(PersonId),
    /// One end does not exist.
    PersonNotFound(PersonId),
    /// Target relationship does not exist.
    NotFound(RelationshipId),
    Repo(RepoError),
}

impl Display for RelationshipServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access(err) => write!(f, "{err}"),
            Self::SelfRelationship(id) => {
                write!(f, "a person cannot be related to itself: {id}")
            }
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::NotFound(id) => write!(f, "relationship not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RelationshipServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Access(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AccessError> for RelationshipServiceError {
    fn from(value: AccessError) -> Self {
        Self::Access(value)
    }
}

impl From<RepoError> for RelationshipServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Relationship facade for signed-in users.
pub struct RelationshipService<'a> {
    gate: AccessGate<'a>,
    repo: SqliteRelationshipRepository<'a>,
}

impl<'a> RelationshipService<'a> {
    pub fn new(conn: &'a Connection, identities: &'a dyn IdentityProvider) -> Self {
        Self {
            gate: AccessGate::new(conn, identities),
            repo: SqliteRelationshipRepository::new(conn),
        }
    }

    /// Creates one edge.
    ///
    /// For child kinds `person_a` is the parent and `person_b` the child.
    pub fn create(
        &self,
        kind: RelationshipKind,
        person_a: PersonId,
        person_b: PersonId,
        note: Option<&str>,
    ) -> Result<Relationship, RelationshipServiceError> {
        self.gate.require_authenticated()?;
        if person_a == person_b {
            return Err(RelationshipServiceError::SelfRelationship(person_a));
        }
        for person_id in [person_a, person_b] {
            if !self.repo.person_exists(person_id)? {
                return Err(RelationshipServiceError::PersonNotFound(person_id));
            }
        }

        let mut relationship = Relationship::new(kind, person_a, person_b);
        relationship.note = note.and_then(non_blank);
        self.repo.create_relationship(&relationship)?;
        Ok(relationship)
    }

    pub fn list_for_person(
        &self,
        person_id: PersonId,
    ) -> Result<Vec<Relationship>, RelationshipServiceError> {
        self.gate.require_authenticated()?;
        Ok(self.repo.list_for_person(person_id)?)
    }

    pub fn delete(&self, id: RelationshipId) -> Result<(), RelationshipServiceError> {
        self.gate.require_authenticated()?;
        self.repo.delete_relationship(id)?;
        Ok(())
    }
}
