//! Relationship edge between two persons.
//!
//! # Invariants
//! - `person_a != person_b`.
//! - For `*_child` kinds `person_a` is the parent and `person_b` the child;
//!   for `marriage` both are spouses.

use crate::model::person::PersonId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one relationship edge.
pub type RelationshipId = Uuid;

/// Typed kind of a relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Marriage,
    BiologicalChild,
    AdoptedChild,
}

impl RelationshipKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Marriage => "marriage",
            Self::BiologicalChild => "biological_child",
            Self::AdoptedChild => "adopted_child",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "marriage" => Some(Self::Marriage),
            "biological_child" => Some(Self::BiologicalChild),
            "adopted_child" => Some(Self::AdoptedChild),
            _ => None,
        }
    }
}

/// Relationship record, serialized with `type` to match the table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    pub person_a: PersonId,
    pub person_b: PersonId,
    #[serde(default)]
    pub note: Option<String>,
}

impl Relationship {
    /// Creates an edge with a generated id.
    pub fn new(kind: RelationshipKind, person_a: PersonId, person_b: PersonId) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            person_a,
            person_b,
            note: None,
        }
    }

    /// Returns whether both ends point to the same person.
    pub fn is_self_edge(&self) -> bool {
        self.person_a == self.person_b
    }
}
