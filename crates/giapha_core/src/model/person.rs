//! Person domain model.
//!
//! # Responsibility
//! - Define the public person record shared by the editor, directory and
//!   backup snapshot.
//! - Enforce date and lifecycle invariants before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another person.
//! - Death date parts are absent unless `is_deceased` is true.
//! - `death_year >= birth_year` when both are present.

use crate::model::date::validate_date_parts;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one person record.
pub type PersonId = Uuid;

/// Recorded gender of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Stable string used in storage and snapshots.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }

    /// Parses the stable storage string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Public person record.
///
/// Field names match the `persons` table columns and the snapshot JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub full_name: String,
    pub gender: Gender,
    pub birth_year: Option<i64>,
    pub birth_month: Option<i64>,
    pub birth_day: Option<i64>,
    pub death_year: Option<i64>,
    pub death_month: Option<i64>,
    pub death_day: Option<i64>,
    #[serde(default)]
    pub is_deceased: bool,
    /// Joined the family by marriage rather than birth.
    #[serde(default)]
    pub is_in_law: bool,
    pub avatar_url: Option<String>,
    pub note: Option<String>,
}

impl Person {
    /// Creates a living person with a generated id and no dates.
    pub fn new(full_name: impl Into<String>, gender: Gender) -> Self {
        Self::with_id(Uuid::new_v4(), full_name, gender)
    }

    /// Creates a person with a caller-provided id.
    ///
    /// Used by import paths where identity already exists in a snapshot.
    pub fn with_id(id: PersonId, full_name: impl Into<String>, gender: Gender) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            gender,
            birth_year: None,
            birth_month: None,
            birth_day: None,
            death_year: None,
            death_month: None,
            death_day: None,
            is_deceased: false,
            is_in_law: false,
            avatar_url: None,
            note: None,
        }
    }

    /// Checks record invariants.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        if self.full_name.trim().is_empty() {
            return Err(PersonValidationError::BlankFullName);
        }
        if !validate_date_parts(self.birth_day, self.birth_month, self.birth_year) {
            return Err(PersonValidationError::InvalidBirthDate);
        }
        if !self.is_deceased {
            if self.has_death_date() {
                return Err(PersonValidationError::DeathDateOnLivingPerson);
            }
            return Ok(());
        }
        if !validate_date_parts(self.death_day, self.death_month, self.death_year) {
            return Err(PersonValidationError::InvalidDeathDate);
        }
        if let (Some(birth_year), Some(death_year)) = (self.birth_year, self.death_year) {
            if death_year < birth_year {
                return Err(PersonValidationError::DeathBeforeBirth {
                    birth_year,
                    death_year,
                });
            }
        }
        Ok(())
    }

    /// Returns whether any death date part is set.
    pub fn has_death_date(&self) -> bool {
        self.death_day.is_some() || self.death_month.is_some() || self.death_year.is_some()
    }
}

/// Invariant violations of a [`Person`] record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonValidationError {
    BlankFullName,
    InvalidBirthDate,
    InvalidDeathDate,
    DeathDateOnLivingPerson,
    DeathBeforeBirth { birth_year: i64, death_year: i64 },
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankFullName => write!(f, "full name must not be blank"),
            Self::InvalidBirthDate => write!(f, "birth date is invalid"),
            Self::InvalidDeathDate => write!(f, "death date is invalid"),
            Self::DeathDateOnLivingPerson => {
                write!(f, "death date must be empty when person is not deceased")
            }
            Self::DeathBeforeBirth {
                birth_year,
                death_year,
            } => write!(
                f,
                "death year {death_year} must not be earlier than birth year {birth_year}"
            ),
        }
    }
}

impl Error for PersonValidationError {}
