//! Admin-only contact details attached to one person.

use crate::model::person::PersonId;
use serde::{Deserialize, Serialize};

/// Private fields stored in `person_details_private`, keyed by `person_id`.
///
/// Only admin identities may read or write these values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonPrivateDetails {
    pub person_id: PersonId,
    pub phone_number: Option<String>,
    pub occupation: Option<String>,
    pub current_residence: Option<String>,
}

impl PersonPrivateDetails {
    /// Builds details from raw form input; blank values become `None`.
    pub fn from_input(
        person_id: PersonId,
        phone_number: &str,
        occupation: &str,
        current_residence: &str,
    ) -> Self {
        Self {
            person_id,
            phone_number: non_blank(phone_number),
            occupation: non_blank(occupation),
            current_residence: non_blank(current_residence),
        }
    }
}

pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::PersonPrivateDetails;
    use uuid::Uuid;

    #[test]
    fn blank_input_becomes_none() {
        let details = PersonPrivateDetails::from_input(Uuid::new_v4(), "  ", "Kỹ sư", "");
        assert_eq!(details.phone_number, None);
        assert_eq!(details.occupation.as_deref(), Some("Kỹ sư"));
        assert_eq!(details.current_residence, None);
    }
}
