//! Backup snapshot file format and structural validation.
//!
//! # Responsibility
//! - Define the JSON shape `{ persons, relationships, timestamp }`.
//! - Turn untrusted JSON into a typed payload or an enumerated error.
//!
//! # Invariants
//! - `persons` and `relationships` must be present, non-null arrays.
//! - `timestamp` is informational; it is optional on import but must be a
//!   string when present.

use crate::model::person::Person;
use crate::model::relationship::Relationship;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

const FIELD_PERSONS: &str = "persons";
const FIELD_RELATIONSHIPS: &str = "relationships";
const FIELD_TIMESTAMP: &str = "timestamp";

/// Full dataset export, stamped at completion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub persons: Vec<Person>,
    pub relationships: Vec<Relationship>,
    /// RFC 3339 UTC timestamp, e.g. `2026-10-18T09:30:00.000Z`.
    pub timestamp: String,
}

impl BackupSnapshot {
    /// Serializes the snapshot as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Converts an exported snapshot into an import payload.
    pub fn into_payload(self) -> ImportPayload {
        ImportPayload {
            persons: self.persons,
            relationships: self.relationships,
            timestamp: Some(self.timestamp),
        }
    }
}

/// Validated input of one restore run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPayload {
    pub persons: Vec<Person>,
    pub relationships: Vec<Relationship>,
    pub timestamp: Option<String>,
}

impl ImportPayload {
    pub fn new(persons: Vec<Person>, relationships: Vec<Relationship>) -> Self {
        Self {
            persons,
            relationships,
            timestamp: None,
        }
    }
}

/// Structural errors of an incoming snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotValidationError {
    /// Input is not valid JSON or a record does not match its schema.
    Malformed(String),
    /// Top-level JSON value is not an object.
    NotAnObject,
    /// Required field is absent or null.
    MissingField(&'static str),
    /// Field is present with an unexpected JSON type.
    WrongFieldType(&'static str),
}

impl Display for SnapshotValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "snapshot is malformed: {message}"),
            Self::NotAnObject => write!(f, "snapshot must be a JSON object"),
            Self::MissingField(field) => write!(f, "snapshot field `{field}` is missing"),
            Self::WrongFieldType(field) => {
                write!(f, "snapshot field `{field}` has an unexpected type")
            }
        }
    }
}

impl Error for SnapshotValidationError {}

/// Parses snapshot JSON text into a typed payload.
pub fn parse_snapshot_json(text: &str) -> Result<ImportPayload, SnapshotValidationError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| SnapshotValidationError::Malformed(err.to_string()))?;
    parse_snapshot_value(value)
}

/// Validates an already-decoded JSON value into a typed payload.
pub fn parse_snapshot_value(value: Value) -> Result<ImportPayload, SnapshotValidationError> {
    let Value::Object(mut object) = value else {
        return Err(SnapshotValidationError::NotAnObject);
    };

    let persons_value = take_array(&mut object, FIELD_PERSONS)?;
    let relationships_value = take_array(&mut object, FIELD_RELATIONSHIPS)?;
    let timestamp = match object.remove(FIELD_TIMESTAMP) {
        None | Some(Value::Null) => None,
        Some(Value::String(value)) => Some(value),
        Some(_) => return Err(SnapshotValidationError::WrongFieldType(FIELD_TIMESTAMP)),
    };

    let persons: Vec<Person> = serde_json::from_value(persons_value).map_err(|err| {
        SnapshotValidationError::Malformed(format!("{FIELD_PERSONS}: {err}"))
    })?;
    let relationships: Vec<Relationship> =
        serde_json::from_value(relationships_value).map_err(|err| {
            SnapshotValidationError::Malformed(format!("{FIELD_RELATIONSHIPS}: {err}"))
        })?;

    Ok(ImportPayload {
        persons,
        relationships,
        timestamp,
    })
}

fn take_array(
    object: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Value, SnapshotValidationError> {
    match object.remove(field) {
        None | Some(Value::Null) => Err(SnapshotValidationError::MissingField(field)),
        Some(value @ Value::Array(_)) => Ok(value),
        Some(_) => Err(SnapshotValidationError::WrongFieldType(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_snapshot_json, SnapshotValidationError};

    #[test]
    fn accepts_empty_snapshot_without_timestamp() {
        let payload = parse_snapshot_json(r#"{"persons": [], "relationships": []}"#).unwrap();
        assert!(payload.persons.is_empty());
        assert!(payload.relationships.is_empty());
        assert_eq!(payload.timestamp, None);
    }

    #[test]
    fn rejects_missing_or_null_sequences() {
        assert_eq!(
            parse_snapshot_json(r#"{"relationships": []}"#).unwrap_err(),
            SnapshotValidationError::MissingField("persons")
        );
        assert_eq!(
            parse_snapshot_json(r#"{"persons": [], "relationships": null}"#).unwrap_err(),
            SnapshotValidationError::MissingField("relationships")
        );
    }

    #[test]
    fn rejects_wrong_shapes() {
        assert_eq!(
            parse_snapshot_json("[]").unwrap_err(),
            SnapshotValidationError::NotAnObject
        );
        assert_eq!(
            parse_snapshot_json(r#"{"persons": {}, "relationships": []}"#).unwrap_err(),
            SnapshotValidationError::WrongFieldType("persons")
        );
        assert_eq!(
            parse_snapshot_json(r#"{"persons": [], "relationships": [], "timestamp": 5}"#)
                .unwrap_err(),
            SnapshotValidationError::WrongFieldType("timestamp")
        );
        assert!(matches!(
            parse_snapshot_json("{not json").unwrap_err(),
            SnapshotValidationError::Malformed(_)
        ));
    }

    #[test]
    fn rejects_records_that_do_not_match_schema() {
        let err = parse_snapshot_json(
            r#"{"persons": [{"id": "not-a-uuid", "full_name": "A", "gender": "male"}], "relationships": []}"#,
        )
        .unwrap_err();
        match err {
            SnapshotValidationError::Malformed(message) => assert!(message.starts_with("persons")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parses_person_rows_with_extra_columns() {
        let payload = parse_snapshot_json(
            r#"{
                "persons": [{
                    "id": "7f1c1a52-1f51-4a3e-9a43-2b8f3c4a1d10",
                    "full_name": "Nguyễn Văn An",
                    "gender": "male",
                    "birth_year": 1942,
                    "is_deceased": true,
                    "death_year": 2010,
                    "created_at": "2024-01-01T00:00:00Z"
                }],
                "relationships": [],
                "timestamp": "2026-10-18T00:00:00.000Z"
            }"#,
        )
        .unwrap();
        assert_eq!(payload.persons.len(), 1);
        assert_eq!(payload.persons[0].death_year, Some(2010));
        assert!(!payload.persons[0].is_in_law);
        assert_eq!(payload.timestamp.as_deref(), Some("2026-10-18T00:00:00.000Z"));
    }
}
