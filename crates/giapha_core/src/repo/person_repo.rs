//! Person repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `persons` and `person_details_private`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Person::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Private details are keyed by `person_id`; upserts never create a second
//!   row for the same person.

use crate::db::DbError;
use crate::model::person::{Gender, Person, PersonId, PersonValidationError};
use crate::model::private_details::PersonPrivateDetails;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub(crate) const PERSON_SELECT_SQL: &str = "SELECT
    id,
    full_name,
    gender,
    birth_year,
    birth_month,
    birth_day,
    death_year,
    death_month,
    death_day,
    is_deceased,
    is_in_law,
    avatar_url,
    note
FROM persons";

pub(crate) const PERSON_INSERT_SQL: &str = "INSERT INTO persons (
    id,
    full_name,
    gender,
    birth_year,
    birth_month,
    birth_day,
    death_year,
    death_month,
    death_day,
    is_deceased,
    is_in_law,
    avatar_url,
    note
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for register persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(PersonValidationError),
    Db(DbError),
    NotFound(Uuid),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<PersonValidationError> for RepoError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for person records and their private details.
pub trait PersonRepository {
    fn create_person(&self, person: &Person) -> RepoResult<PersonId>;
    fn update_person(&self, person: &Person) -> RepoResult<()>;
    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>>;
    /// Lists persons ordered by `full_name ASC, id ASC`.
    fn list_persons(&self) -> RepoResult<Vec<Person>>;
    fn delete_person(&self, id: PersonId) -> RepoResult<()>;
    fn get_private_details(&self, id: PersonId) -> RepoResult<Option<PersonPrivateDetails>>;
    fn upsert_private_details(&self, details: &PersonPrivateDetails) -> RepoResult<()>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn create_person(&self, person: &Person) -> RepoResult<PersonId> {
        insert_person_row(self.conn, person)?;
        Ok(person.id)
    }

    fn update_person(&self, person: &Person) -> RepoResult<()> {
        person.validate()?;

        let changed = self.conn.execute(
            "UPDATE persons
             SET
                full_name = ?1,
                gender = ?2,
                birth_year = ?3,
                birth_month = ?4,
                birth_day = ?5,
                death_year = ?6,
                death_month = ?7,
                death_day = ?8,
                is_deceased = ?9,
                is_in_law = ?10,
                avatar_url = ?11,
                note = ?12,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?13;",
            params![
                person.full_name.as_str(),
                person.gender.as_str(),
                person.birth_year,
                person.birth_month,
                person.birth_day,
                person.death_year,
                person.death_month,
                person.death_day,
                bool_to_int(person.is_deceased),
                bool_to_int(person.is_in_law),
                person.avatar_url.as_deref(),
                person.note.as_deref(),
                person.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(person.id));
        }
        Ok(())
    }

    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(row)?));
        }
        Ok(None)
    }

    fn list_persons(&self) -> RepoResult<Vec<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} ORDER BY full_name ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut persons = Vec::new();
        while let Some(row) = rows.next()? {
            persons.push(parse_person_row(row)?);
        }
        Ok(persons)
    }

    fn delete_person(&self, id: PersonId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM persons WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn get_private_details(&self, id: PersonId) -> RepoResult<Option<PersonPrivateDetails>> {
        let details = self
            .conn
            .query_row(
                "SELECT phone_number, occupation, current_residence
                 FROM person_details_private
                 WHERE person_id = ?1;",
                [id.to_string()],
                |row| {
                    Ok(PersonPrivateDetails {
                        person_id: id,
                        phone_number: row.get(0)?,
                        occupation: row.get(1)?,
                        current_residence: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(details)
    }

    fn upsert_private_details(&self, details: &PersonPrivateDetails) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO person_details_private (
                person_id,
                phone_number,
                occupation,
                current_residence
            ) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(person_id) DO UPDATE SET
                phone_number = excluded.phone_number,
                occupation = excluded.occupation,
                current_residence = excluded.current_residence,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                details.person_id.to_string(),
                details.phone_number.as_deref(),
                details.occupation.as_deref(),
                details.current_residence.as_deref(),
            ],
        )?;
        Ok(())
    }
}

/// Validates and inserts one person row.
pub(crate) fn insert_person_row(conn: &Connection, person: &Person) -> RepoResult<()> {
    person.validate()?;

    let mut stmt = conn.prepare_cached(PERSON_INSERT_SQL)?;
    stmt.execute(params![
        person.id.to_string(),
        person.full_name.as_str(),
        person.gender.as_str(),
        person.birth_year,
        person.birth_month,
        person.birth_day,
        person.death_year,
        person.death_month,
        person.death_day,
        bool_to_int(person.is_deceased),
        bool_to_int(person.is_in_law),
        person.avatar_url.as_deref(),
        person.note.as_deref(),
    ])?;
    Ok(())
}

pub(crate) fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "persons.id")?;

    let gender_text: String = row.get("gender")?;
    let gender = Gender::parse(&gender_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid gender `{gender_text}` in persons.gender"))
    })?;

    let person = Person {
        id,
        full_name: row.get("full_name")?,
        gender,
        birth_year: row.get("birth_year")?,
        birth_month: row.get("birth_month")?,
        birth_day: row.get("birth_day")?,
        death_year: row.get("death_year")?,
        death_month: row.get("death_month")?,
        death_day: row.get("death_day")?,
        is_deceased: int_to_bool(row.get("is_deceased")?, "persons.is_deceased")?,
        is_in_law: int_to_bool(row.get("is_in_law")?, "persons.is_in_law")?,
        avatar_url: row.get("avatar_url")?,
        note: row.get("note")?,
    };
    person.validate()?;
    Ok(person)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
