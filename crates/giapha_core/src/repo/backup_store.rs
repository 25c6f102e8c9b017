//! Bulk table operations used by backup export and restore.
//!
//! # Responsibility
//! - Read whole `persons` / `relationships` tables in insertion order.
//! - Delete whole tables and insert record batches.
//!
//! # Invariants
//! - Each inserted batch is all-or-nothing (one savepoint per batch), like a
//!   single bulk insert request; batches are independent of each other.
//! - Inserted persons pass `Person::validate()`.
//! - Delete-all uses a plain `DELETE FROM`; the schema has no triggers, so
//!   this matches row-by-row deletion.

use crate::model::person::Person;
use crate::model::relationship::Relationship;
use crate::repo::person_repo::{insert_person_row, parse_person_row, RepoResult, PERSON_SELECT_SQL};
use crate::repo::relationship_repo::{
    insert_relationship_row, parse_relationship_row, RELATIONSHIP_SELECT_SQL,
};
use log::warn;
use rusqlite::Connection;

const BATCH_SAVEPOINT: &str = "import_batch";

/// Table-level operations over the register dataset.
pub trait BackupStore {
    fn select_all_persons(&self) -> RepoResult<Vec<Person>>;
    fn select_all_relationships(&self) -> RepoResult<Vec<Relationship>>;
    /// Deletes every relationship row; returns the number deleted.
    fn delete_all_relationships(&self) -> RepoResult<usize>;
    /// Deletes every person row; returns the number deleted.
    fn delete_all_persons(&self) -> RepoResult<usize>;
    fn insert_persons(&self, batch: &[Person]) -> RepoResult<()>;
    fn insert_relationships(&self, batch: &[Relationship]) -> RepoResult<()>;
}

/// SQLite-backed bulk store.
///
/// Accepts any connection, including an open transaction (via deref), so the
/// same store runs both the non-atomic and the atomic restore.
pub struct SqliteBackupStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBackupStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn in_batch_savepoint(&self, insert: impl FnOnce() -> RepoResult<()>) -> RepoResult<()> {
        self.conn
            .execute_batch(&format!("SAVEPOINT {BATCH_SAVEPOINT};"))?;
        match insert() {
            Ok(()) => {
                self.conn
                    .execute_batch(&format!("RELEASE {BATCH_SAVEPOINT};"))?;
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = self.conn.execute_batch(&format!(
                    "ROLLBACK TO {BATCH_SAVEPOINT}; RELEASE {BATCH_SAVEPOINT};"
                )) {
                    warn!(
                        "event=batch_rollback module=repo status=error error={}",
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }
}

impl BackupStore for SqliteBackupStore<'_> {
    fn select_all_persons(&self) -> RepoResult<Vec<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut persons = Vec::new();
        while let Some(row) = rows.next()? {
            persons.push(parse_person_row(row)?);
        }
        Ok(persons)
    }

    fn select_all_relationships(&self) -> RepoResult<Vec<Relationship>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RELATIONSHIP_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut relationships = Vec::new();
        while let Some(row) = rows.next()? {
            relationships.push(parse_relationship_row(row)?);
        }
        Ok(relationships)
    }

    fn delete_all_relationships(&self) -> RepoResult<usize> {
        Ok(self.conn.execute("DELETE FROM relationships;", [])?)
    }

    fn delete_all_persons(&self) -> RepoResult<usize> {
        Ok(self.conn.execute("DELETE FROM persons;", [])?)
    }

    fn insert_persons(&self, batch: &[Person]) -> RepoResult<()> {
        self.in_batch_savepoint(|| {
            for person in batch {
                insert_person_row(self.conn, person)?;
            }
            Ok(())
        })
    }

    fn insert_relationships(&self, batch: &[Relationship]) -> RepoResult<()> {
        self.in_batch_savepoint(|| {
            for relationship in batch {
                insert_relationship_row(self.conn, relationship)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BackupStore, SqliteBackupStore};
    use crate::db::open_db_in_memory;
    use crate::model::person::{Gender, Person};
    use crate::model::relationship::{Relationship, RelationshipKind};

    #[test]
    fn failing_batch_leaves_no_partial_rows() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteBackupStore::new(&conn);

        let valid = Person::new("Hồ Văn Minh", Gender::Male);
        let invalid = Person::new(" ", Gender::Female);
        assert!(store.insert_persons(&[valid, invalid]).is_err());
        assert!(store.select_all_persons().unwrap().is_empty());
    }

    #[test]
    fn select_all_preserves_insertion_order() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteBackupStore::new(&conn);

        let persons = vec![
            Person::new("Zeta", Gender::Male),
            Person::new("Alpha", Gender::Female),
            Person::new("Mu", Gender::Other),
        ];
        store.insert_persons(&persons).unwrap();
        let edge = Relationship::new(RelationshipKind::Marriage, persons[0].id, persons[1].id);
        store.insert_relationships(std::slice::from_ref(&edge)).unwrap();

        assert_eq!(store.select_all_persons().unwrap(), persons);
        assert_eq!(store.select_all_relationships().unwrap(), vec![edge]);
        assert_eq!(store.delete_all_relationships().unwrap(), 1);
        assert_eq!(store.delete_all_persons().unwrap(), 3);
    }
}
