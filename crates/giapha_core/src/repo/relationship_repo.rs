//! Relationship repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Both ends must reference existing persons (enforced by foreign keys).
//! - Listing order is deterministic: `created_at ASC, rowid ASC`.

use crate::model::person::PersonId;
use crate::model::relationship::{Relationship, RelationshipId, RelationshipKind};
use crate::repo::person_repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

pub(crate) const RELATIONSHIP_SELECT_SQL: &str = "SELECT
    id,
    type,
    person_a,
    person_b,
    note
FROM relationships";

/// Repository interface for relationship edges.
pub trait RelationshipRepository {
    fn create_relationship(&self, relationship: &Relationship) -> RepoResult<RelationshipId>;
    fn get_relationship(&self, id: RelationshipId) -> RepoResult<Option<Relationship>>;
    /// Lists edges where the person is either end.
    fn list_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Relationship>>;
    fn delete_relationship(&self, id: RelationshipId) -> RepoResult<()>;
    fn person_exists(&self, person_id: PersonId) -> RepoResult<bool>;
}

/// SQLite-backed relationship repository.
pub struct SqliteRelationshipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationshipRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RelationshipRepository for SqliteRelationshipRepository<'_> {
    fn create_relationship(&self, relationship: &Relationship) -> RepoResult<RelationshipId> {
        insert_relationship_row(self.conn, relationship)?;
        Ok(relationship.id)
    }

    fn get_relationship(&self, id: RelationshipId) -> RepoResult<Option<Relationship>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RELATIONSHIP_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_relationship_row(row)?));
        }
        Ok(None)
    }

    fn list_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Relationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RELATIONSHIP_SELECT_SQL}
             WHERE person_a = ?1 OR person_b = ?1
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([person_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_relationship_row(row)?);
        }
        Ok(items)
    }

    fn delete_relationship(&self, id: RelationshipId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM relationships WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn person_exists(&self, person_id: PersonId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM persons WHERE id = ?1);",
            [person_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

pub(crate) fn insert_relationship_row(
    conn: &Connection,
    relationship: &Relationship,
) -> RepoResult<()> {
    if relationship.is_self_edge() {
        return Err(RepoError::InvalidData(format!(
            "relationship {} links person {} to itself",
            relationship.id, relationship.person_a
        )));
    }

    let mut stmt = conn.prepare_cached(
        "INSERT INTO relationships (id, type, person_a, person_b, note)
         VALUES (?1, ?2, ?3, ?4, ?5);",
    )?;
    stmt.execute(params![
        relationship.id.to_string(),
        relationship.kind.as_str(),
        relationship.person_a.to_string(),
        relationship.person_b.to_string(),
        relationship.note.as_deref(),
    ])?;
    Ok(())
}

pub(crate) fn parse_relationship_row(row: &Row<'_>) -> RepoResult<Relationship> {
    let id_text: String = row.get("id")?;
    let kind_text: String = row.get("type")?;
    let person_a_text: String = row.get("person_a")?;
    let person_b_text: String = row.get("person_b")?;

    let kind = RelationshipKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid relationship type `{kind_text}` in relationships.type"
        ))
    })?;

    Ok(Relationship {
        id: parse_uuid(&id_text, "relationships.id")?,
        kind,
        person_a: parse_uuid(&person_a_text, "relationships.person_a")?,
        person_b: parse_uuid(&person_b_text, "relationships.person_b")?,
        note: row.get("note")?,
    })
}
