//! Profile (user role) repository.
//!
//! The `profiles` table maps an authenticated user id to its role string.
//! Role interpretation lives in [`crate::access`]; this layer only stores it.

use crate::access::Role;
use crate::repo::person_repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Repository interface for user profiles.
pub trait ProfileRepository {
    /// Returns the raw stored role string, if the profile exists.
    fn find_role(&self, user_id: Uuid) -> RepoResult<Option<String>>;
    /// Creates or updates one profile with the given role.
    fn set_role(&self, user_id: Uuid, role: Role) -> RepoResult<()>;
}

/// SQLite-backed profile repository.
pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProfileRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn find_role(&self, user_id: Uuid) -> RepoResult<Option<String>> {
        let role = self
            .conn
            .query_row(
                "SELECT role FROM profiles WHERE id = ?1;",
                [user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(role)
    }

    fn set_role(&self, user_id: Uuid, role: Role) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO profiles (id, role) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET role = excluded.role;",
            params![user_id.to_string(), role.as_str()],
        )?;
        Ok(())
    }
}
