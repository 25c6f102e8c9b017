//! Core domain logic for the Giapha family register.
//! This crate is the single source of truth for business invariants.

pub mod access;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;
pub mod views;

pub use access::{
    AccessError, AccessGate, AuthorizedIdentity, Identity, IdentityProvider, Role, StaticIdentity,
};
pub use config::{load_config, ConfigError, GiaphaConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::date::validate_date_parts;
pub use model::person::{Gender, Person, PersonId, PersonValidationError};
pub use model::private_details::PersonPrivateDetails;
pub use model::relationship::{Relationship, RelationshipId, RelationshipKind};
pub use model::snapshot::{
    parse_snapshot_json, BackupSnapshot, ImportPayload, SnapshotValidationError,
};
pub use repo::backup_store::{BackupStore, SqliteBackupStore};
pub use repo::person_repo::{PersonRepository, RepoError, RepoResult, SqlitePersonRepository};
pub use repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
pub use repo::relationship_repo::{RelationshipRepository, SqliteRelationshipRepository};
pub use service::backup_service::{
    export_snapshot_with, import_snapshot_with, BackupError, BackupPhase, BackupService,
    ImportMode, ImportOptions, ImportReport, DEFAULT_IMPORT_CHUNK_SIZE,
};
pub use service::member_editor::{
    AvatarChange, AvatarUpload, MemberEditor, MemberEditorError, MemberForm, MemberFormError,
    MAX_AVATAR_BYTES,
};
pub use service::person_directory::{DirectoryError, MemberView, PersonDirectory};
pub use service::relationship_service::{RelationshipService, RelationshipServiceError};
pub use storage::{FsObjectStore, ObjectStore, ObjectStoreError, AVATAR_BUCKET};
pub use views::{LogViewInvalidator, ViewInvalidator, DATASET_VIEWS};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
