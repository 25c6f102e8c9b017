//! Backup export and restore use-cases.
//!
//! # Responsibility
//! - Gate export/import on the admin role before touching the store.
//! - Export: read all persons, then all relationships, stamp completion time.
//! - Import: delete relationships, delete persons, insert persons in chunks,
//!   insert relationships in chunks, then invalidate dataset views.
//!
//! # Invariants
//! - Steps run strictly in that order; batches run sequentially in input
//!   order and batch `k` holds records `[size*k, size*(k+1))`.
//! - Any failure aborts immediately with a phase-tagged error.
//! - `ImportMode::NonAtomic` performs no compensation: a failure after the
//!   deletes leaves a partially imported store. `ImportMode::Atomic` wraps
//!   steps 1-4 in one transaction instead.
//! - Views are invalidated only after a fully successful import.

use crate::access::{AccessError, AccessGate, IdentityProvider};
use crate::model::snapshot::{
    parse_snapshot_json, BackupSnapshot, ImportPayload, SnapshotValidationError,
};
use crate::repo::backup_store::{BackupStore, SqliteBackupStore};
use crate::repo::person_repo::RepoError;
use crate::views::{invalidate_dataset_views, ViewInvalidator};
use chrono::{SecondsFormat, Utc};
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Reference batch size for restore inserts.
pub const DEFAULT_IMPORT_CHUNK_SIZE: usize = 500;

/// Store phase in which a backup operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPhase {
    ReadPersons,
    ReadRelationships,
    DeleteRelationships,
    DeletePersons,
    InsertPersons,
    InsertRelationships,
    /// Begin/commit of the atomic restore transaction.
    Transaction,
}

impl BackupPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadPersons => "read_persons",
            Self::ReadRelationships => "read_relationships",
            Self::DeleteRelationships => "delete_relationships",
            Self::DeletePersons => "delete_persons",
            Self::InsertPersons => "insert_persons",
            Self::InsertRelationships => "insert_relationships",
            Self::Transaction => "transaction",
        }
    }
}

/// Errors from backup export and restore.
#[derive(Debug)]
pub enum BackupError {
    Unauthenticated,
    Forbidden,
    /// Role lookup failed before the operation started.
    Access(AccessError),
    InvalidPayload(SnapshotValidationError),
    /// Restore options are unusable (e.g. a zero chunk size).
    InvalidOptions(String),
    StoreRead { phase: BackupPhase, message: String },
    StoreWrite { phase: BackupPhase, message: String },
}

impl BackupError {
    /// Returns the failed store phase, if the error came from the store.
    pub fn phase(&self) -> Option<BackupPhase> {
        match self {
            Self::StoreRead { phase, .. } | Self::StoreWrite { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    fn read(phase: BackupPhase, err: RepoError) -> Self {
        Self::StoreRead {
            phase,
            message: err.to_string(),
        }
    }

    fn write(phase: BackupPhase, err: impl Display) -> Self {
        Self::StoreWrite {
            phase,
            message: err.to_string(),
        }
    }
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "sign-in required"),
            Self::Forbidden => write!(f, "access denied: only admins can back up or restore data"),
            Self::Access(err) => write!(f, "{err}"),
            Self::InvalidPayload(err) => write!(f, "invalid backup payload: {err}"),
            Self::InvalidOptions(message) => write!(f, "invalid restore options: {message}"),
            Self::StoreRead { phase, message } => {
                write!(f, "failed to read data ({}): {message}", phase.as_str())
            }
            Self::StoreWrite { phase, message } => {
                write!(f, "failed to write data ({}): {message}", phase.as_str())
            }
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Access(err) => Some(err),
            Self::InvalidPayload(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AccessError> for BackupError {
    fn from(value: AccessError) -> Self {
        match value {
            AccessError::Unauthenticated => Self::Unauthenticated,
            AccessError::Forbidden { .. } => Self::Forbidden,
            other => Self::Access(other),
        }
    }
}

impl From<SnapshotValidationError> for BackupError {
    fn from(value: SnapshotValidationError) -> Self {
        Self::InvalidPayload(value)
    }
}

/// Restore transaction strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Reference behavior: no transaction, failures leave partial state.
    #[default]
    NonAtomic,
    /// Steps 1-4 run in one transaction and roll back on any failure.
    Atomic,
}

/// Restore tuning options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub chunk_size: usize,
    pub mode: ImportMode,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_IMPORT_CHUNK_SIZE,
            mode: ImportMode::NonAtomic,
        }
    }
}

/// Outcome of a successful restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub success: bool,
    pub persons_imported: usize,
    pub relationships_imported: usize,
    pub person_batches: usize,
    pub relationship_batches: usize,
}

/// Exports the full dataset after an admin check.
pub fn export_snapshot_with<S: BackupStore>(
    gate: &AccessGate<'_>,
    store: &S,
) -> Result<BackupSnapshot, BackupError> {
    gate.require_admin()?;
    read_snapshot(store)
}

/// Restores `payload` into `store` after an admin check, then invalidates
/// dataset views.
pub fn import_snapshot_with<S: BackupStore>(
    gate: &AccessGate<'_>,
    store: &S,
    invalidator: &dyn ViewInvalidator,
    payload: &ImportPayload,
    chunk_size: usize,
) -> Result<ImportReport, BackupError> {
    gate.require_admin()?;
    restore_and_invalidate(store, invalidator, payload, chunk_size)
}

/// Restore body shared by every entry point; the caller has passed the
/// admin check.
fn restore_and_invalidate<S: BackupStore>(
    store: &S,
    invalidator: &dyn ViewInvalidator,
    payload: &ImportPayload,
    chunk_size: usize,
) -> Result<ImportReport, BackupError> {
    ensure_chunk_size(chunk_size)?;
    let report = replace_dataset(store, payload, chunk_size)?;
    invalidate_dataset_views(invalidator);
    Ok(report)
}

fn ensure_chunk_size(chunk_size: usize) -> Result<(), BackupError> {
    if chunk_size == 0 {
        return Err(BackupError::InvalidOptions(
            "import chunk size must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn read_snapshot<S: BackupStore>(store: &S) -> Result<BackupSnapshot, BackupError> {
    let started_at = Instant::now();
    info!("event=backup_export module=backup status=start");

    let result = store
        .select_all_persons()
        .map_err(|err| BackupError::read(BackupPhase::ReadPersons, err))
        .and_then(|persons| {
            let relationships = store
                .select_all_relationships()
                .map_err(|err| BackupError::read(BackupPhase::ReadRelationships, err))?;
            Ok(BackupSnapshot {
                persons,
                relationships,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            })
        });

    match &result {
        Ok(snapshot) => info!(
            "event=backup_export module=backup status=ok persons={} relationships={} duration_ms={}",
            snapshot.persons.len(),
            snapshot.relationships.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => log_failure("backup_export", err, started_at),
    }
    result
}

fn replace_dataset<S: BackupStore>(
    store: &S,
    payload: &ImportPayload,
    chunk_size: usize,
) -> Result<ImportReport, BackupError> {
    let started_at = Instant::now();
    info!(
        "event=backup_import module=backup status=start persons={} relationships={} chunk_size={}",
        payload.persons.len(),
        payload.relationships.len(),
        chunk_size
    );

    let result = run_replace_steps(store, payload, chunk_size);
    match &result {
        Ok(report) => info!(
            "event=backup_import module=backup status=ok persons={} relationships={} person_batches={} relationship_batches={} duration_ms={}",
            report.persons_imported,
            report.relationships_imported,
            report.person_batches,
            report.relationship_batches,
            started_at.elapsed().as_millis()
        ),
        Err(err) => log_failure("backup_import", err, started_at),
    }
    result
}

fn run_replace_steps<S: BackupStore>(
    store: &S,
    payload: &ImportPayload,
    chunk_size: usize,
) -> Result<ImportReport, BackupError> {
    // Relationships reference persons, so they go first.
    store
        .delete_all_relationships()
        .map_err(|err| BackupError::write(BackupPhase::DeleteRelationships, err))?;
    store
        .delete_all_persons()
        .map_err(|err| BackupError::write(BackupPhase::DeletePersons, err))?;

    let mut person_batches = 0;
    for batch in payload.persons.chunks(chunk_size) {
        store
            .insert_persons(batch)
            .map_err(|err| BackupError::write(BackupPhase::InsertPersons, err))?;
        person_batches += 1;
    }

    let mut relationship_batches = 0;
    for batch in payload.relationships.chunks(chunk_size) {
        store
            .insert_relationships(batch)
            .map_err(|err| BackupError::write(BackupPhase::InsertRelationships, err))?;
        relationship_batches += 1;
    }

    Ok(ImportReport {
        success: true,
        persons_imported: payload.persons.len(),
        relationships_imported: payload.relationships.len(),
        person_batches,
        relationship_batches,
    })
}

fn log_failure(event: &str, err: &BackupError, started_at: Instant) {
    error!(
        "event={event} module=backup status=error phase={} duration_ms={} error={}",
        err.phase().map_or("none", BackupPhase::as_str),
        started_at.elapsed().as_millis(),
        err
    );
}

/// SQLite-backed backup facade with explicit session and view dependencies.
pub struct BackupService<'a> {
    conn: &'a Connection,
    gate: AccessGate<'a>,
    invalidator: &'a dyn ViewInvalidator,
    options: ImportOptions,
}

impl<'a> BackupService<'a> {
    pub fn new(
        conn: &'a Connection,
        identities: &'a dyn IdentityProvider,
        invalidator: &'a dyn ViewInvalidator,
    ) -> Self {
        Self {
            conn,
            gate: AccessGate::new(conn, identities),
            invalidator,
            options: ImportOptions::default(),
        }
    }

    /// Overrides restore options.
    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Exports every person and relationship.
    pub fn export_snapshot(&self) -> Result<BackupSnapshot, BackupError> {
        export_snapshot_with(&self.gate, &SqliteBackupStore::new(self.conn))
    }

    /// Parses snapshot JSON and restores it.
    ///
    /// The admin check runs before the payload is inspected.
    pub fn import_snapshot_json(&self, text: &str) -> Result<ImportReport, BackupError> {
        self.gate.require_admin()?;
        let payload = parse_snapshot_json(text)?;
        self.import_authorized(&payload)
    }

    /// Replaces the whole dataset with `payload`.
    pub fn import_snapshot(&self, payload: &ImportPayload) -> Result<ImportReport, BackupError> {
        self.gate.require_admin()?;
        self.import_authorized(payload)
    }

    fn import_authorized(&self, payload: &ImportPayload) -> Result<ImportReport, BackupError> {
        match self.options.mode {
            ImportMode::NonAtomic => restore_and_invalidate(
                &SqliteBackupStore::new(self.conn),
                self.invalidator,
                payload,
                self.options.chunk_size,
            ),
            ImportMode::Atomic => self.import_atomic(payload),
        }
    }

    fn import_atomic(&self, payload: &ImportPayload) -> Result<ImportReport, BackupError> {
        ensure_chunk_size(self.options.chunk_size)?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|err| BackupError::write(BackupPhase::Transaction, err))?;
        // Dropping `tx` on any error below rolls every step back.
        let report = replace_dataset(&SqliteBackupStore::new(&tx), payload, self.options.chunk_size)?;
        tx.commit()
            .map_err(|err| BackupError::write(BackupPhase::Transaction, err))?;

        invalidate_dataset_views(self.invalidator);
        Ok(report)
    }
}
