//! Family-register domain model.
//!
//! # Responsibility
//! - Define person, relationship and private-detail records.
//! - Define the backup snapshot format shared by export and import.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Field names match the storage columns so snapshots round-trip through
//!   the store without renaming.

pub mod date;
pub mod person;
pub mod private_details;
pub mod relationship;
pub mod snapshot;
