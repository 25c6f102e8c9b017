//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Apply access checks before any store access.
//! - Keep hosting layers (CLI, web handlers) decoupled from storage details.

pub mod backup_service;
pub mod member_editor;
pub mod person_directory;
pub mod relationship_service;
