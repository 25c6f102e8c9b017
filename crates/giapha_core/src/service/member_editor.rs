//! Member create/edit use-case.
//!
//! # Responsibility
//! - Hold editable person state, including admin-only private fields.
//! - Validate dates before any write.
//! - Upload or remove avatars, then upsert the person and, for admins, the
//!   private details row.
//!
//! # Invariants
//! - Turning `is_deceased` off clears every death date part.
//! - Death dates are validated and persisted only while `is_deceased` is set.
//! - Private details are written only when the acting identity is admin.
//! - Avatar removal is best effort and never blocks a save.

use crate::access::{AccessError, AccessGate, IdentityProvider};
use crate::model::date::validate_date_parts;
use crate::model::person::{Gender, Person, PersonId};
use crate::model::private_details::{non_blank, PersonPrivateDetails};
use crate::repo::person_repo::{PersonRepository, RepoError, SqlitePersonRepository};
use crate::storage::{is_valid_object_path, ObjectStore, ObjectStoreError, AVATAR_BUCKET};
use chrono::Utc;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Largest accepted avatar upload.
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

const FALLBACK_AVATAR_EXTENSION: &str = "bin";
const AVATAR_RANDOM_PREFIX_LEN: usize = 13;

static AVATAR_EXTENSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{1,10}$").expect("valid avatar extension regex"));

/// Form-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberFormError {
    BlankFullName,
    InvalidBirthDate,
    InvalidDeathDate,
    DeathBeforeBirth,
}

impl Display for MemberFormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankFullName => write!(f, "full name is required"),
            Self::InvalidBirthDate => write!(f, "birth date is invalid, please check it again"),
            Self::InvalidDeathDate => write!(f, "death date is invalid, please check it again"),
            Self::DeathBeforeBirth => {
                write!(f, "death year must be greater than or equal to birth year")
            }
        }
    }
}

impl Error for MemberFormError {}

/// Editable state of one member record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberForm {
    /// Present when editing an existing person.
    pub person_id: Option<PersonId>,
    pub full_name: String,
    pub gender: Gender,
    pub birth_day: Option<i64>,
    pub birth_month: Option<i64>,
    pub birth_year: Option<i64>,
    pub death_day: Option<i64>,
    pub death_month: Option<i64>,
    pub death_year: Option<i64>,
    is_deceased: bool,
    pub is_in_law: bool,
    /// Current avatar URL; empty when none.
    pub avatar_url: String,
    initial_avatar_url: Option<String>,
    pub note: String,
    pub phone_number: String,
    pub occupation: String,
    pub current_residence: String,
}

impl Default for MemberForm {
    fn default() -> Self {
        Self {
            person_id: None,
            full_name: String::new(),
            gender: Gender::Male,
            birth_day: None,
            birth_month: None,
            birth_year: None,
            death_day: None,
            death_month: None,
            death_year: None,
            is_deceased: false,
            is_in_law: false,
            avatar_url: String::new(),
            initial_avatar_url: None,
            note: String::new(),
            phone_number: String::new(),
            occupation: String::new(),
            current_residence: String::new(),
        }
    }
}

impl MemberForm {
    /// Empty form for a new member.
    pub fn new(full_name: impl Into<String>, gender: Gender) -> Self {
        Self {
            full_name: full_name.into(),
            gender,
            ..Self::default()
        }
    }

    /// Form prefilled from an existing record.
    pub fn from_person(person: &Person, private: Option<&PersonPrivateDetails>) -> Self {
        let private_text = |value: Option<&Option<String>>| {
            value.and_then(|inner| inner.clone()).unwrap_or_default()
        };
        Self {
            person_id: Some(person.id),
            full_name: person.full_name.clone(),
            gender: person.gender,
            birth_day: person.birth_day,
            birth_month: person.birth_month,
            birth_year: person.birth_year,
            death_day: person.death_day,
            death_month: person.death_month,
            death_year: person.death_year,
            is_deceased: person.is_deceased,
            is_in_law: person.is_in_law,
            avatar_url: person.avatar_url.clone().unwrap_or_default(),
            initial_avatar_url: person.avatar_url.clone(),
            note: person.note.clone().unwrap_or_default(),
            phone_number: private_text(private.map(|details| &details.phone_number)),
            occupation: private_text(private.map(|details| &details.occupation)),
            current_residence: private_text(private.map(|details| &details.current_residence)),
        }
    }

    pub fn is_deceased(&self) -> bool {
        self.is_deceased
    }

    /// Sets the deceased flag; clearing it also clears the death date.
    pub fn set_deceased(&mut self, deceased: bool) {
        self.is_deceased = deceased;
        if !deceased {
            self.death_day = None;
            self.death_month = None;
            self.death_year = None;
        }
    }

    /// Avatar URL the form was loaded with.
    pub fn initial_avatar_url(&self) -> Option<&str> {
        self.initial_avatar_url.as_deref()
    }

    pub fn validate(&self) -> Result<(), MemberFormError> {
        if self.full_name.trim().is_empty() {
            return Err(MemberFormError::BlankFullName);
        }
        if !validate_date_parts(self.birth_day, self.birth_month, self.birth_year) {
            return Err(MemberFormError::InvalidBirthDate);
        }
        if !self.is_deceased {
            return Ok(());
        }
        if !validate_date_parts(self.death_day, self.death_month, self.death_year) {
            return Err(MemberFormError::InvalidDeathDate);
        }
        if let (Some(birth_year), Some(death_year)) = (self.birth_year, self.death_year) {
            if death_year < birth_year {
                return Err(MemberFormError::DeathBeforeBirth);
            }
        }
        Ok(())
    }

    /// Builds the public record persisted for this form.
    pub fn to_person(&self, id: PersonId, avatar_url: Option<String>) -> Person {
        let death_part = |value: Option<i64>| value.filter(|_| self.is_deceased);
        Person {
            id,
            full_name: self.full_name.trim().to_string(),
            gender: self.gender,
            birth_year: self.birth_year,
            birth_month: self.birth_month,
            birth_day: self.birth_day,
            death_year: death_part(self.death_year),
            death_month: death_part(self.death_month),
            death_day: death_part(self.death_day),
            is_deceased: self.is_deceased,
            is_in_law: self.is_in_law,
            avatar_url,
            note: non_blank(&self.note),
        }
    }

    /// Builds the private row; deceased persons keep no phone number.
    pub fn to_private_details(&self, id: PersonId) -> PersonPrivateDetails {
        let phone_number = if self.is_deceased {
            ""
        } else {
            self.phone_number.as_str()
        };
        PersonPrivateDetails::from_input(id, phone_number, &self.occupation, &self.current_residence)
    }
}

/// New avatar file chosen in the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Avatar action applied on save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AvatarChange {
    /// Keep whatever `MemberForm::avatar_url` holds.
    #[default]
    Keep,
    Replace(AvatarUpload),
    Remove,
}

/// Errors from saving a member.
#[derive(Debug)]
pub enum MemberEditorError {
    Access(AccessError),
    Validation(MemberFormError),
    EmptyAvatar,
    AvatarTooLarge { size: usize, limit: usize },
    Avatar(ObjectStoreError),
    Repo(RepoError),
}

impl Display for MemberEditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::EmptyAvatar => write!(f, "avatar file is empty"),
            Self::AvatarTooLarge { size, limit } => {
                write!(f, "avatar file is {size} bytes; the limit is {limit} bytes")
            }
            Self::Avatar(err) => write!(f, "avatar upload failed: {err}"),
            Self::Repo(err) => write!(f, "failed to save member: {err}"),
        }
    }
}

impl Error for MemberEditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Access(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Avatar(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::EmptyAvatar | Self::AvatarTooLarge { .. } => None,
        }
    }
}

impl From<AccessError> for MemberEditorError {
    fn from(value: AccessError) -> Self {
        Self::Access(value)
    }
}

impl From<MemberFormError> for MemberEditorError {
    fn from(value: MemberFormError) -> Self {
        Self::Validation(value)
    }
}

impl From<ObjectStoreError> for MemberEditorError {
    fn from(value: ObjectStoreError) -> Self {
        Self::Avatar(value)
    }
}

impl From<RepoError> for MemberEditorError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Member create/edit facade.
pub struct MemberEditor<'a> {
    conn: &'a Connection,
    gate: AccessGate<'a>,
    objects: &'a dyn ObjectStore,
}

impl<'a> MemberEditor<'a> {
    pub fn new(
        conn: &'a Connection,
        identities: &'a dyn IdentityProvider,
        objects: &'a dyn ObjectStore,
    ) -> Self {
        Self {
            conn,
            gate: AccessGate::new(conn, identities),
            objects,
        }
    }

    /// Validates and persists `form`; returns the saved person id.
    pub fn save(
        &self,
        form: &MemberForm,
        avatar: AvatarChange,
    ) -> Result<PersonId, MemberEditorError> {
        let actor = self.gate.require_authenticated()?;
        form.validate()?;

        let avatar_url = match avatar {
            AvatarChange::Keep => non_blank(&form.avatar_url),
            AvatarChange::Replace(upload) => Some(self.upload_avatar(&upload)?),
            AvatarChange::Remove => {
                self.remove_previous_avatar(form);
                None
            }
        };

        let repo = SqlitePersonRepository::new(self.conn);
        let (person_id, mode) = match form.person_id {
            Some(id) => {
                repo.update_person(&form.to_person(id, avatar_url))?;
                (id, "update")
            }
            None => {
                let id = repo.create_person(&form.to_person(Uuid::new_v4(), avatar_url))?;
                (id, "create")
            }
        };

        if actor.is_admin() {
            repo.upsert_private_details(&form.to_private_details(person_id))?;
        }

        info!(
            "event=member_save module=member_editor status=ok mode={} person_id={} private_written={}",
            mode,
            person_id,
            actor.is_admin()
        );
        Ok(person_id)
    }

    fn upload_avatar(&self, upload: &AvatarUpload) -> Result<String, MemberEditorError> {
        if upload.bytes.is_empty() {
            return Err(MemberEditorError::EmptyAvatar);
        }
        if upload.bytes.len() > MAX_AVATAR_BYTES {
            return Err(MemberEditorError::AvatarTooLarge {
                size: upload.bytes.len(),
                limit: MAX_AVATAR_BYTES,
            });
        }

        let path = avatar_object_path(&upload.file_name, Utc::now().timestamp_millis());
        self.objects.upload(AVATAR_BUCKET, &path, &upload.bytes)?;
        Ok(self.objects.public_url(AVATAR_BUCKET, &path))
    }

    fn remove_previous_avatar(&self, form: &MemberForm) {
        let Some(initial) = form.initial_avatar_url() else {
            return;
        };
        if form.avatar_url != initial {
            return;
        }
        let Some(object_name) = avatar_object_name(initial) else {
            warn!("event=avatar_remove module=member_editor status=error error_code=unparsable_avatar_url");
            return;
        };
        if let Err(err) = self.objects.remove(AVATAR_BUCKET, &[object_name]) {
            warn!(
                "event=avatar_remove module=member_editor status=error error_code=remove_failed error={}",
                err
            );
        }
    }
}

/// Builds a randomized avatar object path keeping the file extension.
///
/// Format: `<13 random chars>_<epoch_ms>.<ext>`.
pub fn avatar_object_path(file_name: &str, epoch_ms: i64) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{epoch_ms}.{}",
        &random[..AVATAR_RANDOM_PREFIX_LEN],
        avatar_extension(file_name)
    )
}

/// Returns the lowercase extension of `file_name`, or `bin` when it has no
/// usable extension.
pub fn avatar_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if AVATAR_EXTENSION_RE.is_match(ext) => ext.to_ascii_lowercase(),
        _ => FALLBACK_AVATAR_EXTENSION.to_string(),
    }
}

/// Extracts the stored object name (last URL path segment) from a public URL.
pub fn avatar_object_name(url: &str) -> Option<&str> {
    let name = url.rsplit('/').next()?;
    is_valid_object_path(name).then_some(name)
}
