//! Object storage for member avatars.
//!
//! # Responsibility
//! - Define the bucket/path object-store contract used by the member editor.
//! - Provide a filesystem implementation with public URLs.
//!
//! # Invariants
//! - Object paths are single flat segments; separators and `..` are rejected.
//! - Uploads never overwrite an existing object.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Bucket holding member avatars.
pub const AVATAR_BUCKET: &str = "avatars";

static OBJECT_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,254}$").expect("valid object path regex")
});

/// Object-store failures.
#[derive(Debug)]
pub enum ObjectStoreError {
    InvalidPath(String),
    AlreadyExists(String),
    NotFound(String),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for ObjectStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath(path) => write!(f, "invalid object path `{path}`"),
            Self::AlreadyExists(path) => write!(f, "object already exists: {path}"),
            Self::NotFound(path) => write!(f, "object not found: {path}"),
            Self::Io { path, source } => {
                write!(f, "object storage I/O failed at `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ObjectStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Bucketed object storage.
pub trait ObjectStore {
    fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<(), ObjectStoreError>;
    /// Returns the public URL of one object; the object need not exist.
    fn public_url(&self, bucket: &str, path: &str) -> String;
    fn remove(&self, bucket: &str, paths: &[&str]) -> Result<(), ObjectStoreError>;
}

/// Returns whether `path` is an acceptable flat object path.
pub fn is_valid_object_path(path: &str) -> bool {
    OBJECT_PATH_RE.is_match(path) && !path.contains("..")
}

/// Filesystem object store laid out as `<root>/<bucket>/<path>`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf, ObjectStoreError> {
        if !is_valid_object_path(bucket) {
            return Err(ObjectStoreError::InvalidPath(bucket.to_string()));
        }
        if !is_valid_object_path(path) {
            return Err(ObjectStoreError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(bucket).join(path))
    }
}

impl ObjectStore for FsObjectStore {
    fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<(), ObjectStoreError> {
        let target = self.object_path(bucket, path)?;
        let io_err = |source| ObjectStoreError::Io {
            path: target.clone(),
            source,
        };

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(ObjectStoreError::AlreadyExists(path.to_string()));
            }
            Err(err) => return Err(io_err(err)),
        };
        file.write_all(bytes).map_err(io_err)?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{bucket}/{path}", self.public_base_url)
    }

    fn remove(&self, bucket: &str, paths: &[&str]) -> Result<(), ObjectStoreError> {
        for path in paths {
            let target = self.object_path(bucket, path)?;
            match std::fs::remove_file(&target) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    return Err(ObjectStoreError::NotFound((*path).to_string()));
                }
                Err(source) => return Err(ObjectStoreError::Io { path: target, source }),
            }
        }
        Ok(())
    }
}
