//! Session store for persisted client logins.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use relay_models::ids::SESSION_DIR_PREFIX;
use relay_models::SessionIdentity;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::atomic::{atomic_write_json, ensure_dir, read_json_optional};
use crate::error::{PersistenceError, Result};

/// Marker file written into every session directory this store creates.
const METADATA_FILE: &str = "relay-session.json";

/// Bare directory name left behind by older single-session layouts.
const LEGACY_SESSION_DIR: &str = "session";

/// Metadata recorded when a session directory is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub identity: SessionIdentity,
    pub created_at: DateTime<Utc>,
}

/// Manages the on-disk session directories.
///
/// Each identity owns one directory, whose contents are written by the client
/// library itself:
/// ```text
/// root/
/// ├── session-bot-principal/
/// │   ├── relay-session.json
/// │   └── ...client files...
/// └── session-stale/        <- removed by sweep_stale
/// ```
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Creates a new SessionStore with the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory for an identity.
    pub fn session_path(&self, identity: &SessionIdentity) -> PathBuf {
        self.root.join(identity.dir_name())
    }

    /// Returns true if the identity has a persisted session directory.
    pub fn exists(&self, identity: &SessionIdentity) -> bool {
        self.session_path(identity).is_dir()
    }

    /// Creates the session directory if missing and returns its path.
    pub fn create(&self, identity: &SessionIdentity) -> Result<PathBuf> {
        let path = self.session_path(identity);
        ensure_dir(&path)?;

        let marker = path.join(METADATA_FILE);
        if !marker.exists() {
            let metadata = SessionMetadata {
                identity: identity.clone(),
                created_at: Utc::now(),
            };
            atomic_write_json(&marker, &metadata)?;
            info!(identity = %identity, path = %path.display(), "session directory created");
        }
        Ok(path)
    }

    /// Loads the metadata marker, if this store created the directory.
    pub fn metadata(&self, identity: &SessionIdentity) -> Result<Option<SessionMetadata>> {
        read_json_optional(&self.session_path(identity).join(METADATA_FILE))
    }

    /// Removes the session directory and everything in it.
    ///
    /// Returns false when there was nothing to remove.
    pub fn destroy(&self, identity: &SessionIdentity) -> Result<bool> {
        let path = self.session_path(identity);
        if !path.exists() {
            debug!(path = %path.display(), "no session directory to remove");
            return Ok(false);
        }
        fs::remove_dir_all(&path)
            .map_err(|source| PersistenceError::RemoveError { path: path.clone(), source })?;
        info!(identity = %identity, path = %path.display(), "session directory removed");
        Ok(true)
    }

    /// Ensures the root exists and removes every session directory that does
    /// not belong to the active identity.
    ///
    /// Only `session-*` directories and a bare `session` directory are
    /// touched; unrelated entries are left alone. Returns the removed paths.
    pub fn sweep_stale(&self, active: &SessionIdentity) -> Result<Vec<PathBuf>> {
        ensure_dir(&self.root)?;

        let keep = active.dir_name();
        let entries = fs::read_dir(&self.root).map_err(|source| PersistenceError::ReadError {
            path: self.root.clone(),
            source,
        })?;

        let mut removed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| PersistenceError::ReadError {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let stale = (name.starts_with(SESSION_DIR_PREFIX) && name != keep)
                || name == LEGACY_SESSION_DIR;
            if !stale {
                continue;
            }

            warn!(path = %path.display(), "removing stale session directory");
            fs::remove_dir_all(&path)
                .map_err(|source| PersistenceError::RemoveError { path: path.clone(), source })?;
            removed.push(path);
        }

        Ok(removed)
    }
}
