//! Write-once media artifact storage.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::atomic::{atomic_write, ensure_dir};
use crate::error::Result;

/// Extension used when the MIME type does not yield one.
const FALLBACK_EXTENSION: &str = "bin";

/// URL path segment under which media is served.
pub const MEDIA_ROUTE: &str = "media";

/// Derives a file extension from a MIME type.
///
/// Takes the subtype and drops any parameters, so `image/jpeg;charset=binary`
/// yields `jpeg` and `audio/ogg; codecs=opus` yields `ogg`.
pub fn extension_from_mime(mime_type: &str) -> String {
    mime_type
        .split_once('/')
        .map(|(_, subtype)| subtype.split(';').next().unwrap_or_default().trim())
        .filter(|ext| !ext.is_empty())
        .unwrap_or(FALLBACK_EXTENSION)
        .to_ascii_lowercase()
}

/// A stored media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaArtifact {
    /// Generated file name (`<millis>-<uuid>.<ext>`).
    pub filename: String,
    /// Location on disk.
    pub path: PathBuf,
    /// Public URL the file is served at.
    pub url: String,
}

/// Stores media artifacts under a root and computes their public URLs.
///
/// Files are written once and never touched again; cleanup is left to
/// operations.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    public_url: String,
}

impl MediaStore {
    /// Creates a media store writing under `root` and linking from `public_url`.
    pub fn new(root: impl Into<PathBuf>, public_url: impl AsRef<str>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.as_ref().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the media root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the media root if missing.
    pub fn ensure_root(&self) -> Result<()> {
        ensure_dir(&self.root)
    }

    /// Generates a time-ordered unique file name for the MIME type.
    pub fn generate_filename(mime_type: &str) -> String {
        format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            extension_from_mime(mime_type)
        )
    }

    /// Returns the public URL of a stored file.
    pub fn public_url(&self, filename: &str) -> String {
        format!("{}/{}/{}", self.public_url, MEDIA_ROUTE, filename)
    }

    /// Writes a media blob and returns where it can be fetched.
    pub fn store(&self, mime_type: &str, data: &[u8]) -> Result<MediaArtifact> {
        let filename = Self::generate_filename(mime_type);
        let path = self.root.join(&filename);
        atomic_write(&path, data)?;
        debug!(path = %path.display(), bytes = data.len(), "media stored");

        Ok(MediaArtifact {
            url: self.public_url(&filename),
            filename,
            path,
        })
    }
}
