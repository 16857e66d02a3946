//! Persistence layer for the WhatsApp relay.
//!
//! Two stores live here:
//! - [`SessionStore`]: one directory per session identity under a root, with
//!   exists/create/destroy and a sweep of stale sibling sessions.
//! - [`MediaStore`]: write-once media artifacts under a media root, named by a
//!   time-ordered unique token and served back under `/media/<filename>`.
//!
//! Writes go through [`atomic::atomic_write`] (temp file, then rename).
//!
//! # Example
//!
//! ```no_run
//! use relay_models::SessionIdentity;
//! use relay_persistence::SessionStore;
//!
//! let store = SessionStore::new("/var/lib/wa-relay/sessions");
//! let identity = SessionIdentity::new("bot-principal").unwrap();
//!
//! store.sweep_stale(&identity).unwrap();
//! if !store.exists(&identity) {
//!     store.create(&identity).unwrap();
//! }
//! ```

pub mod atomic;
pub mod error;
pub mod media_store;
pub mod session_store;

pub use error::{PersistenceError, Result};
pub use media_store::{extension_from_mime, MediaArtifact, MediaStore};
pub use session_store::{SessionMetadata, SessionStore};
