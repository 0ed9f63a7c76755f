//! Login session tracking.
//!
//! `Session` holds the currently authenticated user in memory and mirrors
//! just the user id to a small JSON file in the data directory, so a
//! restart can pick up where the last run left off.  It is an explicitly
//! constructed object, built once at startup and passed to whoever needs it
//! (wrapped in [`SharedSession`]); there is no global instance.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::entities::User;
use crate::fflog;
use crate::handlers::UserHandler;
use crate::logging;
use crate::store::StoreError;

const SESSION_FILE: &str = "session.json";

/// What gets persisted: only the id.  The full user record is re-read from
/// the store on the next cold start.
#[derive(Debug, Serialize, Deserialize)]
struct SavedSession {
    user_id: i64,
}

/// Session state shared between controllers.
pub type SharedSession = Arc<Mutex<Session>>;

pub struct Session {
    current: Option<User>,
    path: PathBuf,
}

impl Session {
    /// Start a session for the given data directory, rehydrating the saved
    /// user if the persisted id still resolves to an existing account.  A
    /// missing, unreadable, or stale session file means logged-out.
    pub fn load(data_dir: &Path, users: &UserHandler) -> Self {
        let path = data_dir.join(SESSION_FILE);
        let current = read_saved_id(&path).and_then(|uid| match users.get_by_id(uid) {
            Ok(found) => {
                if found.is_none() {
                    fflog!("session: saved user {} no longer exists", logging::user_tag(uid));
                }
                found
            }
            Err(e) => {
                fflog!("session: failed to rehydrate {}: {e}", logging::user_tag(uid));
                None
            }
        });
        if let Some(user) = &current {
            fflog!("session: restored {} ({})", logging::user_tag(user.uid), user.username);
        }
        Self { current, path }
    }

    /// A session that never persists, for tests and in-memory demos.
    pub fn ephemeral() -> Self {
        Self {
            current: None,
            path: PathBuf::new(),
        }
    }

    /// Make `user` the current user and persist their id.
    pub fn login(&mut self, user: User) -> Result<(), StoreError> {
        let uid = user.uid;
        self.current = Some(user);
        if !self.path.as_os_str().is_empty() {
            let body = serde_json::to_string(&SavedSession { user_id: uid })?;
            std::fs::write(&self.path, body)?;
        }
        fflog!("session: logged in {}", logging::user_tag(uid));
        Ok(())
    }

    /// Clear the current user and remove the persisted id.
    pub fn logout(&mut self) -> Result<(), StoreError> {
        self.current = None;
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        fflog!("session: logged out");
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    pub fn current_user_id(&self) -> Option<i64> {
        self.current.as_ref().map(|u| u.uid)
    }

    /// Refresh the in-memory copy of the current user after a profile edit
    /// or counter change.  Ignored if the uid does not match the session.
    pub fn refresh(&mut self, user: &User) {
        if let Some(current) = &mut self.current {
            if current.uid == user.uid {
                *current = user.clone();
            }
        }
    }
}

fn read_saved_id(path: &Path) -> Option<i64> {
    let body = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<SavedSession>(&body) {
        Ok(saved) => Some(saved.user_id),
        Err(e) => {
            fflog!("session: ignoring corrupt session file: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
