//! Registration and login.

use crate::entities::User;
use crate::fflog;
use crate::handlers::UserHandler;
use crate::session::SharedSession;
use crate::worker::DataError;

/// Outcome of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    Success,
    EmptyFields,
    InvalidCredentials,
}

/// Outcome of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterResult {
    Success,
    EmptyFields,
    UsernameTaken,
}

#[derive(Clone)]
pub struct AuthController {
    users: UserHandler,
    session: SharedSession,
}

impl AuthController {
    pub fn new(users: UserHandler, session: SharedSession) -> Self {
        Self { users, session }
    }

    /// Check the credentials against the stored account and, on success,
    /// make that account the current user.
    ///
    /// Passwords are compared in plaintext, exactly as they are stored.
    pub fn login(&self, username: &str, password: &str) -> Result<LoginResult, DataError> {
        if username.trim().is_empty() || password.is_empty() {
            return Ok(LoginResult::EmptyFields);
        }
        match self.users.get_by_username(username)? {
            Some(user) if user.password == password => {
                self.session
                    .lock()
                    .unwrap()
                    .login(user)
                    .map_err(DataError::Store)?;
                Ok(LoginResult::Success)
            }
            _ => {
                fflog!("auth: login failed for {username}");
                Ok(LoginResult::InvalidCredentials)
            }
        }
    }

    /// Create an account with the default profile.  Does not log the new
    /// user in; the login screen handles that as its own step.
    pub fn register(&self, username: &str, password: &str) -> Result<RegisterResult, DataError> {
        if username.trim().is_empty() || password.is_empty() {
            return Ok(RegisterResult::EmptyFields);
        }
        if self.users.get_by_username(username)?.is_some() {
            return Ok(RegisterResult::UsernameTaken);
        }
        let user = User {
            uid: 0,
            username: username.to_string(),
            password: password.to_string(),
            profile_image: "default.png".to_string(),
            bio: Some("default bio".to_string()),
            followers_count: 0,
            posts_count: 0,
        };
        match self.users.insert(&user) {
            Ok(uid) => {
                fflog!("auth: registered {username} as uid {uid}");
                Ok(RegisterResult::Success)
            }
            // The username check above races against other writers; the
            // unique constraint has the final word.
            Err(e) if e.is_conflict() => Ok(RegisterResult::UsernameTaken),
            Err(e) => Err(e),
        }
    }

    pub fn logout(&self) -> Result<(), DataError> {
        self.session
            .lock()
            .unwrap()
            .logout()
            .map_err(DataError::Store)
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.lock().unwrap().is_logged_in()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.lock().unwrap().current_user().cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
