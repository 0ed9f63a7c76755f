//! Profile management and the follow graph.

use crate::entities::User;
use crate::handlers::{FollowHandler, UserHandler};
use crate::session::SharedSession;
use crate::store::StoreError;
use crate::worker::DataError;

#[derive(Clone)]
pub struct UserController {
    users: UserHandler,
    follows: FollowHandler,
    session: SharedSession,
}

impl UserController {
    pub fn new(users: UserHandler, follows: FollowHandler, session: SharedSession) -> Self {
        Self {
            users,
            follows,
            session,
        }
    }

    fn current_uid(&self) -> Result<i64, DataError> {
        self.session
            .lock()
            .unwrap()
            .current_user_id()
            .ok_or_else(|| DataError::Invalid("no user is logged in".into()))
    }

    /// Insert a new account and return its generated uid.
    pub fn create_user(&self, user: &User) -> Result<i64, DataError> {
        self.users.insert(user)
    }

    pub fn update_user(&self, user: &User) -> Result<(), DataError> {
        self.users.update(user)?;
        self.session.lock().unwrap().refresh(user);
        Ok(())
    }

    pub fn delete_user(&self, user: &User) -> Result<(), DataError> {
        self.users.delete(user)
    }

    pub fn get_user(&self, uid: i64) -> Result<Option<User>, DataError> {
        self.users.get_by_id(uid)
    }

    pub fn get_user_by_name(&self, username: &str) -> Result<Option<User>, DataError> {
        self.users.get_by_username(username)
    }

    /// Follow `uid` as the current user.  The edge insert and the followed
    /// user's follower-count bump commit together.
    pub fn follow(&self, uid: i64) -> Result<(), DataError> {
        let follower = self.current_uid()?;
        if self.users.get_by_id(uid)?.is_none() {
            return Err(DataError::Store(StoreError::NotFound(format!("user {uid}"))));
        }
        self.follows.follow(follower, uid)
    }

    /// Undo a follow.  The count decrement is clamped at zero.
    pub fn unfollow(&self, uid: i64) -> Result<(), DataError> {
        let follower = self.current_uid()?;
        if self.users.get_by_id(uid)?.is_none() {
            return Err(DataError::Store(StoreError::NotFound(format!("user {uid}"))));
        }
        self.follows.unfollow(follower, uid)
    }

    /// Whether the current user follows `uid`.
    pub fn is_following(&self, uid: i64) -> Result<bool, DataError> {
        let follower = self.current_uid()?;
        self.follows.exists(follower, uid)
    }

    /// Make `user` the current user directly (demo seeding, tests).
    pub fn set_current_user(&self, user: User) -> Result<(), DataError> {
        self.session
            .lock()
            .unwrap()
            .login(user)
            .map_err(DataError::Store)
    }

    /// Look `uid` up and make it the current user.
    pub fn load_current_user(&self, uid: i64) -> Result<(), DataError> {
        match self.users.get_by_id(uid)? {
            Some(user) => self.set_current_user(user),
            None => Err(DataError::Store(StoreError::NotFound(format!("user {uid}")))),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.lock().unwrap().current_user().cloned()
    }

    pub fn current_user_id(&self) -> Option<i64> {
        self.session.lock().unwrap().current_user_id()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::store::Storage;
    use crate::worker::StoreWorker;
    use std::sync::{Arc, Mutex};

    fn controller() -> (StoreWorker, UserController) {
        let worker = StoreWorker::spawn(Storage::open_in_memory().unwrap());
        let users = UserHandler::new(worker.handle());
        let follows = FollowHandler::new(worker.handle());
        let session = Arc::new(Mutex::new(Session::ephemeral()));
        (worker, UserController::new(users, follows, session))
    }

    fn test_user(username: &str) -> User {
        User {
            uid: 0,
            username: username.to_string(),
            password: "secret".to_string(),
            profile_image: "default.png".to_string(),
            bio: None,
            followers_count: 0,
            posts_count: 0,
        }
    }

    #[test]
    fn test_create_and_load_user() {
        let (_worker, users) = controller();
        let uid = users.create_user(&test_user("alice")).unwrap();
        assert!(uid > 0);
        let loaded = users.get_user(uid).unwrap().unwrap();
        assert_eq!(loaded.username, "alice");

        users.load_current_user(uid).unwrap();
        assert_eq!(users.current_user_id(), Some(uid));
    }

    #[test]
    fn test_follow_updates_count_and_edge() {
        let (_worker, users) = controller();
        let alice = users.create_user(&test_user("alice")).unwrap();
        let bob = users.create_user(&test_user("bob")).unwrap();
        users.load_current_user(alice).unwrap();

        users.follow(bob).unwrap();
        assert!(users.is_following(bob).unwrap());
        assert_eq!(users.get_user(bob).unwrap().unwrap().followers_count, 1);

        users.unfollow(bob).unwrap();
        assert!(!users.is_following(bob).unwrap());
        assert_eq!(users.get_user(bob).unwrap().unwrap().followers_count, 0);
    }

    #[test]
    fn test_follow_requires_login_and_target() {
        let (_worker, users) = controller();
        let alice = users.create_user(&test_user("alice")).unwrap();

        assert!(matches!(users.follow(alice), Err(DataError::Invalid(_))));

        users.load_current_user(alice).unwrap();
        let err = users.follow(999).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_refreshes_session_copy() {
        let (_worker, users) = controller();
        let uid = users.create_user(&test_user("alice")).unwrap();
        users.load_current_user(uid).unwrap();

        let mut edited = users.get_user(uid).unwrap().unwrap();
        edited.bio = Some("pasta person".to_string());
        users.update_user(&edited).unwrap();

        assert_eq!(
            users.current_user().unwrap().bio.as_deref(),
            Some("pasta person")
        );
    }
}
