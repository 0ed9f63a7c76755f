//! Application wiring.
//!
//! `App` makes the whole lifecycle explicit: open the database, spawn the
//! store worker, load the session, hand out controllers, and — when the
//! process is done — shut the worker down.  Nothing in the crate is
//! constructed lazily behind a global.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::controllers::{AuthController, PostController, UserController};
use crate::handlers::{CommentHandler, FollowHandler, LikeHandler, PostHandler, UserHandler};
use crate::session::{Session, SharedSession};
use crate::store::{db_path, Storage, StoreError};
use crate::worker::StoreWorker;

pub struct App {
    pub auth: AuthController,
    pub users: UserController,
    pub posts: PostController,
    pub session: SharedSession,
    worker: StoreWorker,
}

impl App {
    /// Open (or create) the database under `data_dir` and wire everything
    /// up.  The session is rehydrated from `session.json` if the saved user
    /// still exists.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let storage = Storage::open(&db_path(data_dir))?;
        Ok(Self::wire(storage, Some(data_dir)))
    }

    /// Fully in-memory app with an ephemeral session, for tests and demos.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::wire(Storage::open_in_memory()?, None))
    }

    fn wire(storage: Storage, data_dir: Option<&Path>) -> Self {
        let worker = StoreWorker::spawn(storage);
        let user_handler = UserHandler::new(worker.handle());

        let session = match data_dir {
            Some(dir) => Session::load(dir, &user_handler),
            None => Session::ephemeral(),
        };
        let session: SharedSession = Arc::new(Mutex::new(session));

        let users = UserController::new(
            user_handler.clone(),
            FollowHandler::new(worker.handle()),
            Arc::clone(&session),
        );
        let auth = AuthController::new(user_handler, Arc::clone(&session));
        let posts = PostController::new(
            PostHandler::new(worker.handle()),
            LikeHandler::new(worker.handle()),
            CommentHandler::new(worker.handle()),
            users.clone(),
            Arc::clone(&session),
        );

        Self {
            auth,
            users,
            posts,
            session,
            worker,
        }
    }

    /// Tear the app down: release every store handle, then stop the worker
    /// and wait for queued operations to finish.
    pub fn shutdown(self) {
        let Self {
            auth,
            users,
            posts,
            session,
            worker,
        } = self;
        drop((auth, users, posts, session));
        worker.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::LoginResult;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let pid = std::process::id();
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("forkfeed-app-{tag}-{pid}-{ts}"))
    }

    #[test]
    fn test_open_shutdown_reopen_keeps_session() {
        let dir = temp_dir("lifecycle");

        let app = App::open(&dir).unwrap();
        app.auth.register("alice", "secret").unwrap();
        assert_eq!(
            app.auth.login("alice", "secret").unwrap(),
            LoginResult::Success
        );
        app.shutdown();

        let app = App::open(&dir).unwrap();
        assert!(app.auth.is_logged_in());
        assert_eq!(app.auth.current_user().unwrap().username, "alice");
        app.shutdown();

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_in_memory_app_is_isolated() {
        let a = App::open_in_memory().unwrap();
        let b = App::open_in_memory().unwrap();
        a.auth.register("alice", "secret").unwrap();
        assert_eq!(
            b.auth.login("alice", "secret").unwrap(),
            LoginResult::InvalidCredentials
        );
        a.shutdown();
        b.shutdown();
    }
}
