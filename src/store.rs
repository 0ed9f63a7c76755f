//! SQLite storage layer for forkfeed.
//!
//! Owns the schema for the five entity tables (users, posts, comments,
//! likes, follows), their composite keys and cascade rules, and the CRUD
//! primitives the handlers call.  Compound operations that keep a
//! denormalized counter in sync with its rows (commenting a post, following
//! a user, creating a post) run inside a single transaction, so the counter
//! can never be observed out of step with the rows it summarizes.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};

use crate::entities::{Comment, Follow, Like, NewPost, Post, User};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    Serde(serde_json::Error),
    NotFound(String),
    /// A uniqueness or foreign-key constraint rejected the write.
    Conflict(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "sqlite error: {e}"),
            StoreError::Io(e) => write!(f, "io error: {e}"),
            StoreError::Serde(e) => write!(f, "serialization error: {e}"),
            StoreError::NotFound(msg) => write!(f, "not found: {msg}"),
            StoreError::Conflict(msg) => write!(f, "conflict: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(f, msg)
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(
                    msg.clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                )
            }
            _ => StoreError::Sqlite(e),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e)
    }
}

/// Current time as seconds since the UNIX epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Database file location inside a data directory.
pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("forkfeed.db")
}

/// Resolve the forkfeed home directory from environment or default.
pub fn resolve_data_dir() -> PathBuf {
    std::env::var("FORKFEED_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            std::env::var("HOME")
                .map(|h| PathBuf::from(h).join(".forkfeed"))
                .unwrap_or_else(|_| PathBuf::from(".forkfeed"))
        })
}

// ---------------------------------------------------------------------------
// Storage handle
// ---------------------------------------------------------------------------

/// Main storage handle wrapping a SQLite connection.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open or create a database at the given path. Creates schema if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let storage = Self { conn };
        storage.create_schema()?;
        Ok(storage)
    }

    /// Create an in-memory database, used by tests and demos.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let storage = Self { conn };
        storage.create_schema()?;
        Ok(storage)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                uid             INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL UNIQUE,
                password        TEXT NOT NULL,
                profile_image   TEXT NOT NULL,
                bio             TEXT,
                followers_count INTEGER NOT NULL DEFAULT 0,
                posts_count     INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS posts (
                uid           INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
                post_id       INTEGER NOT NULL,
                image_path    TEXT NOT NULL,
                description   TEXT,
                recipe        TEXT,
                ingredients   TEXT,
                created_at    INTEGER NOT NULL,
                comment_count INTEGER NOT NULL DEFAULT 0,
                latitude      REAL NOT NULL,
                longitude     REAL NOT NULL,
                PRIMARY KEY (uid, post_id)
            );

            CREATE INDEX IF NOT EXISTS idx_posts_created
                ON posts(created_at DESC);

            CREATE TABLE IF NOT EXISTS comments (
                uid        INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
                post_id    INTEGER NOT NULL,
                comment_id INTEGER NOT NULL,
                content    TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (uid, post_id, comment_id),
                FOREIGN KEY (uid, post_id)
                    REFERENCES posts(uid, post_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_comments_post
                ON comments(post_id, comment_id);

            CREATE TABLE IF NOT EXISTS likes (
                user_id    INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
                post_id    INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, post_id),
                FOREIGN KEY (user_id, post_id)
                    REFERENCES posts(uid, post_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_likes_post
                ON likes(post_id);

            CREATE TABLE IF NOT EXISTS follows (
                follower_id INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
                followed_id INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
                created_at  INTEGER NOT NULL,
                PRIMARY KEY (follower_id, followed_id)
            );

            CREATE INDEX IF NOT EXISTS idx_follows_followed
                ON follows(followed_id);
            ",
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Insert a new user and return the generated uid.  The `uid` field of
    /// the passed record is ignored; ids are always allocated by the store.
    pub fn insert_user(&mut self, user: &User) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO users (username, password, profile_image, bio,
                                followers_count, posts_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.username,
                user.password,
                user.profile_image,
                user.bio,
                user.followers_count,
                user.posts_count,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_user(&self, uid: i64) -> Result<Option<User>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, username, password, profile_image, bio,
                    followers_count, posts_count
             FROM users WHERE uid = ?1",
        )?;
        let row = stmt
            .query_row(params![uid], user_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, username, password, profile_image, bio,
                    followers_count, posts_count
             FROM users WHERE username = ?1",
        )?;
        let row = stmt
            .query_row(params![username], user_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, username, password, profile_image, bio,
                    followers_count, posts_count
             FROM users ORDER BY uid",
        )?;
        let rows = stmt.query_map([], user_from_row)?;
        collect(rows)
    }

    pub fn update_user(&mut self, user: &User) -> Result<(), StoreError> {
        let affected = self.conn.execute(
            "UPDATE users SET username = ?1, password = ?2, profile_image = ?3,
                              bio = ?4, followers_count = ?5, posts_count = ?6
             WHERE uid = ?7",
            params![
                user.username,
                user.password,
                user.profile_image,
                user.bio,
                user.followers_count,
                user.posts_count,
                user.uid,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("user {}", user.uid)));
        }
        Ok(())
    }

    /// Delete a user.  Cascades to their posts, comments, likes, and follow
    /// edges in both directions.
    pub fn delete_user(&mut self, uid: i64) -> Result<(), StoreError> {
        let affected = self
            .conn
            .execute("DELETE FROM users WHERE uid = ?1", params![uid])?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("user {uid}")));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Posts
    // -----------------------------------------------------------------------

    pub fn insert_post(&mut self, post: &Post) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO posts (uid, post_id, image_path, description, recipe,
                                ingredients, created_at, comment_count,
                                latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                post.uid,
                post.post_id,
                post.image_path,
                post.description,
                post.recipe,
                post.ingredients,
                post.created_at as i64,
                post.comment_count,
                post.latitude,
                post.longitude,
            ],
        )?;
        Ok(())
    }

    /// Allocate the next sequential post id for `uid`, insert the post, and
    /// bump the owner's `posts_count`, all in one transaction.
    pub fn create_post(
        &mut self,
        uid: i64,
        draft: &NewPost,
        created_at: u64,
    ) -> Result<Post, StoreError> {
        let tx = self.conn.transaction()?;
        let post_id: i64 = tx.query_row(
            "SELECT COALESCE(MAX(post_id), 0) + 1 FROM posts WHERE uid = ?1",
            params![uid],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO posts (uid, post_id, image_path, description, recipe,
                                ingredients, created_at, comment_count,
                                latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)",
            params![
                uid,
                post_id,
                draft.image_path,
                draft.description,
                draft.recipe,
                draft.ingredients,
                created_at as i64,
                draft.latitude,
                draft.longitude,
            ],
        )?;
        let affected = tx.execute(
            "UPDATE users SET posts_count = posts_count + 1 WHERE uid = ?1",
            params![uid],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("user {uid}")));
        }
        tx.commit()?;
        Ok(Post {
            uid,
            post_id,
            image_path: draft.image_path.clone(),
            description: draft.description.clone(),
            recipe: draft.recipe.clone(),
            ingredients: draft.ingredients.clone(),
            created_at,
            comment_count: 0,
            latitude: draft.latitude,
            longitude: draft.longitude,
        })
    }

    pub fn get_post(&self, uid: i64, post_id: i64) -> Result<Option<Post>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, post_id, image_path, description, recipe, ingredients,
                    created_at, comment_count, latitude, longitude
             FROM posts WHERE uid = ?1 AND post_id = ?2",
        )?;
        let row = stmt
            .query_row(params![uid, post_id], post_from_row)
            .optional()?;
        Ok(row)
    }

    /// Every post, newest first.  This is the feed query.
    pub fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, post_id, image_path, description, recipe, ingredients,
                    created_at, comment_count, latitude, longitude
             FROM posts ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], post_from_row)?;
        collect(rows)
    }

    pub fn list_posts_by_user(&self, uid: i64) -> Result<Vec<Post>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, post_id, image_path, description, recipe, ingredients,
                    created_at, comment_count, latitude, longitude
             FROM posts WHERE uid = ?1 ORDER BY post_id",
        )?;
        let rows = stmt.query_map(params![uid], post_from_row)?;
        collect(rows)
    }

    pub fn update_post(&mut self, post: &Post) -> Result<(), StoreError> {
        let affected = self.conn.execute(
            "UPDATE posts SET image_path = ?1, description = ?2, recipe = ?3,
                              ingredients = ?4, created_at = ?5,
                              comment_count = ?6, latitude = ?7, longitude = ?8
             WHERE uid = ?9 AND post_id = ?10",
            params![
                post.image_path,
                post.description,
                post.recipe,
                post.ingredients,
                post.created_at as i64,
                post.comment_count,
                post.latitude,
                post.longitude,
                post.uid,
                post.post_id,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!(
                "post {}/{}",
                post.uid, post.post_id
            )));
        }
        Ok(())
    }

    /// Delete a post.  Cascades to its comments and likes.
    pub fn delete_post(&mut self, uid: i64, post_id: i64) -> Result<(), StoreError> {
        let affected = self.conn.execute(
            "DELETE FROM posts WHERE uid = ?1 AND post_id = ?2",
            params![uid, post_id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("post {uid}/{post_id}")));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Comments
    // -----------------------------------------------------------------------

    pub fn insert_comment(&mut self, comment: &Comment) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO comments (uid, post_id, comment_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.uid,
                comment.post_id,
                comment.comment_id,
                comment.content,
                comment.created_at as i64,
            ],
        )?;
        Ok(())
    }

    /// Insert a comment with the next sequential id for its post and bump
    /// the post's `comment_count`, all in one transaction.  The stored count
    /// therefore always equals the number of comment rows.
    pub fn comment_post(
        &mut self,
        uid: i64,
        post_id: i64,
        content: &str,
        created_at: u64,
    ) -> Result<Comment, StoreError> {
        let tx = self.conn.transaction()?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE uid = ?1 AND post_id = ?2)",
            params![uid, post_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(StoreError::NotFound(format!("post {uid}/{post_id}")));
        }
        let comment_id: i64 = tx.query_row(
            "SELECT COALESCE(MAX(comment_id), 0) + 1 FROM comments
             WHERE uid = ?1 AND post_id = ?2",
            params![uid, post_id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO comments (uid, post_id, comment_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![uid, post_id, comment_id, content, created_at as i64],
        )?;
        tx.execute(
            "UPDATE posts SET comment_count = comment_count + 1
             WHERE uid = ?1 AND post_id = ?2",
            params![uid, post_id],
        )?;
        tx.commit()?;
        Ok(Comment {
            uid,
            post_id,
            comment_id,
            content: content.to_string(),
            created_at,
        })
    }

    pub fn update_comment(&mut self, comment: &Comment) -> Result<(), StoreError> {
        let affected = self.conn.execute(
            "UPDATE comments SET content = ?1, created_at = ?2
             WHERE uid = ?3 AND post_id = ?4 AND comment_id = ?5",
            params![
                comment.content,
                comment.created_at as i64,
                comment.uid,
                comment.post_id,
                comment.comment_id,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!(
                "comment {}/{}/{}",
                comment.uid, comment.post_id, comment.comment_id
            )));
        }
        Ok(())
    }

    pub fn get_comment(
        &self,
        uid: i64,
        post_id: i64,
        comment_id: i64,
    ) -> Result<Option<Comment>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, post_id, comment_id, content, created_at
             FROM comments WHERE uid = ?1 AND post_id = ?2 AND comment_id = ?3",
        )?;
        let row = stmt
            .query_row(params![uid, post_id, comment_id], comment_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn list_comments(&self) -> Result<Vec<Comment>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, post_id, comment_id, content, created_at
             FROM comments",
        )?;
        let rows = stmt.query_map([], comment_from_row)?;
        collect(rows)
    }

    pub fn list_comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, post_id, comment_id, content, created_at
             FROM comments WHERE post_id = ?1 ORDER BY comment_id",
        )?;
        let rows = stmt.query_map(params![post_id], comment_from_row)?;
        collect(rows)
    }

    pub fn delete_comment(
        &mut self,
        uid: i64,
        post_id: i64,
        comment_id: i64,
    ) -> Result<(), StoreError> {
        let affected = self.conn.execute(
            "DELETE FROM comments
             WHERE uid = ?1 AND post_id = ?2 AND comment_id = ?3",
            params![uid, post_id, comment_id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!(
                "comment {uid}/{post_id}/{comment_id}"
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Likes
    // -----------------------------------------------------------------------

    pub fn insert_like(&mut self, like: &Like) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO likes (user_id, post_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![like.user_id, like.post_id, like.created_at as i64],
        )?;
        Ok(())
    }

    pub fn delete_like(&mut self, user_id: i64, post_id: i64) -> Result<(), StoreError> {
        let affected = self.conn.execute(
            "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
            params![user_id, post_id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("like {user_id}/{post_id}")));
        }
        Ok(())
    }

    /// Remove the like if present, add it if absent.  Returns the end state:
    /// `true` when the post is now liked.  Runs in one transaction on the
    /// store worker, so concurrent togglers cannot interleave.
    pub fn toggle_like(
        &mut self,
        user_id: i64,
        post_id: i64,
        created_at: u64,
    ) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        let liked: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = ?1 AND post_id = ?2)",
            params![user_id, post_id],
            |row| row.get(0),
        )?;
        if liked != 0 {
            tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                params![user_id, post_id],
            )?;
        } else {
            tx.execute(
                "INSERT INTO likes (user_id, post_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![user_id, post_id, created_at as i64],
            )?;
        }
        tx.commit()?;
        Ok(liked == 0)
    }

    pub fn is_liked(&self, user_id: i64, post_id: i64) -> Result<bool, StoreError> {
        let liked: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = ?1 AND post_id = ?2)",
            params![user_id, post_id],
            |row| row.get(0),
        )?;
        Ok(liked != 0)
    }

    pub fn like_count(&self, post_id: i64) -> Result<u32, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    pub fn list_likes(&self) -> Result<Vec<Like>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id, post_id, created_at FROM likes")?;
        let rows = stmt.query_map([], like_from_row)?;
        collect(rows)
    }

    pub fn list_likes_for_post(&self, post_id: i64) -> Result<Vec<Like>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, post_id, created_at FROM likes WHERE post_id = ?1",
        )?;
        let rows = stmt.query_map(params![post_id], like_from_row)?;
        collect(rows)
    }

    // -----------------------------------------------------------------------
    // Follows
    // -----------------------------------------------------------------------

    pub fn insert_follow(&mut self, follow: &Follow) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO follows (follower_id, followed_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![
                follow.follower_id,
                follow.followed_id,
                follow.created_at as i64,
            ],
        )?;
        Ok(())
    }

    /// Insert a follow edge and bump the followed user's `followers_count`
    /// in one transaction.  A duplicate edge surfaces as `Conflict`.
    pub fn follow_user(
        &mut self,
        follower_id: i64,
        followed_id: i64,
        created_at: u64,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO follows (follower_id, followed_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![follower_id, followed_id, created_at as i64],
        )?;
        tx.execute(
            "UPDATE users SET followers_count = followers_count + 1
             WHERE uid = ?1",
            params![followed_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Delete a follow edge and decrement the followed user's
    /// `followers_count`, clamped at zero, in one transaction.
    pub fn unfollow_user(&mut self, follower_id: i64, followed_id: i64) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let affected = tx.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
            params![follower_id, followed_id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!(
                "follow {follower_id}->{followed_id}"
            )));
        }
        tx.execute(
            "UPDATE users SET followers_count = MAX(followers_count - 1, 0)
             WHERE uid = ?1",
            params![followed_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn delete_follow(&mut self, follower_id: i64, followed_id: i64) -> Result<(), StoreError> {
        let affected = self.conn.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
            params![follower_id, followed_id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!(
                "follow {follower_id}->{followed_id}"
            )));
        }
        Ok(())
    }

    pub fn get_follow(
        &self,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<Option<Follow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT follower_id, followed_id, created_at
             FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
        )?;
        let row = stmt
            .query_row(params![follower_id, followed_id], follow_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool, StoreError> {
        let found: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM follows
                           WHERE follower_id = ?1 AND followed_id = ?2)",
            params![follower_id, followed_id],
            |row| row.get(0),
        )?;
        Ok(found != 0)
    }

    pub fn list_follows(&self) -> Result<Vec<Follow>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT follower_id, followed_id, created_at FROM follows")?;
        let rows = stmt.query_map([], follow_from_row)?;
        collect(rows)
    }

    /// Edges where `uid` is the follower.
    pub fn list_following(&self, uid: i64) -> Result<Vec<Follow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT follower_id, followed_id, created_at
             FROM follows WHERE follower_id = ?1",
        )?;
        let rows = stmt.query_map(params![uid], follow_from_row)?;
        collect(rows)
    }

    /// Edges where `uid` is the one being followed.
    pub fn list_followers(&self, uid: i64) -> Result<Vec<Follow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT follower_id, followed_id, created_at
             FROM follows WHERE followed_id = ?1",
        )?;
        let rows = stmt.query_map(params![uid], follow_from_row)?;
        collect(rows)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        uid: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        profile_image: row.get(3)?,
        bio: row.get(4)?,
        followers_count: row.get(5)?,
        posts_count: row.get(6)?,
    })
}

fn post_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        uid: row.get(0)?,
        post_id: row.get(1)?,
        image_path: row.get(2)?,
        description: row.get(3)?,
        recipe: row.get(4)?,
        ingredients: row.get(5)?,
        created_at: row.get::<_, i64>(6)? as u64,
        comment_count: row.get(7)?,
        latitude: row.get(8)?,
        longitude: row.get(9)?,
    })
}

fn comment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        uid: row.get(0)?,
        post_id: row.get(1)?,
        comment_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get::<_, i64>(4)? as u64,
    })
}

fn like_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Like> {
    Ok(Like {
        user_id: row.get(0)?,
        post_id: row.get(1)?,
        created_at: row.get::<_, i64>(2)? as u64,
    })
}

fn follow_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Follow> {
    Ok(Follow {
        follower_id: row.get(0)?,
        followed_id: row.get(1)?,
        created_at: row.get::<_, i64>(2)? as u64,
    })
}

fn collect<T>(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>>,
) -> Result<Vec<T>, StoreError> {
    let mut result = Vec::new();
    for row in rows {
        result.push(row?);
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_storage() -> Storage {
        Storage::open_in_memory().unwrap()
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

    fn test_draft(image: &str) -> NewPost {
        NewPost {
            image_path: image.to_string(),
            description: Some("a plate of food".to_string()),
            recipe: None,
            ingredients: None,
            latitude: 52.5,
            longitude: 13.4,
        }
    }

    #[test]
    fn test_schema_creation() {
        let mut storage = test_storage();
        // Schema should already be created; verify by inserting data.
        storage.insert_user(&test_user("smoke")).unwrap();
    }

    #[test]
    fn test_user_crud() {
        let mut storage = test_storage();

        let uid = storage.insert_user(&test_user("alice")).unwrap();
        assert!(uid > 0);

        let loaded = storage.get_user(uid).unwrap().unwrap();
        assert_eq!(loaded.username, "alice");
        assert_eq!(loaded.followers_count, 0);

        let by_name = storage.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.uid, uid);
        assert!(storage.get_user_by_username("bob").unwrap().is_none());

        let mut updated = loaded.clone();
        updated.bio = Some("home cook".to_string());
        storage.update_user(&updated).unwrap();
        let loaded = storage.get_user(uid).unwrap().unwrap();
        assert_eq!(loaded.bio.as_deref(), Some("home cook"));

        assert_eq!(storage.list_users().unwrap().len(), 1);

        storage.delete_user(uid).unwrap();
        assert!(storage.get_user(uid).unwrap().is_none());
        assert!(matches!(
            storage.delete_user(uid),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let mut storage = test_storage();
        storage.insert_user(&test_user("alice")).unwrap();
        let err = storage.insert_user(&test_user("alice")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_create_post_allocates_sequential_ids() {
        let mut storage = test_storage();
        let uid = storage.insert_user(&test_user("alice")).unwrap();

        let first = storage.create_post(uid, &test_draft("a.jpg"), 1000).unwrap();
        let second = storage.create_post(uid, &test_draft("b.jpg"), 1001).unwrap();
        assert_eq!(first.post_id, 1);
        assert_eq!(second.post_id, 2);

        // Another owner starts from 1 again.
        let other = storage.insert_user(&test_user("bob")).unwrap();
        let theirs = storage.create_post(other, &test_draft("c.jpg"), 1002).unwrap();
        assert_eq!(theirs.post_id, 1);

        // posts_count tracked in the same transaction
        assert_eq!(storage.get_user(uid).unwrap().unwrap().posts_count, 2);
        assert_eq!(storage.get_user(other).unwrap().unwrap().posts_count, 1);
    }

    #[test]
    fn test_create_post_for_missing_user() {
        let mut storage = test_storage();
        let err = storage.create_post(42, &test_draft("a.jpg"), 1000).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_) | StoreError::NotFound(_)));
        // Nothing committed.
        assert!(storage.list_posts().unwrap().is_empty());
    }

    #[test]
    fn test_feed_is_newest_first() {
        let mut storage = test_storage();
        let uid = storage.insert_user(&test_user("alice")).unwrap();
        storage.create_post(uid, &test_draft("old.jpg"), 1000).unwrap();
        storage.create_post(uid, &test_draft("new.jpg"), 2000).unwrap();

        let feed = storage.list_posts().unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].image_path, "new.jpg");
        assert_eq!(feed[1].image_path, "old.jpg");
    }

    #[test]
    fn test_comment_post_keeps_count_in_sync() {
        let mut storage = test_storage();
        let uid = storage.insert_user(&test_user("alice")).unwrap();
        let post = storage.create_post(uid, &test_draft("a.jpg"), 1000).unwrap();

        let c1 = storage.comment_post(uid, post.post_id, "looks great", 1001).unwrap();
        let c2 = storage.comment_post(uid, post.post_id, "making this", 1002).unwrap();
        assert_eq!(c1.comment_id, 1);
        assert_eq!(c2.comment_id, 2);

        let loaded = storage.get_post(uid, post.post_id).unwrap().unwrap();
        assert_eq!(loaded.comment_count, 2);
        let comments = storage.list_comments_for_post(post.post_id).unwrap();
        assert_eq!(comments.len() as u32, loaded.comment_count);
        assert_eq!(comments[0].content, "looks great");

        // Commenting a missing post changes nothing.
        let err = storage.comment_post(uid, 99, "ghost", 1003).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let loaded = storage.get_post(uid, post.post_id).unwrap().unwrap();
        assert_eq!(loaded.comment_count, 2);
    }

    #[test]
    fn test_toggle_like_roundtrip() {
        let mut storage = test_storage();
        let uid = storage.insert_user(&test_user("alice")).unwrap();
        let post = storage.create_post(uid, &test_draft("a.jpg"), 1000).unwrap();

        assert!(!storage.is_liked(uid, post.post_id).unwrap());
        assert!(storage.toggle_like(uid, post.post_id, 1001).unwrap());
        assert!(storage.is_liked(uid, post.post_id).unwrap());
        assert_eq!(storage.like_count(post.post_id).unwrap(), 1);

        assert!(!storage.toggle_like(uid, post.post_id, 1002).unwrap());
        assert!(!storage.is_liked(uid, post.post_id).unwrap());
        assert_eq!(storage.like_count(post.post_id).unwrap(), 0);
    }

    #[test]
    fn test_double_like_is_a_conflict() {
        let mut storage = test_storage();
        let uid = storage.insert_user(&test_user("alice")).unwrap();
        let post = storage.create_post(uid, &test_draft("a.jpg"), 1000).unwrap();

        let like = Like {
            user_id: uid,
            post_id: post.post_id,
            created_at: 1001,
        };
        storage.insert_like(&like).unwrap();
        let err = storage.insert_like(&like).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_follow_and_unfollow_counts() {
        let mut storage = test_storage();
        let alice = storage.insert_user(&test_user("alice")).unwrap();
        let bob = storage.insert_user(&test_user("bob")).unwrap();

        storage.follow_user(alice, bob, 1000).unwrap();
        assert!(storage.is_following(alice, bob).unwrap());
        assert!(!storage.is_following(bob, alice).unwrap());
        assert_eq!(storage.get_user(bob).unwrap().unwrap().followers_count, 1);

        // Duplicate edge is rejected, count untouched.
        let err = storage.follow_user(alice, bob, 1001).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(storage.get_user(bob).unwrap().unwrap().followers_count, 1);

        storage.unfollow_user(alice, bob).unwrap();
        assert!(!storage.is_following(alice, bob).unwrap());
        assert_eq!(storage.get_user(bob).unwrap().unwrap().followers_count, 0);

        // Unfollowing again reports the missing edge.
        let err = storage.unfollow_user(alice, bob).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_followers_count_clamps_at_zero() {
        let mut storage = test_storage();
        let alice = storage.insert_user(&test_user("alice")).unwrap();
        let bob = storage.insert_user(&test_user("bob")).unwrap();

        // Edge inserted without the counter bump, so the stored count is
        // already zero when the unfollow decrements.
        storage
            .insert_follow(&Follow {
                follower_id: alice,
                followed_id: bob,
                created_at: 1000,
            })
            .unwrap();
        storage.unfollow_user(alice, bob).unwrap();
        assert_eq!(storage.get_user(bob).unwrap().unwrap().followers_count, 0);
    }

    #[test]
    fn test_self_follow_is_accepted() {
        // Nothing in the model rejects a user following themself; this pins
        // the observed behavior rather than an assumed-intended one.
        let mut storage = test_storage();
        let alice = storage.insert_user(&test_user("alice")).unwrap();
        storage.follow_user(alice, alice, 1000).unwrap();
        assert!(storage.is_following(alice, alice).unwrap());
        assert_eq!(storage.get_user(alice).unwrap().unwrap().followers_count, 1);
    }

    #[test]
    fn test_deleting_user_cascades() {
        let mut storage = test_storage();
        let alice = storage.insert_user(&test_user("alice")).unwrap();
        let bob = storage.insert_user(&test_user("bob")).unwrap();

        let post = storage.create_post(alice, &test_draft("a.jpg"), 1000).unwrap();
        storage.comment_post(alice, post.post_id, "note to self", 1001).unwrap();
        storage.toggle_like(alice, post.post_id, 1002).unwrap();
        storage.follow_user(bob, alice, 1003).unwrap();
        storage.follow_user(alice, bob, 1004).unwrap();

        storage.delete_user(alice).unwrap();

        assert!(storage.get_post(alice, post.post_id).unwrap().is_none());
        assert!(storage.list_posts_by_user(alice).unwrap().is_empty());
        assert!(storage.list_comments_for_post(post.post_id).unwrap().is_empty());
        assert!(storage.list_likes_for_post(post.post_id).unwrap().is_empty());
        assert!(!storage.is_following(bob, alice).unwrap());
        assert!(!storage.is_following(alice, bob).unwrap());
        assert!(storage.get_follow(alice, bob).unwrap().is_none());
    }

    #[test]
    fn test_deleting_post_cascades() {
        let mut storage = test_storage();
        let alice = storage.insert_user(&test_user("alice")).unwrap();
        let post = storage.create_post(alice, &test_draft("a.jpg"), 1000).unwrap();
        storage.comment_post(alice, post.post_id, "first", 1001).unwrap();
        storage.toggle_like(alice, post.post_id, 1002).unwrap();

        storage.delete_post(alice, post.post_id).unwrap();
        assert!(storage.list_comments_for_post(post.post_id).unwrap().is_empty());
        assert_eq!(storage.like_count(post.post_id).unwrap(), 0);
        // The owner row survives.
        assert!(storage.get_user(alice).unwrap().is_some());
    }

    #[test]
    fn test_insert_then_list_contains_record() {
        let mut storage = test_storage();
        let uid = storage.insert_user(&test_user("alice")).unwrap();
        let post = Post {
            uid,
            post_id: 7,
            image_path: "ramen.jpg".to_string(),
            description: Some("late night ramen".to_string()),
            recipe: Some("boil, assemble".to_string()),
            ingredients: Some("noodles, broth, egg".to_string()),
            created_at: 1000,
            comment_count: 0,
            latitude: 35.68,
            longitude: 139.69,
        };
        storage.insert_post(&post).unwrap();
        assert!(storage.list_posts().unwrap().contains(&post));
    }
}
