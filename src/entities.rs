//! Domain records for the forkfeed data layer.
//!
//! These are plain serializable structs mirroring the five tables in
//! [`crate::store`].  Field invariants (non-empty strings, positive ids,
//! coordinate ranges) are checked by `validate()` on each record; handlers
//! run validation before any store access, so an invalid record is rejected
//! with a typed error and never reaches SQLite.

use serde::{Deserialize, Serialize};

/// A registered account with its denormalized follower/post counts.
///
/// The password is stored and compared in plaintext, as the app has always
/// done.  See DESIGN.md for the security finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub uid: i64,
    pub username: String,
    pub password: String,
    pub profile_image: String,
    pub bio: Option<String>,
    pub followers_count: u32,
    pub posts_count: u32,
}

impl User {
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("username cannot be empty".into());
        }
        if self.password.is_empty() {
            return Err("password cannot be empty".into());
        }
        if self.profile_image.trim().is_empty() {
            return Err("profile image cannot be empty".into());
        }
        Ok(())
    }
}

/// A food post.  Keyed by `(uid, post_id)` where `post_id` is sequential
/// within one owner's posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub uid: i64,
    pub post_id: i64,
    pub image_path: String,
    pub description: Option<String>,
    pub recipe: Option<String>,
    pub ingredients: Option<String>,
    pub created_at: u64,
    pub comment_count: u32,
    pub latitude: f64,
    pub longitude: f64,
}

impl Post {
    pub fn validate(&self) -> Result<(), String> {
        if self.uid <= 0 {
            return Err("user id must be positive".into());
        }
        if self.post_id <= 0 {
            return Err("post id must be positive".into());
        }
        validate_post_fields(&self.image_path, self.latitude, self.longitude)?;
        if self.created_at == 0 {
            return Err("timestamp must be positive".into());
        }
        Ok(())
    }
}

/// Input record for post creation.  The store allocates the sequential
/// `post_id` and stamps `created_at`; everything else comes from the caller
/// (camera capture path, form fields, last-known GPS fix).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub image_path: String,
    pub description: Option<String>,
    pub recipe: Option<String>,
    pub ingredients: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), String> {
        validate_post_fields(&self.image_path, self.latitude, self.longitude)
    }
}

fn validate_post_fields(image_path: &str, latitude: f64, longitude: f64) -> Result<(), String> {
    if image_path.trim().is_empty() {
        return Err("image path cannot be empty".into());
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err("latitude must be between -90 and 90".into());
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err("longitude must be between -180 and 180".into());
    }
    Ok(())
}

/// A comment on a post.  Keyed by `(uid, post_id, comment_id)` with
/// `comment_id` sequential within the post; `(uid, post_id)` references the
/// commented post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub uid: i64,
    pub post_id: i64,
    pub comment_id: i64,
    pub content: String,
    pub created_at: u64,
}

impl Comment {
    pub fn validate(&self) -> Result<(), String> {
        if self.uid <= 0 {
            return Err("user id must be positive".into());
        }
        if self.post_id <= 0 {
            return Err("post id must be positive".into());
        }
        if self.comment_id <= 0 {
            return Err("comment id must be positive".into());
        }
        if self.content.trim().is_empty() {
            return Err("comment content cannot be empty".into());
        }
        if self.created_at == 0 {
            return Err("timestamp must be positive".into());
        }
        Ok(())
    }
}

/// A like edge between a user and a post.  At most one per `(user_id,
/// post_id)` pair, enforced by the composite primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: u64,
}

impl Like {
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id <= 0 {
            return Err("user id must be positive".into());
        }
        if self.post_id <= 0 {
            return Err("post id must be positive".into());
        }
        if self.created_at == 0 {
            return Err("timestamp must be positive".into());
        }
        Ok(())
    }
}

/// A follow edge between two users.  At most one per ordered pair.  Nothing
/// in the model rejects `follower_id == followed_id`; see DESIGN.md.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: i64,
    pub followed_id: i64,
    pub created_at: u64,
}

impl Follow {
    pub fn validate(&self) -> Result<(), String> {
        if self.follower_id <= 0 {
            return Err("follower id must be positive".into());
        }
        if self.followed_id <= 0 {
            return Err("followed id must be positive".into());
        }
        if self.created_at == 0 {
            return Err("timestamp must be positive".into());
        }
        Ok(())
    }
}
