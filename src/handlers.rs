//! Per-entity data-access handlers.
//!
//! Each handler is a thin facade over the shared [`StoreHandle`] with the
//! same narrow contract: validate input first (invalid input never reaches
//! the store), ship the operation to the store worker, and report every
//! failure through [`DataError`].  Callers on a UI thread block at most
//! [`crate::worker::STORE_TIMEOUT`] per call.

use crate::entities::{Comment, Follow, Like, NewPost, Post, User};
use crate::fflog;
use crate::logging;
use crate::store::now_secs;
use crate::worker::{DataError, StoreHandle};

fn check_id(id: i64, what: &str) -> Result<(), DataError> {
    if id <= 0 {
        fflog!("{what} must be positive, got {id}");
        return Err(DataError::Invalid(format!("{what} must be positive")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct UserHandler {
    store: StoreHandle,
}

impl UserHandler {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Insert a new user and return the generated uid.
    pub fn insert(&self, user: &User) -> Result<i64, DataError> {
        user.validate().map_err(DataError::Invalid)?;
        let user = user.clone();
        let username = user.username.clone();
        let result = self.store.call(move |s| s.insert_user(&user));
        match &result {
            Ok(uid) => fflog!("users: inserted {} ({username})", logging::user_tag(*uid)),
            Err(e) => fflog!("users: insert failed for {username}: {e}"),
        }
        result
    }

    pub fn get_all(&self) -> Result<Vec<User>, DataError> {
        self.store.call(|s| s.list_users())
    }

    pub fn update(&self, user: &User) -> Result<(), DataError> {
        user.validate().map_err(DataError::Invalid)?;
        check_id(user.uid, "user id")?;
        let user = user.clone();
        self.store.call(move |s| s.update_user(&user))
    }

    pub fn delete(&self, user: &User) -> Result<(), DataError> {
        check_id(user.uid, "user id")?;
        let uid = user.uid;
        let result = self.store.call(move |s| s.delete_user(uid));
        if result.is_ok() {
            fflog!("users: deleted {}", logging::user_tag(uid));
        }
        result
    }

    pub fn get_by_id(&self, uid: i64) -> Result<Option<User>, DataError> {
        check_id(uid, "user id")?;
        self.store.call(move |s| s.get_user(uid))
    }

    pub fn get_by_username(&self, username: &str) -> Result<Option<User>, DataError> {
        if username.is_empty() {
            return Err(DataError::Invalid("username cannot be empty".into()));
        }
        let username = username.to_string();
        self.store.call(move |s| s.get_user_by_username(&username))
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PostHandler {
    store: StoreHandle,
}

impl PostHandler {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub fn insert(&self, post: &Post) -> Result<(), DataError> {
        post.validate().map_err(DataError::Invalid)?;
        let post = post.clone();
        let tag = logging::post_tag(post.uid, post.post_id);
        let result = self.store.call(move |s| s.insert_post(&post));
        match &result {
            Ok(()) => fflog!("posts: inserted {tag}"),
            Err(e) => fflog!("posts: insert failed for {tag}: {e}"),
        }
        result
    }

    /// Create a post for `uid` with the next sequential post id, bumping the
    /// owner's post count in the same transaction.
    pub fn create(&self, uid: i64, draft: &NewPost) -> Result<Post, DataError> {
        check_id(uid, "user id")?;
        draft.validate().map_err(DataError::Invalid)?;
        let draft = draft.clone();
        let result = self
            .store
            .call(move |s| s.create_post(uid, &draft, now_secs()));
        match &result {
            Ok(post) => fflog!("posts: created {}", logging::post_tag(post.uid, post.post_id)),
            Err(e) => fflog!("posts: create failed for {}: {e}", logging::user_tag(uid)),
        }
        result
    }

    pub fn get_all(&self) -> Result<Vec<Post>, DataError> {
        self.store.call(|s| s.list_posts())
    }

    pub fn update(&self, post: &Post) -> Result<(), DataError> {
        post.validate().map_err(DataError::Invalid)?;
        let post = post.clone();
        self.store.call(move |s| s.update_post(&post))
    }

    pub fn delete(&self, post: &Post) -> Result<(), DataError> {
        check_id(post.uid, "user id")?;
        check_id(post.post_id, "post id")?;
        let (uid, post_id) = (post.uid, post.post_id);
        let result = self.store.call(move |s| s.delete_post(uid, post_id));
        if result.is_ok() {
            fflog!("posts: deleted {}", logging::post_tag(uid, post_id));
        }
        result
    }

    pub fn get_by_id(&self, uid: i64, post_id: i64) -> Result<Option<Post>, DataError> {
        check_id(uid, "user id")?;
        check_id(post_id, "post id")?;
        self.store.call(move |s| s.get_post(uid, post_id))
    }

    pub fn get_by_user(&self, uid: i64) -> Result<Vec<Post>, DataError> {
        check_id(uid, "user id")?;
        self.store.call(move |s| s.list_posts_by_user(uid))
    }

    /// Whether `user` has liked `post`.  Delegates to the like-existence
    /// query.
    pub fn is_liked_by_user(&self, post: &Post, user: &User) -> Result<bool, DataError> {
        let (user_id, post_id) = (user.uid, post.post_id);
        check_id(user_id, "user id")?;
        check_id(post_id, "post id")?;
        self.store.call(move |s| s.is_liked(user_id, post_id))
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CommentHandler {
    store: StoreHandle,
}

impl CommentHandler {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub fn insert(&self, comment: &Comment) -> Result<(), DataError> {
        comment.validate().map_err(DataError::Invalid)?;
        let comment = comment.clone();
        let result = self.store.call(move |s| s.insert_comment(&comment));
        if let Err(e) = &result {
            fflog!("comments: insert failed: {e}");
        }
        result
    }

    /// Add a comment to a post, allocating the next comment id and bumping
    /// the post's comment count in the same transaction.
    pub fn comment_post(&self, uid: i64, post_id: i64, content: &str) -> Result<Comment, DataError> {
        check_id(uid, "user id")?;
        check_id(post_id, "post id")?;
        if content.trim().is_empty() {
            return Err(DataError::Invalid("comment content cannot be empty".into()));
        }
        let content = content.to_string();
        let result = self
            .store
            .call(move |s| s.comment_post(uid, post_id, &content, now_secs()));
        match &result {
            Ok(c) => fflog!(
                "comments: {} commented on {}",
                logging::user_tag(c.uid),
                logging::post_tag(c.uid, c.post_id)
            ),
            Err(e) => fflog!("comments: comment on {} failed: {e}", logging::post_tag(uid, post_id)),
        }
        result
    }

    pub fn get_all(&self) -> Result<Vec<Comment>, DataError> {
        self.store.call(|s| s.list_comments())
    }

    pub fn update(&self, comment: &Comment) -> Result<(), DataError> {
        comment.validate().map_err(DataError::Invalid)?;
        let comment = comment.clone();
        self.store.call(move |s| s.update_comment(&comment))
    }

    pub fn delete(&self, comment: &Comment) -> Result<(), DataError> {
        check_id(comment.uid, "user id")?;
        check_id(comment.post_id, "post id")?;
        check_id(comment.comment_id, "comment id")?;
        let (uid, post_id, comment_id) = (comment.uid, comment.post_id, comment.comment_id);
        self.store
            .call(move |s| s.delete_comment(uid, post_id, comment_id))
    }

    pub fn get_by_id(
        &self,
        uid: i64,
        post_id: i64,
        comment_id: i64,
    ) -> Result<Option<Comment>, DataError> {
        check_id(uid, "user id")?;
        check_id(post_id, "post id")?;
        check_id(comment_id, "comment id")?;
        self.store
            .call(move |s| s.get_comment(uid, post_id, comment_id))
    }

    pub fn get_by_post(&self, post_id: i64) -> Result<Vec<Comment>, DataError> {
        check_id(post_id, "post id")?;
        self.store.call(move |s| s.list_comments_for_post(post_id))
    }
}

// ---------------------------------------------------------------------------
// Likes
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct LikeHandler {
    store: StoreHandle,
}

impl LikeHandler {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub fn insert(&self, like: &Like) -> Result<(), DataError> {
        like.validate().map_err(DataError::Invalid)?;
        let like = like.clone();
        let result = self.store.call(move |s| s.insert_like(&like));
        if let Err(e) = &result {
            fflog!("likes: insert failed: {e}");
        }
        result
    }

    pub fn get_all(&self) -> Result<Vec<Like>, DataError> {
        self.store.call(|s| s.list_likes())
    }

    /// Likes are relationships, not documents; there is nothing to update.
    /// Use delete + insert (or [`toggle_like`]) instead.
    ///
    /// [`toggle_like`]: LikeHandler::toggle_like
    pub fn update(&self, _like: &Like) -> Result<(), DataError> {
        fflog!("likes: update is not supported, use insert/delete");
        Err(DataError::Unsupported("like update"))
    }

    pub fn delete(&self, like: &Like) -> Result<(), DataError> {
        check_id(like.user_id, "user id")?;
        check_id(like.post_id, "post id")?;
        let (user_id, post_id) = (like.user_id, like.post_id);
        self.store.call(move |s| s.delete_like(user_id, post_id))
    }

    /// Unlike if liked, like if not.  Returns the end state: `true` when the
    /// post is now liked.
    pub fn toggle_like(&self, user_id: i64, post_id: i64) -> Result<bool, DataError> {
        check_id(user_id, "user id")?;
        check_id(post_id, "post id")?;
        let result = self
            .store
            .call(move |s| s.toggle_like(user_id, post_id, now_secs()));
        match &result {
            Ok(true) => fflog!("likes: {} liked post {post_id}", logging::user_tag(user_id)),
            Ok(false) => fflog!("likes: {} unliked post {post_id}", logging::user_tag(user_id)),
            Err(e) => fflog!("likes: toggle failed for post {post_id}: {e}"),
        }
        result
    }

    pub fn is_liked_by_user(&self, user_id: i64, post_id: i64) -> Result<bool, DataError> {
        check_id(user_id, "user id")?;
        check_id(post_id, "post id")?;
        self.store.call(move |s| s.is_liked(user_id, post_id))
    }

    pub fn like_count(&self, post_id: i64) -> Result<u32, DataError> {
        check_id(post_id, "post id")?;
        self.store.call(move |s| s.like_count(post_id))
    }

    pub fn likes_for_post(&self, post_id: i64) -> Result<Vec<Like>, DataError> {
        check_id(post_id, "post id")?;
        self.store.call(move |s| s.list_likes_for_post(post_id))
    }
}

// ---------------------------------------------------------------------------
// Follows
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct FollowHandler {
    store: StoreHandle,
}

impl FollowHandler {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub fn insert(&self, follow: &Follow) -> Result<(), DataError> {
        follow.validate().map_err(DataError::Invalid)?;
        let follow = follow.clone();
        let result = self.store.call(move |s| s.insert_follow(&follow));
        if let Err(e) = &result {
            fflog!("follows: insert failed: {e}");
        }
        result
    }

    pub fn get_all(&self) -> Result<Vec<Follow>, DataError> {
        self.store.call(|s| s.list_follows())
    }

    /// Follow edges are relationships; there is nothing to update.  Use
    /// delete + insert instead.
    pub fn update(&self, _follow: &Follow) -> Result<(), DataError> {
        fflog!("follows: update is not supported, use insert/delete");
        Err(DataError::Unsupported("follow update"))
    }

    pub fn delete(&self, follow: &Follow) -> Result<(), DataError> {
        self.unlink(follow.follower_id, follow.followed_id)
    }

    /// Delete the edge between two users by key.
    pub fn unlink(&self, follower_id: i64, followed_id: i64) -> Result<(), DataError> {
        check_id(follower_id, "follower id")?;
        check_id(followed_id, "followed id")?;
        self.store
            .call(move |s| s.delete_follow(follower_id, followed_id))
    }

    /// Insert the edge and bump the followed user's follower count in one
    /// transaction.
    pub fn follow(&self, follower_id: i64, followed_id: i64) -> Result<(), DataError> {
        check_id(follower_id, "follower id")?;
        check_id(followed_id, "followed id")?;
        let result = self
            .store
            .call(move |s| s.follow_user(follower_id, followed_id, now_secs()));
        match &result {
            Ok(()) => fflog!(
                "follows: {} -> {}",
                logging::user_tag(follower_id),
                logging::user_tag(followed_id)
            ),
            Err(e) => fflog!("follows: follow failed: {e}"),
        }
        result
    }

    /// Delete the edge and decrement the follower count (clamped at zero)
    /// in one transaction.
    pub fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<(), DataError> {
        check_id(follower_id, "follower id")?;
        check_id(followed_id, "followed id")?;
        let result = self
            .store
            .call(move |s| s.unfollow_user(follower_id, followed_id));
        if let Err(e) = &result {
            fflog!("follows: unfollow failed: {e}");
        }
        result
    }

    pub fn exists(&self, follower_id: i64, followed_id: i64) -> Result<bool, DataError> {
        check_id(follower_id, "follower id")?;
        check_id(followed_id, "followed id")?;
        self.store
            .call(move |s| s.is_following(follower_id, followed_id))
    }

    /// Edges where `uid` is the follower.
    pub fn following_of(&self, uid: i64) -> Result<Vec<Follow>, DataError> {
        check_id(uid, "user id")?;
        self.store.call(move |s| s.list_following(uid))
    }

    /// Edges where `uid` is the one being followed.
    pub fn followers_of(&self, uid: i64) -> Result<Vec<Follow>, DataError> {
        check_id(uid, "user id")?;
        self.store.call(move |s| s.list_followers(uid))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
