//! Post creation, the feed, comments, and likes.

use crate::entities::{Comment, NewPost, Post};
use crate::handlers::{CommentHandler, LikeHandler, PostHandler};
use crate::session::SharedSession;
use crate::store::StoreError;
use crate::worker::DataError;

#[derive(Clone)]
pub struct PostController {
    posts: PostHandler,
    likes: LikeHandler,
    comments: CommentHandler,
    users: super::UserController,
    session: SharedSession,
}

impl PostController {
    pub fn new(
        posts: PostHandler,
        likes: LikeHandler,
        comments: CommentHandler,
        users: super::UserController,
        session: SharedSession,
    ) -> Self {
        Self {
            posts,
            likes,
            comments,
            users,
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

    /// Publish a post for the current user.  The sequential post id and the
    /// owner's post-count bump are handled by the store in one transaction.
    pub fn create_post(&self, draft: &NewPost) -> Result<Post, DataError> {
        let uid = self.current_uid()?;
        let post = self.posts.create(uid, draft)?;
        // Keep the session's cached user (and its posts_count) current.
        if let Ok(Some(user)) = self.users.get_user(uid) {
            self.session.lock().unwrap().refresh(&user);
        }
        Ok(post)
    }

    /// One of the current user's posts.
    pub fn get_post(&self, post_id: i64) -> Result<Option<Post>, DataError> {
        let uid = self.current_uid()?;
        self.posts.get_by_id(uid, post_id)
    }

    pub fn get_post_by_id(&self, uid: i64, post_id: i64) -> Result<Option<Post>, DataError> {
        self.posts.get_by_id(uid, post_id)
    }

    pub fn posts_from_user(&self, uid: i64) -> Result<Vec<Post>, DataError> {
        self.posts.get_by_user(uid)
    }

    /// The feed: every post, newest first.
    pub fn all_posts(&self) -> Result<Vec<Post>, DataError> {
        self.posts.get_all()
    }

    pub fn update_post(&self, post: &Post) -> Result<(), DataError> {
        self.posts.update(post)
    }

    pub fn delete_post(&self, post: &Post) -> Result<(), DataError> {
        self.posts.delete(post)
    }

    /// Like the post if not yet liked, unlike it otherwise.  Returns the end
    /// state: `true` when the post is now liked.
    pub fn toggle_like(&self, post_id: i64) -> Result<bool, DataError> {
        let uid = self.current_uid()?;
        if self.posts.get_by_id(uid, post_id)?.is_none() {
            return Err(DataError::Store(StoreError::NotFound(format!(
                "post {uid}/{post_id}"
            ))));
        }
        self.likes.toggle_like(uid, post_id)
    }

    /// Whether the current user has liked this post of theirs.
    pub fn is_liked(&self, post_id: i64) -> Result<bool, DataError> {
        let uid = self.current_uid()?;
        match self.posts.get_by_id(uid, post_id)? {
            Some(_) => self.likes.is_liked_by_user(uid, post_id),
            None => Ok(false),
        }
    }

    pub fn like_count(&self, post_id: i64) -> Result<u32, DataError> {
        self.likes.like_count(post_id)
    }

    /// Comment on a post of the current user.  The comment row and the
    /// post's comment count commit together, so the two cannot drift apart.
    pub fn comment(&self, post_id: i64, text: &str) -> Result<Comment, DataError> {
        let uid = self.current_uid()?;
        self.comments.comment_post(uid, post_id, text)
    }

    pub fn comments_for(&self, post_id: i64) -> Result<Vec<Comment>, DataError> {
        self.comments.get_by_post(post_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
