//! Use-case controllers.
//!
//! Controllers compose the entity handlers and the shared session into the
//! operations the presentation layer calls: log in, create a post, follow a
//! user.  Everything they need is injected at construction; nothing here
//! reaches for a global.

pub mod auth;
pub mod posts;
pub mod users;

pub use auth::{AuthController, LoginResult, RegisterResult};
pub use posts::PostController;
pub use users::UserController;
