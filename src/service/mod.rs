//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate the JSON stores and media storage.

mod post;
mod user;

pub use post::{LikeOutcome, PostService};
pub use user::{AsymmetricEdge, NewUser, UserService};
