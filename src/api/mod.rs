//! API layer
//!
//! HTTP handlers for:
//! - Posts, comments, likes and shares
//! - User directory, profiles and follows
//! - Metrics (Prometheus)

mod dto;
mod extract;
pub mod metrics;
mod posts;
mod users;

pub use dto::*;
pub use extract::JsonBody;

pub use metrics::metrics_router;
pub use posts::{PostForm, posts_router};
pub use users::users_router;
