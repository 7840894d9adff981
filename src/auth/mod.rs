//! Authentication
//!
//! Handles:
//! - Signup and login endpoints
//! - Signed bearer tokens
//! - Password hashing
//! - Authentication extractor

mod credentials;
mod middleware;
pub mod password;
pub mod token;

pub use credentials::auth_router;
pub use middleware::CurrentUser;
pub use token::{Identity, issue_token, verify_token};
