//! Request and response DTOs
//!
//! Field names are camelCase on the wire, matching the stored records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Post, User};
use crate::service::LikeOutcome;

// =============================================================================
// Auth
// =============================================================================

/// POST /auth/signup body
///
/// Missing fields deserialize as empty strings so that the service can
/// answer with its own validation message.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub message: String,
    pub email: String,
    pub username: String,
}

/// POST /auth/login body
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub username: String,
}

// =============================================================================
// Users
// =============================================================================

/// A user as seen by clients; never carries the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub bio: String,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            bio: user.bio,
            followers: user.followers,
            following: user.following,
            created_at: user.created_at,
        }
    }
}

/// Result of follow / unfollow
#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub message: String,
    pub following: bool,
}

/// PATCH /users/me body
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
}

// =============================================================================
// Posts
// =============================================================================

/// JSON body of POST /posts (the multipart form carries the same field)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreatePostRequest {
    pub text: String,
}

/// POST /posts/:id/comment body
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: usize,
}

impl From<LikeOutcome> for LikeResponse {
    fn from(outcome: LikeOutcome) -> Self {
        Self {
            liked: outcome.liked,
            likes_count: outcome.likes_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareResponse {
    pub message: String,
    pub post: Post,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
