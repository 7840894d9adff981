//! Data models
//!
//! Rust structs representing the records held in the flat JSON files.
//! Field names follow the on-disk camelCase layout so existing
//! `users.json` / `posts.json` files load unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bio given to every new account.
pub const DEFAULT_BIO: &str = "Hey there! I'm using Micro Social 👋";

/// Maximum bio length in characters.
pub const MAX_BIO_CHARS: usize = 150;

// =============================================================================
// IDs
// =============================================================================

/// Generate a record id (ULID, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

// =============================================================================
// User
// =============================================================================

/// A registered account
///
/// `password` holds an Argon2 PHC hash and must never be serialized
/// to clients; use [`crate::api::UserResponse`] for that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Empty for records written before users carried ids
    #[serde(default)]
    pub id: String,
    pub email: String,
    pub username: String,
    /// Password hash
    pub password: String,
    #[serde(default = "default_bio")]
    pub bio: String,
    /// Emails of users following this account
    #[serde(default)]
    pub followers: Vec<String>,
    /// Emails of users this account follows
    #[serde(default)]
    pub following: Vec<String>,
    pub created_at: DateTime<Utc>,
}

fn default_bio() -> String {
    DEFAULT_BIO.to_string()
}

impl User {
    pub fn new(email: String, username: String, password_hash: String) -> Self {
        Self {
            id: new_id(),
            email,
            username,
            password: password_hash,
            bio: default_bio(),
            followers: Vec::new(),
            following: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_following(&self, email: &str) -> bool {
        self.following.iter().any(|e| e == email)
    }

    pub fn has_follower(&self, email: &str) -> bool {
        self.followers.iter().any(|e| e == email)
    }
}

// =============================================================================
// Post
// =============================================================================

/// Kind of media attached to a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Classify a MIME type; anything other than image/* or video/* is rejected.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        if content_type.starts_with("image/") {
            Some(Self::Image)
        } else if content_type.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Back-reference from a shared post to its source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFrom {
    pub username: String,
    pub post_id: String,
}

/// A post in the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    /// Author email
    pub user: String,
    /// Author username
    pub username: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    /// Emails of users who liked the post
    #[serde(default)]
    pub likes: Vec<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_from: Option<SharedFrom>,
}

impl Post {
    pub fn is_authored_by(&self, email: &str) -> bool {
        self.user == email
    }

    pub fn is_liked_by(&self, email: &str) -> bool {
        self.likes.iter().any(|e| e == email)
    }
}

/// A comment embedded in its parent post
///
/// Records written before comments carried ids load with an empty `id`;
/// startup assigns and persists one (see
/// [`crate::service::PostService::assign_missing_comment_ids`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    pub text: String,
    /// Author email
    pub user: String,
    /// Author username
    pub username: String,
    pub date: DateTime<Utc>,
}

impl Comment {
    pub fn new(text: String, user: String, username: String) -> Self {
        Self {
            id: new_id(),
            text,
            user,
            username,
            date: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_serializes_with_on_disk_field_names() {
        let post = Post {
            id: "p1".to_string(),
            text: "hello world".to_string(),
            user: "a@example.com".to_string(),
            username: "alice".to_string(),
            media_url: None,
            media_type: None,
            likes: vec![],
            date: Utc::now(),
            comments: vec![],
            shared_from: None,
        };

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["_id"], "p1");
        assert!(json["mediaUrl"].is_null());
        assert!(json["mediaType"].is_null());
        assert_eq!(json["likes"], serde_json::json!([]));
        assert_eq!(json["comments"], serde_json::json!([]));
        assert!(json.get("sharedFrom").is_none());
    }

    #[test]
    fn legacy_records_load_with_defaults() {
        let raw = serde_json::json!([{
            "_id": "1700000000000",
            "text": "old post",
            "user": "a@example.com",
            "username": "alice",
            "date": "2024-01-01T00:00:00.000Z",
            "comments": [{
                "text": "nice",
                "user": "b@example.com",
                "username": "bob",
                "date": "2024-01-01T00:01:00.000Z"
            }]
        }]);

        let posts: Vec<Post> = serde_json::from_value(raw).unwrap();
        assert_eq!(posts[0].likes.len(), 0);
        assert!(posts[0].media_type.is_none());
        assert!(posts[0].comments[0].id.is_empty());
    }

    #[test]
    fn new_ids_are_distinct_ulids() {
        let first = new_id();
        let second = new_id();
        assert_eq!(first.len(), 26);
        assert!(ulid::Ulid::from_string(&first).is_ok());
        assert_ne!(first, second);
    }

    #[test]
    fn media_type_from_content_type() {
        assert_eq!(
            MediaType::from_content_type("image/png"),
            Some(MediaType::Image)
        );
        assert_eq!(
            MediaType::from_content_type("video/mp4"),
            Some(MediaType::Video)
        );
        assert_eq!(MediaType::from_content_type("text/plain"), None);
    }
}
