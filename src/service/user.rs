//! User service
//!
//! Handles signup, login, profile lookups and follow relationships.
//! Follow edges are stored on both users (`following` on the follower,
//! `followers` on the followee) and every change updates both sides in
//! the same write.

use std::sync::Arc;

use crate::auth::Identity;
use crate::auth::password::{MIN_PASSWORD_CHARS, hash_password, verify_password};
use crate::config::FeedConfig;
use crate::data::{JsonStore, MAX_BIO_CHARS, User, new_id};
use crate::error::AppError;
use crate::metrics::{FOLLOWS_TOTAL, USERS_TOTAL};

/// Signup form
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// A follow edge present on one side only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsymmetricEdge {
    pub follower: String,
    pub followee: String,
}

fn case_insensitive_contains(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn current_user_not_found() -> AppError {
    AppError::NotFound("Current user not found".to_string())
}

/// User service
pub struct UserService {
    users: Arc<JsonStore<User>>,
    feed: FeedConfig,
}

impl UserService {
    /// Create new user service
    pub fn new(users: Arc<JsonStore<User>>, feed: FeedConfig) -> Self {
        Self { users, feed }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Register a new account
    ///
    /// Email is trimmed and lowercased, username trimmed. Both must be
    /// unique across the collection.
    pub async fn signup(&self, form: NewUser) -> Result<User, AppError> {
        let email = form.email.trim().to_lowercase();
        let username = form.username.trim().to_string();

        if email.is_empty() || username.is_empty() || form.password.is_empty() {
            return Err(AppError::Validation(
                "Email, username and password are required".to_string(),
            ));
        }
        if form.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }

        // Fast-path duplicate check before the expensive hash.
        self.users
            .read(|users| ensure_unique(&users, &email, &username))
            .await??;

        let password = form.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;

        let user = User::new(email, username, password_hash);
        let created = user.clone();
        let total = self
            .users
            .mutate(move |users| {
                ensure_unique(users, &user.email, &user.username)?;
                users.push(user);
                Ok(users.len())
            })
            .await?;

        USERS_TOTAL.set(total as i64);
        tracing::info!(email = %created.email, username = %created.username, "User created");
        Ok(created)
    }

    /// Check credentials and return the matching user
    ///
    /// Unknown email and wrong password produce the same error. Stored
    /// emails are matched ignoring case, since older records kept
    /// whatever case they were entered with.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());
        let user = self
            .users
            .read(|users| {
                users
                    .into_iter()
                    .find(|u| u.email.eq_ignore_ascii_case(&email))
            })
            .await?
            .ok_or_else(invalid)?;

        let password = password.to_string();
        let stored_hash = user.password.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        if !matches {
            return Err(invalid());
        }

        tracing::info!(email = %user.email, "User logged in");
        Ok(user)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Everyone except the caller, capped at the directory limit
    pub async fn list_others(&self, caller: &Identity) -> Result<Vec<User>, AppError> {
        let limit = self.feed.user_list_limit;
        self.users
            .read(|users| {
                users
                    .into_iter()
                    .filter(|u| u.email != caller.email && !u.username.is_empty())
                    .take(limit)
                    .collect()
            })
            .await
    }

    /// Case-insensitive substring match on username or email
    pub async fn search(&self, query: &str) -> Result<Vec<User>, AppError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.feed.user_search_limit;
        self.users
            .read(|users| {
                users
                    .into_iter()
                    .filter(|u| {
                        !u.username.is_empty()
                            && (case_insensitive_contains(&u.username, &needle)
                                || case_insensitive_contains(&u.email, &needle))
                    })
                    .take(limit)
                    .collect()
            })
            .await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User, AppError> {
        self.users
            .read(|users| users.into_iter().find(|u| u.username == username))
            .await?
            .ok_or_else(AppError::user_not_found)
    }

    /// The caller's own record
    pub async fn current(&self, caller: &Identity) -> Result<User, AppError> {
        self.users
            .read(|users| users.into_iter().find(|u| u.email == caller.email))
            .await?
            .ok_or_else(AppError::user_not_found)
    }

    /// Replace the caller's bio
    pub async fn update_bio(&self, caller: &Identity, bio: &str) -> Result<User, AppError> {
        let bio = bio.trim().to_string();
        if bio.chars().count() > MAX_BIO_CHARS {
            return Err(AppError::Validation(format!(
                "Bio must be at most {} characters",
                MAX_BIO_CHARS
            )));
        }

        self.users
            .mutate(|users| {
                let user = users
                    .iter_mut()
                    .find(|u| u.email == caller.email)
                    .ok_or_else(AppError::user_not_found)?;
                user.bio = bio;
                Ok(user.clone())
            })
            .await
    }

    // =========================================================================
    // Relationships
    // =========================================================================

    /// Follow `username`
    ///
    /// Rejects self-follow, and rejects a duplicate only when both sides
    /// already record the edge. A one-sided edge is completed instead.
    pub async fn follow(&self, caller: &Identity, username: &str) -> Result<(), AppError> {
        let (follower, followee) = self
            .users
            .mutate(|users| {
                let (caller_idx, target_idx) = locate_pair(users, caller, username)?;
                if caller_idx == target_idx {
                    return Err(AppError::Validation(
                        "You cannot follow yourself".to_string(),
                    ));
                }

                let target_email = users[target_idx].email.clone();
                let caller_email = users[caller_idx].email.clone();
                let following = users[caller_idx].is_following(&target_email);
                let followed = users[target_idx].has_follower(&caller_email);
                if following && followed {
                    return Err(AppError::Validation(
                        "Already following this user".to_string(),
                    ));
                }

                if !following {
                    users[caller_idx].following.push(target_email);
                }
                if !followed {
                    users[target_idx].followers.push(caller_email);
                }

                Ok((
                    users[caller_idx].username.clone(),
                    users[target_idx].username.clone(),
                ))
            })
            .await?;

        FOLLOWS_TOTAL.with_label_values(&["follow"]).inc();
        tracing::info!(%follower, %followee, "User followed");
        Ok(())
    }

    /// Unfollow `username`
    ///
    /// Removes both edges; succeeds even when no edge exists.
    pub async fn unfollow(&self, caller: &Identity, username: &str) -> Result<(), AppError> {
        let (follower, followee) = self
            .users
            .mutate(|users| {
                let (caller_idx, target_idx) = locate_pair(users, caller, username)?;

                let target_email = users[target_idx].email.clone();
                let caller_email = users[caller_idx].email.clone();
                users[caller_idx].following.retain(|e| *e != target_email);
                users[target_idx].followers.retain(|e| *e != caller_email);

                Ok((
                    users[caller_idx].username.clone(),
                    users[target_idx].username.clone(),
                ))
            })
            .await?;

        FOLLOWS_TOTAL.with_label_values(&["unfollow"]).inc();
        tracing::info!(%follower, %followee, "User unfollowed");
        Ok(())
    }

    /// Find follow edges recorded on one side only
    ///
    /// Edges pointing at unknown emails are ignored. Each finding is
    /// logged as a warning; follow and unfollow repair them on next use.
    pub async fn find_asymmetric_edges(&self) -> Result<Vec<AsymmetricEdge>, AppError> {
        let edges = self
            .users
            .read(|users| {
                let by_email = |email: &str| users.iter().find(|u| u.email == email);
                let mut found = Vec::new();

                for user in &users {
                    for followee in &user.following {
                        if let Some(other) = by_email(followee) {
                            if !other.has_follower(&user.email) {
                                found.push(AsymmetricEdge {
                                    follower: user.email.clone(),
                                    followee: other.email.clone(),
                                });
                            }
                        }
                    }
                    for follower in &user.followers {
                        if let Some(other) = by_email(follower) {
                            if !other.is_following(&user.email) {
                                found.push(AsymmetricEdge {
                                    follower: other.email.clone(),
                                    followee: user.email.clone(),
                                });
                            }
                        }
                    }
                }

                found
            })
            .await?;

        for edge in &edges {
            tracing::warn!(
                follower = %edge.follower,
                followee = %edge.followee,
                "Follow edge is recorded on one side only"
            );
        }

        Ok(edges)
    }

    pub async fn count(&self) -> Result<usize, AppError> {
        self.users.read(|users| users.len()).await
    }

    /// Persist an id for every user stored without one
    pub async fn assign_missing_ids(&self) -> Result<usize, AppError> {
        let missing = self
            .users
            .read(|users| users.iter().any(|u| u.id.is_empty()))
            .await?;
        if !missing {
            return Ok(0);
        }

        let assigned = self
            .users
            .mutate(|users| {
                let mut assigned = 0;
                for user in users.iter_mut().filter(|u| u.id.is_empty()) {
                    user.id = new_id();
                    assigned += 1;
                }
                Ok(assigned)
            })
            .await?;

        tracing::info!(users = assigned, "Assigned ids to legacy users");
        Ok(assigned)
    }
}

fn ensure_unique(users: &[User], email: &str, username: &str) -> Result<(), AppError> {
    if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
        return Err(AppError::Validation("Email already exists".to_string()));
    }
    if users.iter().any(|u| u.username == username) {
        return Err(AppError::Validation("Username already taken".to_string()));
    }
    Ok(())
}

/// Indices of (caller, target); target lookup failure wins over caller's
fn locate_pair(
    users: &[User],
    caller: &Identity,
    target_username: &str,
) -> Result<(usize, usize), AppError> {
    let target_idx = users
        .iter()
        .position(|u| u.username == target_username)
        .ok_or_else(AppError::user_not_found)?;
    let caller_idx = users
        .iter()
        .position(|u| u.email == caller.email)
        .ok_or_else(current_user_not_found)?;
    Ok((caller_idx, target_idx))
}
