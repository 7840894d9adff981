//! Post service
//!
//! Handles post operations including create, delete, like, comment
//! and share. Every mutation is one load-modify-write cycle on the posts
//! collection; newest posts are kept at the front.

use std::sync::Arc;

use crate::auth::Identity;
use crate::config::FeedConfig;
use crate::data::{Comment, JsonStore, Post, SharedFrom, new_id};
use crate::error::AppError;
use crate::metrics::{LIKES_TOTAL, POSTS_TOTAL};
use crate::storage::{MediaStorage, MediaUpload};

/// Result of toggling a like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes_count: usize,
}

fn required_text(text: &str, what: &str) -> Result<String, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} text is required", what)));
    }
    Ok(trimmed.to_string())
}

fn comment_not_found() -> AppError {
    AppError::NotFound("Comment not found".to_string())
}

fn find_post<'a>(posts: &'a mut [Post], id: &str) -> Result<&'a mut Post, AppError> {
    posts
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(AppError::post_not_found)
}

/// Post service
pub struct PostService {
    posts: Arc<JsonStore<Post>>,
    media: Arc<MediaStorage>,
    feed: FeedConfig,
}

impl PostService {
    /// Create new post service
    pub fn new(posts: Arc<JsonStore<Post>>, media: Arc<MediaStorage>, feed: FeedConfig) -> Self {
        Self { posts, media, feed }
    }

    // =========================================================================
    // CRUD Operations
    // =========================================================================

    /// Create a new post
    ///
    /// Text is required. Media, when present, is stored before the post is
    /// written and removed again if that write fails.
    pub async fn create(
        &self,
        author: &Identity,
        text: &str,
        media: Option<MediaUpload>,
    ) -> Result<Post, AppError> {
        let text = required_text(text, "Post")?;

        let stored = match media {
            Some(upload) => Some(self.media.store(upload).await?),
            None => None,
        };

        let post = Post {
            id: new_id(),
            text,
            user: author.email.clone(),
            username: author.username.clone(),
            media_url: stored.as_ref().map(|m| m.url.clone()),
            media_type: stored.as_ref().map(|m| m.media_type),
            likes: Vec::new(),
            date: chrono::Utc::now(),
            comments: Vec::new(),
            shared_from: None,
        };

        let record = post.clone();
        let written = self
            .posts
            .mutate(move |posts| {
                posts.insert(0, record);
                Ok(posts.len())
            })
            .await;

        let total = match written {
            Ok(total) => total,
            Err(error) => {
                if let Some(url) = &post.media_url {
                    if let Err(cleanup_error) = self.media.delete(url).await {
                        tracing::warn!(
                            %url,
                            error = %cleanup_error,
                            "failed to rollback stored media after post write error"
                        );
                    }
                }
                return Err(error);
            }
        };

        POSTS_TOTAL.set(total as i64);
        tracing::info!(post_id = %post.id, author = %author.email, "Post created");
        Ok(post)
    }

    /// Feed, newest first, capped at the page size
    pub async fn list(&self) -> Result<Vec<Post>, AppError> {
        let limit = self.feed.page_size;
        self.posts
            .read(|posts| posts.into_iter().take(limit).collect())
            .await
    }

    /// Get post by ID
    pub async fn get(&self, id: &str) -> Result<Post, AppError> {
        self.posts
            .read(|posts| posts.into_iter().find(|p| p.id == id))
            .await?
            .ok_or_else(AppError::post_not_found)
    }

    /// Case-insensitive substring search on post text
    pub async fn search(&self, query: &str) -> Result<Vec<Post>, AppError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.feed.post_search_limit;
        self.posts
            .read(|posts| {
                posts
                    .into_iter()
                    .filter(|p| p.text.to_lowercase().contains(&needle))
                    .take(limit)
                    .collect()
            })
            .await
    }

    /// Delete a post written by the caller
    ///
    /// The media file is removed unless another post (a share) still
    /// points at it.
    pub async fn delete(&self, caller: &Identity, id: &str) -> Result<(), AppError> {
        let (removed, total, media_still_used) = self
            .posts
            .mutate(|posts| {
                let index = posts
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(AppError::post_not_found)?;
                if !posts[index].is_authored_by(&caller.email) {
                    return Err(AppError::Forbidden(
                        "You can only delete your own posts".to_string(),
                    ));
                }

                let removed = posts.remove(index);
                let media_still_used = removed
                    .media_url
                    .as_ref()
                    .is_some_and(|url| posts.iter().any(|p| p.media_url.as_ref() == Some(url)));
                Ok((removed, posts.len(), media_still_used))
            })
            .await?;

        POSTS_TOTAL.set(total as i64);
        tracing::info!(post_id = %removed.id, author = %caller.email, "Post deleted");

        if let Some(url) = removed.media_url.filter(|_| !media_still_used) {
            if let Err(error) = self.media.delete(&url).await {
                tracing::warn!(%url, %error, "failed to delete media of removed post");
            }
        }

        Ok(())
    }

    // =========================================================================
    // Interactions
    // =========================================================================

    /// Like the post, or unlike it if the caller already liked it
    pub async fn toggle_like(&self, caller: &Identity, id: &str) -> Result<LikeOutcome, AppError> {
        let outcome = self
            .posts
            .mutate(|posts| {
                let post = find_post(posts, id)?;
                let liked = if post.is_liked_by(&caller.email) {
                    post.likes.retain(|e| *e != caller.email);
                    false
                } else {
                    post.likes.push(caller.email.clone());
                    true
                };
                Ok(LikeOutcome {
                    liked,
                    likes_count: post.likes.len(),
                })
            })
            .await?;

        let action = if outcome.liked { "like" } else { "unlike" };
        LIKES_TOTAL.with_label_values(&[action]).inc();
        tracing::info!(post_id = %id, user = %caller.email, action, "Like toggled");
        Ok(outcome)
    }

    /// Append a comment and return the updated post
    pub async fn add_comment(
        &self,
        caller: &Identity,
        id: &str,
        text: &str,
    ) -> Result<Post, AppError> {
        let text = required_text(text, "Comment")?;
        let comment = Comment::new(text, caller.email.clone(), caller.username.clone());

        let post = self
            .posts
            .mutate(move |posts| {
                let post = find_post(posts, id)?;
                post.comments.push(comment);
                Ok(post.clone())
            })
            .await?;

        tracing::info!(post_id = %id, user = %caller.email, "Comment added");
        Ok(post)
    }

    /// Delete the comment at `index` and return the updated post
    ///
    /// Later comments shift down by one; prefer [`PostService::delete_comment`]
    /// when the comment id is known.
    pub async fn delete_comment_at(
        &self,
        caller: &Identity,
        id: &str,
        index: usize,
    ) -> Result<Post, AppError> {
        self.remove_comment(caller, id, |comments| {
            (index < comments.len()).then_some(index)
        })
        .await
    }

    /// Delete the comment with `comment_id` and return the updated post
    pub async fn delete_comment(
        &self,
        caller: &Identity,
        id: &str,
        comment_id: &str,
    ) -> Result<Post, AppError> {
        self.remove_comment(caller, id, |comments| {
            comments.iter().position(|c| c.id == comment_id)
        })
        .await
    }

    async fn remove_comment(
        &self,
        caller: &Identity,
        id: &str,
        locate: impl FnOnce(&[Comment]) -> Option<usize>,
    ) -> Result<Post, AppError> {
        let post = self
            .posts
            .mutate(|posts| {
                let post = find_post(posts, id)?;
                let index = locate(post.comments.as_slice()).ok_or_else(comment_not_found)?;
                if post.comments[index].user != caller.email {
                    return Err(AppError::Forbidden(
                        "You can only delete your own comments".to_string(),
                    ));
                }
                post.comments.remove(index);
                Ok(post.clone())
            })
            .await?;

        tracing::info!(post_id = %id, user = %caller.email, "Comment deleted");
        Ok(post)
    }

    /// Re-post another post under the caller's name
    ///
    /// The copy shares the original's media, starts with no likes or
    /// comments, and points back at its source.
    pub async fn share(&self, caller: &Identity, id: &str) -> Result<Post, AppError> {
        let (shared, total) = self
            .posts
            .mutate(|posts| {
                let source = posts
                    .iter()
                    .find(|p| p.id == id)
                    .ok_or_else(AppError::post_not_found)?;

                let shared = Post {
                    id: new_id(),
                    text: format!("🔄 @{} shared: {}", caller.username, source.text),
                    user: caller.email.clone(),
                    username: caller.username.clone(),
                    media_url: source.media_url.clone(),
                    media_type: source.media_type,
                    likes: Vec::new(),
                    date: chrono::Utc::now(),
                    comments: Vec::new(),
                    shared_from: Some(SharedFrom {
                        username: source.username.clone(),
                        post_id: source.id.clone(),
                    }),
                };

                posts.insert(0, shared.clone());
                Ok((shared, posts.len()))
            })
            .await?;

        POSTS_TOTAL.set(total as i64);
        tracing::info!(post_id = %shared.id, source = %id, user = %caller.email, "Post shared");
        Ok(shared)
    }

    pub async fn count(&self) -> Result<usize, AppError> {
        self.posts.read(|posts| posts.len()).await
    }

    /// Give every comment stored without an id a persistent one
    ///
    /// Returns how many comments were updated; the collection is only
    /// rewritten when that is non-zero.
    pub async fn assign_missing_comment_ids(&self) -> Result<usize, AppError> {
        let missing = self
            .posts
            .read(|posts| {
                posts
                    .iter()
                    .flat_map(|p| &p.comments)
                    .any(|c| c.id.is_empty())
            })
            .await?;
        if !missing {
            return Ok(0);
        }

        let assigned = self
            .posts
            .mutate(|posts| {
                let mut assigned = 0;
                for comment in posts.iter_mut().flat_map(|p| p.comments.iter_mut()) {
                    if comment.id.is_empty() {
                        comment.id = new_id();
                        assigned += 1;
                    }
                }
                Ok(assigned)
            })
            .await?;

        tracing::info!(comments = assigned, "Assigned ids to legacy comments");
        Ok(assigned)
    }
}
