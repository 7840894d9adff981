//! Post endpoints

use axum::{
    Json, Router, async_trait,
    extract::{FromRequest, Multipart, Path, Request, State, multipart::MultipartError},
    http::{StatusCode, header::CONTENT_TYPE},
    routing::{delete, get, post},
};

use super::dto::{CommentRequest, CreatePostRequest, LikeResponse, MessageResponse, ShareResponse};
use super::extract::JsonBody;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::Post;
use crate::error::AppError;
use crate::metrics::HTTP_REQUEST_DURATION_SECONDS;
use crate::service::PostService;
use crate::storage::MediaUpload;

/// Create posts router, mounted under `/posts`
pub fn posts_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/search/:query", get(search_posts))
        .route("/:id", get(get_post).delete(delete_post))
        .route("/:id/like", post(toggle_like))
        .route("/:id/comment", post(add_comment))
        .route("/:id/comment/:index", delete(delete_comment_at))
        .route("/:id/comments/:comment_id", delete(delete_comment))
        .route("/:id/share", post(share_post))
}

fn build_post_service(state: &AppState) -> PostService {
    PostService::new(
        state.posts.clone(),
        state.media.clone(),
        state.config.feed.clone(),
    )
}

// =============================================================================
// Create
// =============================================================================

/// Body of POST /posts
///
/// Accepts `multipart/form-data` with a `text` field and an optional
/// `media` file, or a JSON `{"text": ...}` body for text-only posts.
#[derive(Debug, Default)]
pub struct PostForm {
    pub text: String,
    pub media: Option<MediaUpload>,
}

#[async_trait]
impl FromRequest<AppState> for PostForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let JsonBody(body) = JsonBody::<CreatePostRequest>::from_request(req, state).await?;
            return Ok(Self {
                text: body.text,
                media: None,
            });
        }

        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        read_multipart(multipart, state.media.max_bytes()).await
    }
}

async fn read_multipart(mut multipart: Multipart, max_bytes: usize) -> Result<PostForm, AppError> {
    let mut form = PostForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to parse multipart", e))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "text" => {
                form.text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Failed to read text", e))?;
            }
            "media" => {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let file_name = field.file_name().map(str::to_string);

                let mut data = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| multipart_error("Failed to read file", e))?
                {
                    if data.len() + chunk.len() > max_bytes {
                        return Err(AppError::PayloadTooLarge(format!(
                            "File too large: exceeds {} bytes",
                            max_bytes
                        )));
                    }
                    data.extend_from_slice(&chunk);
                }

                // An empty file input is submitted as a nameless, empty part.
                if data.is_empty() && file_name.as_deref().is_none_or(str::is_empty) {
                    continue;
                }

                form.media = Some(MediaUpload {
                    data,
                    content_type,
                    file_name,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_error(context: &str, error: MultipartError) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{}: {}", context, error.body_text()))
    } else {
        AppError::Validation(format!("{}: {}", context, error.body_text()))
    }
}

/// POST /posts
async fn create_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    form: PostForm,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/posts"])
        .start_timer();

    let post = build_post_service(&state)
        .create(&identity, &form.text, form.media)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

// =============================================================================
// Read
// =============================================================================

/// GET /posts
async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/posts"])
        .start_timer();

    let posts = build_post_service(&state).list().await?;
    Ok(Json(posts))
}

/// GET /posts/search/:query
async fn search_posts(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<Vec<Post>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/posts/search/:query"])
        .start_timer();

    let posts = build_post_service(&state).search(&query).await?;
    Ok(Json(posts))
}

/// GET /posts/:id
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/posts/:id"])
        .start_timer();

    let post = build_post_service(&state).get(&id).await?;
    Ok(Json(post))
}

// =============================================================================
// Mutations
// =============================================================================

/// DELETE /posts/:id
async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["DELETE", "/posts/:id"])
        .start_timer();

    build_post_service(&state).delete(&identity, &id).await?;
    Ok(Json(MessageResponse::new("Post deleted successfully")))
}

/// POST /posts/:id/like
async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<LikeResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/posts/:id/like"])
        .start_timer();

    let outcome = build_post_service(&state).toggle_like(&identity, &id).await?;
    Ok(Json(outcome.into()))
}

/// POST /posts/:id/comment
async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<CommentRequest>,
) -> Result<Json<Post>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/posts/:id/comment"])
        .start_timer();

    let post = build_post_service(&state)
        .add_comment(&identity, &id, &body.text)
        .await?;
    Ok(Json(post))
}

/// DELETE /posts/:id/comment/:index
///
/// A non-numeric index is a bad request; an index past the end is a
/// missing comment.
async fn delete_comment_at(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path((id, index)): Path<(String, String)>,
) -> Result<Json<Post>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["DELETE", "/posts/:id/comment/:index"])
        .start_timer();

    let index = parse_comment_index(&index)?;
    let post = build_post_service(&state)
        .delete_comment_at(&identity, &id, index)
        .await?;
    Ok(Json(post))
}

fn parse_comment_index(raw: &str) -> Result<usize, AppError> {
    let trimmed = raw.trim();
    match trimmed.parse::<usize>() {
        Ok(index) => Ok(index),
        // Negative numbers parse as integers but can never name a comment.
        Err(_) if trimmed.parse::<i64>().is_ok() => {
            Err(AppError::NotFound("Comment not found".to_string()))
        }
        Err(_) => Err(AppError::Validation(
            "Comment index must be a number".to_string(),
        )),
    }
}

/// DELETE /posts/:id/comments/:comment_id
async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path((id, comment_id)): Path<(String, String)>,
) -> Result<Json<Post>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["DELETE", "/posts/:id/comments/:comment_id"])
        .start_timer();

    let post = build_post_service(&state)
        .delete_comment(&identity, &id, &comment_id)
        .await?;
    Ok(Json(post))
}

/// POST /posts/:id/share
async fn share_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ShareResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/posts/:id/share"])
        .start_timer();

    let post = build_post_service(&state).share(&identity, &id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ShareResponse {
            message: "Post shared successfully".to_string(),
            post,
        }),
    ))
}
