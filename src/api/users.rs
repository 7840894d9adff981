//! User directory, profile and follow endpoints
//!
//! Every route here requires a bearer token.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use super::dto::{FollowResponse, UpdateProfileRequest, UserResponse};
use super::extract::JsonBody;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::HTTP_REQUEST_DURATION_SECONDS;
use crate::service::UserService;

/// Create users router, mounted under `/users`
pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/search/:query", get(search_users))
        .route("/profile/:username", get(get_profile))
        .route("/follow/:username", post(follow_user))
        .route("/unfollow/:username", post(unfollow_user))
        .route("/me", get(get_me).patch(update_me))
}

fn build_user_service(state: &AppState) -> UserService {
    UserService::new(state.users.clone(), state.config.feed.clone())
}

fn to_responses(users: Vec<crate::data::User>) -> Vec<UserResponse> {
    users.into_iter().map(UserResponse::from).collect()
}

/// GET /users
async fn list_users(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/users"])
        .start_timer();

    let users = build_user_service(&state).list_others(&identity).await?;
    Ok(Json(to_responses(users)))
}

/// GET /users/search/:query
async fn search_users(
    State(state): State<AppState>,
    CurrentUser(_identity): CurrentUser,
    Path(query): Path<String>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/users/search/:query"])
        .start_timer();

    let users = build_user_service(&state).search(&query).await?;
    Ok(Json(to_responses(users)))
}

/// GET /users/profile/:username
async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(_identity): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/users/profile/:username"])
        .start_timer();

    let user = build_user_service(&state).get_by_username(&username).await?;
    Ok(Json(user.into()))
}

/// POST /users/follow/:username
async fn follow_user(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<FollowResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/users/follow/:username"])
        .start_timer();

    build_user_service(&state).follow(&identity, &username).await?;
    Ok(Json(FollowResponse {
        message: "User followed successfully".to_string(),
        following: true,
    }))
}

/// POST /users/unfollow/:username
async fn unfollow_user(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<FollowResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/users/unfollow/:username"])
        .start_timer();

    build_user_service(&state)
        .unfollow(&identity, &username)
        .await?;
    Ok(Json(FollowResponse {
        message: "User unfollowed successfully".to_string(),
        following: false,
    }))
}

/// GET /users/me
async fn get_me(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<UserResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/users/me"])
        .start_timer();

    let user = build_user_service(&state).current(&identity).await?;
    Ok(Json(user.into()))
}

/// PATCH /users/me
async fn update_me(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    JsonBody(body): JsonBody<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["PATCH", "/users/me"])
        .start_timer();

    let bio = body
        .bio
        .ok_or_else(|| AppError::Validation("Bio is required".to_string()))?;
    let user = build_user_service(&state)
        .update_bio(&identity, &bio)
        .await?;
    Ok(Json(user.into()))
}
