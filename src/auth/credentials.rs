//! Signup and login endpoints
//!
//! Login answers with a bearer token; clients send it back as
//! `Authorization: Bearer <token>`.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use super::token::{Identity, issue_token};
use crate::AppState;
use crate::api::{JsonBody, LoginRequest, LoginResponse, SignupRequest, SignupResponse};
use crate::error::AppError;
use crate::metrics::HTTP_REQUEST_DURATION_SECONDS;
use crate::service::{NewUser, UserService};

/// Create auth router
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

fn build_user_service(state: &AppState) -> UserService {
    UserService::new(state.users.clone(), state.config.feed.clone())
}

/// POST /auth/signup
async fn signup(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/auth/signup"])
        .start_timer();

    let user = build_user_service(&state)
        .signup(NewUser {
            email: body.email,
            username: body.username,
            password: body.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".to_string(),
            email: user.email,
            username: user.username,
        }),
    ))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/auth/login"])
        .start_timer();

    let user = build_user_service(&state)
        .login(&body.email, &body.password)
        .await?;

    let identity = Identity {
        email: user.email,
        username: user.username,
    };
    let token = issue_token(
        &identity,
        &state.config.auth.token_secret,
        state.config.auth.token_max_age,
    )?;

    Ok(Json(LoginResponse {
        token,
        email: identity.email,
        username: identity.username,
    }))
}
