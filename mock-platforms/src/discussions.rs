use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use jsonwebtoken::{decode, DecodingKey, Validation};
use platform_wire::discussions::{
    DiscussionUser, TokenClaims, UserPayload, SUPPORTED_USER_ATTRIBUTES, USERS_PATH,
};

use crate::{status, MockPlatforms};

pub(crate) fn routes() -> Router<MockPlatforms> {
    Router::new()
        .route(USERS_PATH, get(list_users).post(create_user))
        .route("/api/v0/users/:username/", get(get_user).patch(update_user))
}

/// Only staff service tokens signed with the shared secret may manage users.
fn authorized(state: &MockPlatforms, headers: &HeaderMap) -> bool {
    let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    else {
        return false;
    };
    decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .is_ok_and(|data| data.claims.roles.iter().any(|role| role == "staff"))
}

fn supported(payload: &UserPayload) -> bool {
    payload
        .profile
        .keys()
        .all(|key| SUPPORTED_USER_ATTRIBUTES.contains(&key.as_str()))
}

async fn list_users(State(state): State<MockPlatforms>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return status(StatusCode::UNAUTHORIZED);
    }
    let users: Vec<DiscussionUser> = state
        .lock()
        .users
        .iter()
        .map(|(username, profile)| DiscussionUser {
            username: username.clone(),
            profile: profile.clone(),
        })
        .collect();
    Json(users).into_response()
}

async fn create_user(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Json(payload): Json<UserPayload>,
) -> Response {
    if !authorized(&state, &headers) {
        return status(StatusCode::UNAUTHORIZED);
    }
    if !supported(&payload) {
        return status(StatusCode::BAD_REQUEST);
    }
    let mut platforms = state.lock();
    let username = format!("user_{}", platforms.next_id());
    platforms
        .users
        .insert(username.clone(), payload.profile.clone());
    let user = DiscussionUser {
        username,
        profile: payload.profile,
    };
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn get_user(
    State(state): State<MockPlatforms>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return status(StatusCode::UNAUTHORIZED);
    }
    match state.lock().users.get(&username) {
        Some(profile) => Json(DiscussionUser {
            username,
            profile: profile.clone(),
        })
        .into_response(),
        None => status(StatusCode::NOT_FOUND),
    }
}

async fn update_user(
    State(state): State<MockPlatforms>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UserPayload>,
) -> Response {
    if !authorized(&state, &headers) {
        return status(StatusCode::UNAUTHORIZED);
    }
    if !supported(&payload) {
        return status(StatusCode::BAD_REQUEST);
    }
    let mut platforms = state.lock();
    let Some(profile) = platforms.users.get_mut(&username) else {
        return status(StatusCode::NOT_FOUND);
    };
    profile.extend(payload.profile);
    let profile = profile.clone();
    Json(DiscussionUser { username, profile }).into_response()
}
