use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;

use like_db::models::UserRow;
use like_db::time;
use like_types::api::{Envelope, RegisterRequest};
use like_types::models::User;

use crate::AppState;
use crate::error::ApiError;
use crate::sessions;

/// POST /api/users — register and auto-login.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if sessions::current_session(&state, &jar)?.is_some() {
        return Err(ApiError::Validation("Already authenticated".into()));
    }

    let username = req
        .username
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing `username` in request body".into()))?;
    let email = req
        .email
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing `email` in request body".into()))?;

    // Duplicate username/email surfaces from the store with the
    // offending field named.
    let user = state.db.create_user(&username, &email, &time::now())?;
    let jar = sessions::establish_session(&state, jar, user.id)?;

    Ok((
        StatusCode::CREATED,
        jar,
        Json(Envelope::items("Created", vec![api_user(user)])),
    ))
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.list_users()?.into_iter().map(api_user).collect();
    Ok(Json(Envelope::items("OK", users)))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(Envelope::items("OK", vec![api_user(user)])))
}

pub(crate) fn api_user(row: UserRow) -> User {
    User {
        id: row.id,
        username: row.username,
        email: row.email,
    }
}
