use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use rand::RngCore;
use serde::Deserialize;
use uuid::Uuid;

use like_db::models::{SessionRow, UserRow};
use like_db::time;
use like_types::api::{Envelope, LoginRequest};

use crate::AppState;
use crate::error::ApiError;
use crate::users::api_user;

pub const SESSION_ID_COOKIE: &str = "session_id";
pub const USER_ID_COOKIE: &str = "user_id";

// -- Session plumbing --

/// Mint a session for the user and return the cookies carrying the new
/// credential. Replaces any previous session (one active session per user).
pub(crate) fn establish_session(
    state: &AppState,
    jar: CookieJar,
    user_id: i64,
) -> Result<CookieJar, ApiError> {
    let session_id = Uuid::new_v4().to_string();
    let expiration = time::now_plus_minutes(state.config.session_lifetime_minutes);
    state.db.upsert_session(user_id, &session_id, &expiration)?;
    Ok(session_cookies(jar, user_id, &session_id))
}

fn session_cookies(jar: CookieJar, user_id: i64, session_id: &str) -> CookieJar {
    jar.add(credential_cookie(SESSION_ID_COOKIE, session_id.to_string()))
        .add(credential_cookie(USER_ID_COOKIE, user_id.to_string()))
}

fn credential_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .build()
}

fn clear_credential_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// The caller's active session, if any. Absent cookies, an unknown token,
/// an expired row, and a user-id mismatch all read as "not authenticated";
/// none of them is an error.
pub(crate) fn current_session(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Option<SessionRow>, ApiError> {
    let Some(session_id) = jar.get(SESSION_ID_COOKIE) else {
        return Ok(None);
    };
    let Some(user_id) = jar
        .get(USER_ID_COOKIE)
        .and_then(|c| c.value().parse::<i64>().ok())
    else {
        return Ok(None);
    };

    let session = state.db.get_session(session_id.value(), &time::now())?;
    Ok(session.filter(|s| s.user_id == user_id))
}

/// Ownership guard: the caller must hold an active session for `user_id`.
pub(crate) fn require_owner(
    state: &AppState,
    jar: &CookieJar,
    user_id: i64,
) -> Result<(), ApiError> {
    match current_session(state, jar)? {
        Some(session) if session.user_id == user_id => Ok(()),
        _ => Err(ApiError::Forbidden),
    }
}

// -- Handlers --

#[derive(Debug, Deserialize)]
pub struct ConsumeQuery {
    pub state: Option<String>,
}

/// GET /api/users/{id}/session?state= — the user clicked the emailed link.
/// Consuming the state and minting the session is one datastore
/// transaction, so a link can never be replayed into a second session.
pub async fn consume_email_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
    Query(query): Query<ConsumeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(presented) = query.state else {
        return Err(ApiError::Validation("Missing `state` query param".into()));
    };

    let session_id = Uuid::new_v4().to_string();
    let expiration = time::now_plus_minutes(state.config.session_lifetime_minutes);
    let session = state
        .db
        .consume_email_state(user_id, &presented, &time::now(), &session_id, &expiration)?
        .ok_or(ApiError::InvalidState)?;

    let jar = session_cookies(jar, session.user_id, &session.session_id);
    Ok((jar, Redirect::to("/")))
}

/// DELETE /api/users/{id}/session — logout, owner only, idempotent.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&state, &jar, user_id)?;
    state.db.delete_session(user_id)?;

    let jar = jar
        .remove(clear_credential_cookie(SESSION_ID_COOKIE))
        .remove(clear_credential_cookie(USER_ID_COOKIE));
    Ok((jar, Json(Envelope::<()>::message("Deleted"))))
}

/// POST /api/users/{id}/session — send a login link to the user's email.
pub async fn request_email_login(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    send_login_link(&state, &user).await?;
    Ok(Json(Envelope::<()>::message("Please check your email")))
}

/// POST /api/login — same as above, but the user is looked up by email.
pub async fn login_by_email(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing valid `email` in request body".into()))?;
    let user = state
        .db
        .get_user_by_email(&email)?
        .ok_or_else(|| ApiError::NotFound("Email not registered".into()))?;

    send_login_link(&state, &user).await?;
    Ok(Json(Envelope::<()>::message("Please check your email")))
}

/// GET /api/users/me — the user owning the caller's session.
pub async fn current_user(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let session = current_session(&state, &jar)?
        .ok_or_else(|| ApiError::Unauthenticated("Not logged in".into()))?;
    let user = state
        .db
        .get_user_by_id(session.user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(Envelope::items("OK", vec![api_user(user)])))
}

/// Invalidate any pending link, store a fresh single-use state, and
/// dispatch it. A dispatch failure surfaces as an error; it must not
/// read as "link sent" to the caller.
async fn send_login_link(state: &AppState, user: &UserRow) -> Result<(), ApiError> {
    let token = new_state_token();
    let expiration = time::now_plus_minutes(state.config.email_state_lifetime_minutes);
    state.db.replace_email_state(user.id, &token, &expiration)?;

    let link = format!(
        "{}/api/users/{}/session?state={}",
        state.config.public_url, user.id, token
    );
    state
        .mailer
        .send_login_link(&user.email, &link)
        .await
        .map_err(|err| ApiError::Internal(err.into()))?;
    Ok(())
}

/// 32 bytes of randomness, hex-encoded. The token has no structure; it
/// only ever matches by equality.
fn new_state_token() -> String {
    let mut buf = [0u8; 32];
    rand::rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_tokens_are_long_and_unique() {
        let a = new_state_token();
        let b = new_state_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
