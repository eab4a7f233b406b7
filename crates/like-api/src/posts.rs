use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;

use like_db::models::PostRow;
use like_db::time;
use like_types::api::{CreatePostRequest, Envelope};
use like_types::models::Post;

use crate::AppState;
use crate::error::ApiError;
use crate::sessions::require_owner;

/// POST /api/users/{id}/posts — owner only. The at-most-one-post-per-day
/// rule is enforced by the store's atomic conditional insert, so two
/// concurrent requests cannot both land on the same date.
pub async fn create_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&state, &jar, user_id)?;

    let uri = req
        .uri
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing `uri` in request body".into()))?;

    let post = state.db.create_post(user_id, &uri, &time::now())?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::items("Created", vec![api_post(post)])),
    ))
}

/// GET /api/users/{id}/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state
        .db
        .posts_for_user(user_id)?
        .into_iter()
        .map(api_post)
        .collect();
    Ok(Json(Envelope::items("OK", posts)))
}

/// GET /api/users/{id}/posts/{post_id}
pub async fn get_post(
    State(state): State<AppState>,
    Path((user_id, post_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .db
        .get_post(user_id, post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;
    Ok(Json(Envelope::items("OK", vec![api_post(post)])))
}

/// DELETE /api/users/{id}/posts/{post_id} — owner only, idempotent.
pub async fn delete_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Path((user_id, post_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&state, &jar, user_id)?;
    state.db.delete_post(user_id, post_id)?;
    Ok(Json(Envelope::<()>::message("Deleted")))
}

fn api_post(row: PostRow) -> Post {
    Post {
        id: row.id,
        user_id: row.user_id,
        uri: row.uri,
        created: row.created,
        username: None,
    }
}
