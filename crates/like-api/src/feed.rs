use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use like_types::api::Envelope;
use like_types::models::Post;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub before_post: Option<String>,
}

/// GET /api/feed — newest first, cursor-paginated by post id. A malformed
/// cursor is treated the same as no cursor: start from the newest post.
///
/// A full page produces a `nextLink` pointing below the oldest returned
/// id. This is a heuristic: when exactly one page of posts remains, the
/// caller needs one extra empty-page fetch to see the end.
pub async fn feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let before = query
        .before_post
        .as_deref()
        .and_then(|v| v.parse::<i64>().ok());

    let limit = state.config.feed_page_size;
    let rows = state.db.feed(before, limit as i64)?;

    let next_link = if rows.len() == limit {
        rows.last()
            .map(|post| format!("api/feed?before_post={}", post.id))
    } else {
        None
    };

    let items: Vec<Post> = rows
        .into_iter()
        .map(|row| Post {
            id: row.id,
            user_id: row.user_id,
            uri: row.uri,
            created: row.created,
            username: Some(row.username),
        })
        .collect();

    let mut envelope = Envelope::items("OK", items);
    if let Some(link) = next_link {
        envelope = envelope.with_next_link(link);
    }
    Ok(Json(envelope))
}
