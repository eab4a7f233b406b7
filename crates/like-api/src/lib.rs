pub mod email;
pub mod error;
pub mod feed;
pub mod posts;
pub mod sessions;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::email::Mailer;
use like_db::Database;

pub struct Config {
    pub session_lifetime_minutes: i64,
    pub email_state_lifetime_minutes: i64,
    pub feed_page_size: usize,
    /// Base URL embedded in emailed login links.
    pub public_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_lifetime_minutes: 7 * 24 * 60,
            email_state_lifetime_minutes: 15,
            feed_page_size: 10,
            public_url: "http://localhost:3000".into(),
        }
    }
}

pub struct AppStateInner {
    pub db: Database,
    pub config: Config,
    pub mailer: Mailer,
}

pub type AppState = Arc<AppStateInner>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(users::register).get(users::list_users))
        .route("/api/users/me", get(sessions::current_user))
        .route("/api/users/{user_id}", get(users::get_user))
        .route(
            "/api/users/{user_id}/session",
            get(sessions::consume_email_login)
                .post(sessions::request_email_login)
                .delete(sessions::logout),
        )
        .route("/api/login", post(sessions::login_by_email))
        .route("/api/feed", get(feed::feed))
        .route(
            "/api/users/{user_id}/posts",
            post(posts::create_post).get(posts::list_posts),
        )
        .route(
            "/api/users/{user_id}/posts/{post_id}",
            get(posts::get_post).delete(posts::delete_post),
        )
        .with_state(state)
}
