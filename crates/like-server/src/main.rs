use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use like_api::email::Mailer;
use like_api::{AppState, AppStateInner, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "like=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("LIKE_DB_PATH").unwrap_or_else(|_| "like.db".into());
    let host = std::env::var("LIKE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("LIKE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    let mut config = Config::default();
    if let Ok(url) = std::env::var("LIKE_PUBLIC_URL") {
        config.public_url = url;
    }
    if let Ok(minutes) = std::env::var("LIKE_SESSION_LIFETIME_MINUTES") {
        config.session_lifetime_minutes = minutes.parse()?;
    }
    if let Ok(minutes) = std::env::var("LIKE_EMAIL_STATE_LIFETIME_MINUTES") {
        config.email_state_lifetime_minutes = minutes.parse()?;
    }
    if let Ok(size) = std::env::var("LIKE_FEED_PAGE_SIZE") {
        config.feed_page_size = size.parse()?;
    }

    // Email: SendGrid when a key is configured, otherwise log the links.
    let mailer = match std::env::var("SENDGRID_API_KEY") {
        Ok(api_key) if std::env::var("LIKE_EMAIL_MODE").as_deref() != Ok("log") => {
            let from =
                std::env::var("LIKE_EMAIL_FROM").unwrap_or_else(|_| "no-reply@like.local".into());
            Mailer::sendgrid(api_key, from)?
        }
        _ => {
            info!("email dispatch disabled; login links will be logged");
            Mailer::Log
        }
    };

    // Init database
    let db = like_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner { db, config, mailer });

    let app = like_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Like server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
