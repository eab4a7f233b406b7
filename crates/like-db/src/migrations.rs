use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per user: logging in elsewhere replaces the old session.
        CREATE TABLE IF NOT EXISTS user_sessions (
            user_id     INTEGER PRIMARY KEY REFERENCES users(id),
            session_id  TEXT NOT NULL UNIQUE,
            expiration  TEXT NOT NULL
        );

        -- One pending login link per user; replaced wholesale on each request.
        CREATE TABLE IF NOT EXISTS user_email_state (
            user_id     INTEGER PRIMARY KEY REFERENCES users(id),
            state       TEXT NOT NULL UNIQUE,
            expiration  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            uri         TEXT NOT NULL,
            created     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_user
            ON posts(user_id);

        -- Backstop for the conditional insert in create_post.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_posts_user_day
            ON posts(user_id, date(created));
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
