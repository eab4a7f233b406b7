/// Database row types — these map directly to SQLite rows.
/// Distinct from the like-types API models to keep the DB layer independent.

#[derive(Debug)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

pub struct SessionRow {
    pub user_id: i64,
    pub session_id: String,
    pub expiration: String,
}

pub struct EmailStateRow {
    pub user_id: i64,
    pub state: String,
    pub expiration: String,
}

#[derive(Debug)]
pub struct PostRow {
    pub id: i64,
    pub user_id: i64,
    pub uri: String,
    pub created: String,
}

pub struct FeedPostRow {
    pub id: i64,
    pub user_id: i64,
    pub uri: String,
    pub created: String,
    pub username: String,
}
