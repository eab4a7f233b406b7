use serde::Serialize;

/// Public user record as returned by the API. Emails are visible to any
/// caller in this deployment, so no redacted variant exists yet.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// A post as returned by the API. `username` is populated only on feed
/// responses, where posts are joined with their authors.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub uri: String,
    pub created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
