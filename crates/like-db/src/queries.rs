use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::{EmailStateRow, FeedPostRow, PostRow, SessionRow, UserRow};

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, email: &str, created_at: &str) -> StoreResult<UserRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, created_at) VALUES (?1, ?2, ?3)",
                params![username, email, created_at],
            )
            .map_err(StoreError::classify_constraint)?;

            Ok(UserRow {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                email: email.to_string(),
                created_at: created_at.to_string(),
            })
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    pub fn list_users(&self) -> StoreResult<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, username, email, created_at FROM users ORDER BY id")?;
            let rows = stmt
                .query_map([], map_user_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Sessions --

    /// Replace-on-create: a user holds at most one session, so logging in
    /// elsewhere invalidates the previous one.
    pub fn upsert_session(
        &self,
        user_id: i64,
        session_id: &str,
        expiration: &str,
    ) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO user_sessions (user_id, session_id, expiration)
                 VALUES (?1, ?2, ?3)",
                params![user_id, session_id, expiration],
            )?;
            Ok(())
        })
    }

    /// Expiry is lazy: expired rows stay in the table but never match here.
    pub fn get_session(&self, session_id: &str, now: &str) -> StoreResult<Option<SessionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, session_id, expiration FROM user_sessions
                     WHERE session_id = ?1 AND ?2 < expiration",
                    params![session_id, now],
                    |row| {
                        Ok(SessionRow {
                            user_id: row.get(0)?,
                            session_id: row.get(1)?,
                            expiration: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Idempotent: deleting an absent session is not an error.
    pub fn delete_session(&self, user_id: i64) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM user_sessions WHERE user_id = ?1",
                params![user_id],
            )?;
            Ok(())
        })
    }

    // -- Email login state --

    /// Drop any pending login link for the user and store a fresh one.
    /// The superseded token will simply fail to match when presented later.
    pub fn replace_email_state(
        &self,
        user_id: i64,
        state: &str,
        expiration: &str,
    ) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM user_email_state WHERE user_id = ?1",
                params![user_id],
            )?;
            tx.execute(
                "INSERT INTO user_email_state (user_id, state, expiration) VALUES (?1, ?2, ?3)",
                params![user_id, state, expiration],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_email_state(&self, user_id: i64) -> StoreResult<Option<EmailStateRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, state, expiration FROM user_email_state WHERE user_id = ?1",
                    params![user_id],
                    |row| {
                        Ok(EmailStateRow {
                            user_id: row.get(0)?,
                            state: row.get(1)?,
                            expiration: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Atomically consume a login link and mint the session it proves.
    /// The delete and the insert share one transaction: if the state does
    /// not match (absent, superseded, or expired) no session is created,
    /// and a matching state can never mint two sessions.
    pub fn consume_email_state(
        &self,
        user_id: i64,
        state: &str,
        now: &str,
        session_id: &str,
        session_expiration: &str,
    ) -> StoreResult<Option<SessionRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let deleted = tx.execute(
                "DELETE FROM user_email_state
                 WHERE user_id = ?1 AND state = ?2 AND ?3 < expiration",
                params![user_id, state, now],
            )?;
            if deleted == 0 {
                // No state deletion, no session.
                return Ok(None);
            }

            tx.execute(
                "INSERT OR REPLACE INTO user_sessions (user_id, session_id, expiration)
                 VALUES (?1, ?2, ?3)",
                params![user_id, session_id, session_expiration],
            )?;
            tx.commit()?;

            Ok(Some(SessionRow {
                user_id,
                session_id: session_id.to_string(),
                expiration: session_expiration.to_string(),
            }))
        })
    }

    // -- Posts --

    /// Atomic check-and-insert: the row lands only if the user has no
    /// other post on the same calendar date. Zero rows changed means the
    /// guard rejected the insert, which is a DuplicatePost, not a SQLite
    /// failure.
    pub fn create_post(&self, user_id: i64, uri: &str, created: &str) -> StoreResult<PostRow> {
        self.with_conn_mut(|conn| {
            let changed = conn
                .execute(
                    "INSERT INTO posts (user_id, uri, created)
                     SELECT ?1, ?2, ?3
                     WHERE NOT EXISTS (
                         SELECT 1 FROM posts
                         WHERE user_id = ?1 AND date(created) = date(?3)
                     )",
                    params![user_id, uri, created],
                )
                .map_err(StoreError::classify_constraint)?;
            if changed == 0 {
                return Err(StoreError::DuplicatePost);
            }

            Ok(PostRow {
                id: conn.last_insert_rowid(),
                user_id,
                uri: uri.to_string(),
                created: created.to_string(),
            })
        })
    }

    pub fn get_post(&self, user_id: i64, post_id: i64) -> StoreResult<Option<PostRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, uri, created FROM posts
                     WHERE user_id = ?1 AND id = ?2",
                    params![user_id, post_id],
                    map_post_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn posts_for_user(&self, user_id: i64) -> StoreResult<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, uri, created FROM posts
                 WHERE user_id = ?1 ORDER BY id DESC",
            )?;
            let rows = stmt
                .query_map(params![user_id], map_post_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Idempotent, owner-scoped delete. Does not re-open the daily slot
    /// check for rows that still exist.
    pub fn delete_post(&self, user_id: i64, post_id: i64) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM posts WHERE user_id = ?1 AND id = ?2",
                params![user_id, post_id],
            )?;
            Ok(())
        })
    }

    // -- Feed --

    /// One feed page: newest first, strictly below the cursor when given.
    /// JOIN users to carry the author's username in the same query.
    pub fn feed(&self, before: Option<i64>, limit: i64) -> StoreResult<Vec<FeedPostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT posts.id, posts.user_id, posts.uri, posts.created, users.username
                 FROM posts
                 JOIN users ON users.id = posts.user_id
                 WHERE ?1 IS NULL OR posts.id < ?1
                 ORDER BY posts.id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![before, limit], |row| {
                    Ok(FeedPostRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        uri: row.get(2)?,
                        created: row.get(3)?,
                        username: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> StoreResult<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, username, email, created_at FROM users WHERE id = ?1",
            params![id],
            map_user_row,
        )
        .optional()?;
    Ok(row)
}

fn query_user_by_email(conn: &Connection, email: &str) -> StoreResult<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, username, email, created_at FROM users WHERE email = ?1",
            params![email],
            map_user_row,
        )
        .optional()?;
    Ok(row)
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_post_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        uri: row.get(2)?,
        created: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time;

    fn db_with_user(username: &str, email: &str) -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(username, email, &time::now()).unwrap();
        (db, user.id)
    }

    fn count(db: &Database, sql: &str) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row(sql, [], |row| row.get(0))?))
            .unwrap()
    }

    #[test]
    fn duplicate_username_and_email_are_classified() {
        let (db, _) = db_with_user("alice", "a@x.com");

        let err = db.create_user("alice", "b@x.com", &time::now()).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername));

        let err = db.create_user("bob", "a@x.com", &time::now()).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        assert_eq!(count(&db, "SELECT COUNT(*) FROM users"), 1);
    }

    #[test]
    fn session_upsert_keeps_one_row_per_user() {
        let (db, user_id) = db_with_user("alice", "a@x.com");
        let exp = time::now_plus_minutes(60);

        db.upsert_session(user_id, "token-one", &exp).unwrap();
        db.upsert_session(user_id, "token-two", &exp).unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM user_sessions"), 1);

        // Only the replacement token is live.
        assert!(db.get_session("token-one", &time::now()).unwrap().is_none());
        let session = db.get_session("token-two", &time::now()).unwrap().unwrap();
        assert_eq!(session.user_id, user_id);
    }

    #[test]
    fn expired_session_reads_as_absent() {
        let (db, user_id) = db_with_user("alice", "a@x.com");
        db.upsert_session(user_id, "stale", &time::now_plus_minutes(-1))
            .unwrap();

        assert!(db.get_session("stale", &time::now()).unwrap().is_none());
    }

    #[test]
    fn delete_session_is_idempotent() {
        let (db, user_id) = db_with_user("alice", "a@x.com");
        db.delete_session(user_id).unwrap();
        db.upsert_session(user_id, "token", &time::now_plus_minutes(60))
            .unwrap();
        db.delete_session(user_id).unwrap();
        db.delete_session(user_id).unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM user_sessions"), 0);
    }

    #[test]
    fn email_state_is_single_use() {
        let (db, user_id) = db_with_user("alice", "a@x.com");
        db.replace_email_state(user_id, "state-token", &time::now_plus_minutes(15))
            .unwrap();

        let session = db
            .consume_email_state(user_id, "state-token", &time::now(), "sid", &time::now_plus_minutes(60))
            .unwrap();
        assert!(session.is_some());

        // Replay with the same state must not mint a second session.
        let replay = db
            .consume_email_state(user_id, "state-token", &time::now(), "sid2", &time::now_plus_minutes(60))
            .unwrap();
        assert!(replay.is_none());
        assert!(db.get_session("sid2", &time::now()).unwrap().is_none());
        assert_eq!(count(&db, "SELECT COUNT(*) FROM user_sessions"), 1);
    }

    #[test]
    fn expired_email_state_does_not_mint_a_session() {
        let (db, user_id) = db_with_user("alice", "a@x.com");
        db.replace_email_state(user_id, "state-token", &time::now_plus_minutes(-1))
            .unwrap();

        let session = db
            .consume_email_state(user_id, "state-token", &time::now(), "sid", &time::now_plus_minutes(60))
            .unwrap();
        assert!(session.is_none());
        assert_eq!(count(&db, "SELECT COUNT(*) FROM user_sessions"), 0);
    }

    #[test]
    fn new_login_request_supersedes_the_old_state() {
        let (db, user_id) = db_with_user("alice", "a@x.com");
        db.replace_email_state(user_id, "old", &time::now_plus_minutes(15))
            .unwrap();
        db.replace_email_state(user_id, "new", &time::now_plus_minutes(15))
            .unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM user_email_state"), 1);

        // The superseded token reads as invalid, not as a distinct error.
        let stale = db
            .consume_email_state(user_id, "old", &time::now(), "sid", &time::now_plus_minutes(60))
            .unwrap();
        assert!(stale.is_none());

        let fresh = db
            .consume_email_state(user_id, "new", &time::now(), "sid", &time::now_plus_minutes(60))
            .unwrap();
        assert!(fresh.is_some());
    }

    #[test]
    fn second_post_on_the_same_day_is_rejected() {
        let (db, user_id) = db_with_user("alice", "a@x.com");

        db.create_post(user_id, "uri-one", "2026-08-27 08:00:00.000")
            .unwrap();
        let err = db
            .create_post(user_id, "uri-two", "2026-08-27 21:30:00.000")
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePost));
        assert_eq!(count(&db, "SELECT COUNT(*) FROM posts"), 1);

        // Next day is a fresh slot.
        db.create_post(user_id, "uri-two", "2026-08-28 08:00:00.000")
            .unwrap();
        assert_eq!(count(&db, "SELECT COUNT(*) FROM posts"), 2);
    }

    #[test]
    fn daily_slots_are_per_user() {
        let (db, alice) = db_with_user("alice", "a@x.com");
        let bob = db.create_user("bob", "b@x.com", &time::now()).unwrap().id;

        db.create_post(alice, "uri-a", "2026-08-27 08:00:00.000").unwrap();
        db.create_post(bob, "uri-b", "2026-08-27 09:00:00.000").unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM posts"), 2);
    }

    #[test]
    fn delete_post_is_idempotent_and_owner_scoped() {
        let (db, alice) = db_with_user("alice", "a@x.com");
        let bob = db.create_user("bob", "b@x.com", &time::now()).unwrap().id;
        let post = db
            .create_post(alice, "uri", "2026-08-27 08:00:00.000")
            .unwrap();

        // Someone else's delete is a no-op.
        db.delete_post(bob, post.id).unwrap();
        assert!(db.get_post(alice, post.id).unwrap().is_some());

        db.delete_post(alice, post.id).unwrap();
        db.delete_post(alice, post.id).unwrap();
        assert!(db.get_post(alice, post.id).unwrap().is_none());
    }

    #[test]
    fn feed_pages_walk_every_post_once_in_descending_order() {
        let (db, user_id) = db_with_user("alice", "a@x.com");
        for day in 1..=5 {
            db.create_post(user_id, &format!("uri-{day}"), &format!("2026-08-{day:02} 08:00:00.000"))
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor: Option<i64> = None;
        loop {
            let page = db.feed(cursor, 2).unwrap();
            if page.is_empty() {
                break;
            }
            let full = page.len() == 2;
            cursor = page.last().map(|p| p.id);
            seen.extend(page.into_iter().map(|p| p.id));
            if !full {
                break;
            }
        }

        assert_eq!(seen.len(), 5);
        assert!(seen.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn feed_carries_the_author_username() {
        let (db, user_id) = db_with_user("alice", "a@x.com");
        db.create_post(user_id, "uri", "2026-08-27 08:00:00.000").unwrap();

        let page = db.feed(None, 10).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].username, "alice");
    }
}
