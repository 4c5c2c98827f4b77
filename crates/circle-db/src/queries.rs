use circle_types::Result;
use circle_types::models::{
    Comment, CommentId, Micropost, MicropostId, Relationship, User, UserId, Wall, WallId,
};
use rusqlite::{Connection, Row, params};

use crate::models::{CommentRow, MicropostRow, RelationshipRow, UserRow, WallRow, pair_key};
use crate::SqlResultExt;

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_digest, created_at";
const RELATIONSHIP_COLUMNS: &str =
    "id, requester_id, recipient_id, status, requested_at, accepted_at";
const MICROPOST_COLUMNS: &str = "id, author_id, wall_id, body, created_at";
const COMMENT_COLUMNS: &str = "id, author_id, micropost_id, body, created_at";

/// Read-only view over one snapshot. Obtained from [`crate::Database::read`].
pub struct Reader<'a> {
    conn: &'a Connection,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| {
                r.get(0)
            })
            .store()
    }

    // -- Users --

    pub fn user(&self, id: UserId) -> Result<Option<User>> {
        self.user_row(id)?.map(User::try_from).transpose()
    }

    pub fn user_exists(&self, id: UserId) -> Result<bool> {
        user_exists(self.conn, id)
    }

    pub fn user_row(&self, id: UserId) -> Result<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        self.conn
            .query_row(&sql, [id.to_string()], user_row)
            .optional()
    }

    /// Case-insensitive lookup.
    pub fn user_row_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        user_row_by_email(self.conn, email)
    }

    pub fn wall_for(&self, user: UserId) -> Result<Option<Wall>> {
        self.conn
            .query_row(
                "SELECT id, user_id, created_at FROM walls WHERE user_id = ?1",
                [user.to_string()],
                wall_row,
            )
            .optional()?
            .map(Wall::try_from)
            .transpose()
    }

    pub fn wall(&self, id: WallId) -> Result<Option<Wall>> {
        self.conn
            .query_row(
                "SELECT id, user_id, created_at FROM walls WHERE id = ?1",
                [id.to_string()],
                wall_row,
            )
            .optional()?
            .map(Wall::try_from)
            .transpose()
    }

    // -- Relationships --

    pub fn relationship_between(&self, a: UserId, b: UserId) -> Result<Option<Relationship>> {
        relationship_between(self.conn, a, b)
    }

    /// Other endpoint of every accepted edge touching `user`, oldest edge first.
    pub fn friends(&self, user: UserId) -> Result<Vec<UserId>> {
        self.user_ids(
            "SELECT CASE WHEN requester_id = ?1 THEN recipient_id ELSE requester_id END
             FROM relationships
             WHERE status = 'accepted' AND (requester_id = ?1 OR recipient_id = ?1)
             ORDER BY seq",
            user,
        )
    }

    /// Requesters waiting on `user`.
    pub fn incoming_pending(&self, user: UserId) -> Result<Vec<UserId>> {
        self.user_ids(
            "SELECT requester_id FROM relationships
             WHERE status = 'pending' AND recipient_id = ?1
             ORDER BY seq",
            user,
        )
    }

    /// Users `user` has asked and not yet heard back from.
    pub fn outgoing_pending(&self, user: UserId) -> Result<Vec<UserId>> {
        self.user_ids(
            "SELECT recipient_id FROM relationships
             WHERE status = 'pending' AND requester_id = ?1
             ORDER BY seq",
            user,
        )
    }

    fn user_ids(&self, sql: &str, user: UserId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn.prepare(sql).store()?;
        let raw = stmt
            .query_map([user.to_string()], |row| row.get::<_, String>(0))
            .store()?
            .collect::<std::result::Result<Vec<_>, _>>()
            .store()?;

        raw.iter()
            .map(|id| {
                id.parse::<UserId>().map_err(|e| {
                    tracing::warn!("Corrupt user id '{}' in relationships: {}", id, e);
                    circle_types::Error::Internal(format!("corrupt user id '{}'", id))
                })
            })
            .collect()
    }

    // -- Microposts --

    pub fn micropost(&self, id: MicropostId) -> Result<Option<Micropost>> {
        let sql = format!("SELECT {MICROPOST_COLUMNS} FROM microposts WHERE id = ?1");
        self.conn
            .query_row(&sql, [id.to_string()], micropost_row)
            .optional()?
            .map(Micropost::try_from)
            .transpose()
    }

    /// Newest first; equal timestamps fall back to insertion order, newest first.
    pub fn microposts_by_author(&self, author: UserId) -> Result<Vec<Micropost>> {
        let sql = format!(
            "SELECT {MICROPOST_COLUMNS} FROM microposts
             WHERE author_id = ?1
             ORDER BY created_at DESC, seq DESC"
        );
        self.microposts(&sql, params![author.to_string()])
    }

    pub fn microposts_on_wall(&self, wall: WallId) -> Result<Vec<Micropost>> {
        let sql = format!(
            "SELECT {MICROPOST_COLUMNS} FROM microposts
             WHERE wall_id = ?1
             ORDER BY created_at DESC, seq DESC"
        );
        self.microposts(&sql, params![wall.to_string()])
    }

    /// Posts by `user` and by everyone `user` is friends with, newest first.
    pub fn feed(&self, user: UserId) -> Result<Vec<Micropost>> {
        let sql = format!(
            "SELECT {MICROPOST_COLUMNS} FROM microposts
             WHERE author_id = ?1
                OR author_id IN (
                    SELECT CASE WHEN requester_id = ?1 THEN recipient_id ELSE requester_id END
                    FROM relationships
                    WHERE status = 'accepted' AND (requester_id = ?1 OR recipient_id = ?1)
                )
             ORDER BY created_at DESC, seq DESC"
        );
        self.microposts(&sql, params![user.to_string()])
    }

    fn microposts(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Micropost>> {
        let mut stmt = self.conn.prepare(sql).store()?;
        let rows = stmt
            .query_map(params, micropost_row)
            .store()?
            .collect::<std::result::Result<Vec<_>, _>>()
            .store()?;
        rows.into_iter().map(Micropost::try_from).collect()
    }

    // -- Comments --

    pub fn comment(&self, id: CommentId) -> Result<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1");
        self.conn
            .query_row(&sql, [id.to_string()], comment_row)
            .optional()?
            .map(Comment::try_from)
            .transpose()
    }

    pub fn comments_by_author(&self, author: UserId) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments
             WHERE author_id = ?1
             ORDER BY created_at DESC, seq DESC"
        );
        self.comments(&sql, author.to_string())
    }

    /// Oldest first, the order a thread is read in.
    pub fn comments_on(&self, micropost: MicropostId) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments
             WHERE micropost_id = ?1
             ORDER BY created_at ASC, seq ASC"
        );
        self.comments(&sql, micropost.to_string())
    }

    fn comments(&self, sql: &str, key: String) -> Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare(sql).store()?;
        let rows = stmt
            .query_map([key], comment_row)
            .store()?
            .collect::<std::result::Result<Vec<_>, _>>()
            .store()?;
        rows.into_iter().map(Comment::try_from).collect()
    }
}

// Shared by reads and by the existence checks inside write transactions.

pub(crate) fn user_exists(conn: &Connection, id: UserId) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        [id.to_string()],
        |r| r.get(0),
    )
    .store()
}

pub(crate) fn user_row_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE");
    conn.query_row(&sql, [email], user_row).optional()
}

pub(crate) fn relationship_between(
    conn: &Connection,
    a: UserId,
    b: UserId,
) -> Result<Option<Relationship>> {
    let (low, high) = pair_key(a, b);
    let sql = format!(
        "SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE user_low = ?1 AND user_high = ?2"
    );
    conn.query_row(&sql, [low, high], relationship_row)
        .optional()?
        .map(Relationship::try_from)
        .transpose()
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        password_digest: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn wall_row(row: &Row<'_>) -> rusqlite::Result<WallRow> {
    Ok(WallRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        created_at: row.get(2)?,
    })
}

pub(crate) fn relationship_row(row: &Row<'_>) -> rusqlite::Result<RelationshipRow> {
    Ok(RelationshipRow {
        id: row.get(0)?,
        requester_id: row.get(1)?,
        recipient_id: row.get(2)?,
        status: row.get(3)?,
        requested_at: row.get(4)?,
        accepted_at: row.get(5)?,
    })
}

fn micropost_row(row: &Row<'_>) -> rusqlite::Result<MicropostRow> {
    Ok(MicropostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        wall_id: row.get(2)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn comment_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        micropost_id: row.get(2)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}
