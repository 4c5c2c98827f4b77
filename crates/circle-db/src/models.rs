//! Database row types. These map directly to SQLite rows and are converted
//! into `circle_types` models at the crate boundary.

use chrono::{DateTime, SecondsFormat, Utc};
use circle_types::models::{
    Comment, Micropost, Relationship, RelationshipStatus, User, UserId, Wall,
};
use circle_types::{Error, Result};
use tracing::warn;

/// Fixed-width RFC 3339 so string order matches time order.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            Error::Internal(format!("corrupt timestamp '{}'", raw))
        })
}

fn parse_id<T>(raw: &str, column: &str) -> Result<T>
where
    T: std::str::FromStr<Err = uuid::Error>,
{
    raw.parse().map_err(|e| {
        warn!("Corrupt {} '{}': {}", column, raw, e);
        Error::Internal(format!("corrupt {} '{}'", column, raw))
    })
}

/// Canonical `(low, high)` key for an unordered user pair.
pub fn pair_key(a: UserId, b: UserId) -> (String, String) {
    let (a, b) = (a.to_string(), b.to_string());
    if a <= b { (a, b) } else { (b, a) }
}

pub struct UserRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_digest: String,
    pub created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_id(&row.id, "user id")?,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

pub struct WallRow {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
}

impl TryFrom<WallRow> for Wall {
    type Error = Error;

    fn try_from(row: WallRow) -> Result<Self> {
        Ok(Wall {
            id: parse_id(&row.id, "wall id")?,
            user_id: parse_id(&row.user_id, "wall user_id")?,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

pub struct RelationshipRow {
    pub id: String,
    pub requester_id: String,
    pub recipient_id: String,
    pub status: String,
    pub requested_at: String,
    pub accepted_at: Option<String>,
}

impl TryFrom<RelationshipRow> for Relationship {
    type Error = Error;

    fn try_from(row: RelationshipRow) -> Result<Self> {
        let status = row.status.parse::<RelationshipStatus>().map_err(|e| {
            warn!("Corrupt relationship '{}': {}", row.id, e);
            Error::Internal(e)
        })?;
        Ok(Relationship {
            id: parse_id(&row.id, "relationship id")?,
            requester_id: parse_id(&row.requester_id, "requester_id")?,
            recipient_id: parse_id(&row.recipient_id, "recipient_id")?,
            status,
            requested_at: parse_ts(&row.requested_at)?,
            accepted_at: row.accepted_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}

pub struct MicropostRow {
    pub id: String,
    pub author_id: String,
    pub wall_id: String,
    pub body: String,
    pub created_at: String,
}

impl TryFrom<MicropostRow> for Micropost {
    type Error = Error;

    fn try_from(row: MicropostRow) -> Result<Self> {
        Ok(Micropost {
            id: parse_id(&row.id, "micropost id")?,
            author_id: parse_id(&row.author_id, "micropost author_id")?,
            wall_id: parse_id(&row.wall_id, "micropost wall_id")?,
            body: row.body,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

pub struct CommentRow {
    pub id: String,
    pub author_id: String,
    pub micropost_id: String,
    pub body: String,
    pub created_at: String,
}

impl TryFrom<CommentRow> for Comment {
    type Error = Error;

    fn try_from(row: CommentRow) -> Result<Self> {
        Ok(Comment {
            id: parse_id(&row.id, "comment id")?,
            author_id: parse_id(&row.author_id, "comment author_id")?,
            micropost_id: parse_id(&row.micropost_id, "comment micropost_id")?,
            body: row.body,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}
