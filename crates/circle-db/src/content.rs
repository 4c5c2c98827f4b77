use chrono::{DateTime, Utc};
use circle_types::models::{Comment, CommentId, Micropost, MicropostId, UserId, WallId};
use circle_types::{Error, Result};
use rusqlite::params;

use crate::models::format_ts;
use crate::queries::user_exists;
use crate::{Database, SqlResultExt};

fn exists(tx: &rusqlite::Connection, sql: &str, key: String) -> Result<bool> {
    tx.query_row(sql, [key], |r| r.get(0)).store()
}

impl Database {
    pub fn insert_micropost(
        &self,
        id: MicropostId,
        author: UserId,
        wall: WallId,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Micropost> {
        self.with_conn_mut(|tx| {
            if !user_exists(tx, author)? {
                return Err(Error::not_found("user", author));
            }
            if !exists(tx, "SELECT EXISTS(SELECT 1 FROM walls WHERE id = ?1)", wall.to_string())? {
                return Err(Error::not_found("wall", wall));
            }

            tx.execute(
                "INSERT INTO microposts (id, author_id, wall_id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    author.to_string(),
                    wall.to_string(),
                    body,
                    format_ts(created_at),
                ],
            )
            .store()?;

            Ok(Micropost {
                id,
                author_id: author,
                wall_id: wall,
                body: body.to_string(),
                created_at,
            })
        })
    }

    pub fn insert_comment(
        &self,
        id: CommentId,
        author: UserId,
        micropost: MicropostId,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Comment> {
        self.with_conn_mut(|tx| {
            if !user_exists(tx, author)? {
                return Err(Error::not_found("user", author));
            }
            if !exists(
                tx,
                "SELECT EXISTS(SELECT 1 FROM microposts WHERE id = ?1)",
                micropost.to_string(),
            )? {
                return Err(Error::not_found("micropost", micropost));
            }

            tx.execute(
                "INSERT INTO comments (id, author_id, micropost_id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    author.to_string(),
                    micropost.to_string(),
                    body,
                    format_ts(created_at),
                ],
            )
            .store()?;

            Ok(Comment {
                id,
                author_id: author,
                micropost_id: micropost,
                body: body.to_string(),
                created_at,
            })
        })
    }

    /// Comments under the post are owned by their authors and stay.
    pub fn delete_micropost(&self, id: MicropostId) -> Result<()> {
        self.with_conn_mut(|tx| {
            let deleted = tx
                .execute("DELETE FROM microposts WHERE id = ?1", [id.to_string()])
                .store()?;
            if deleted == 0 {
                return Err(Error::not_found("micropost", id));
            }
            Ok(())
        })
    }

    pub fn delete_comment(&self, id: CommentId) -> Result<()> {
        self.with_conn_mut(|tx| {
            let deleted = tx
                .execute("DELETE FROM comments WHERE id = ?1", [id.to_string()])
                .store()?;
            if deleted == 0 {
                return Err(Error::not_found("comment", id));
            }
            Ok(())
        })
    }
}
