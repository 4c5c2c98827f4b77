use chrono::{DateTime, Utc};
use circle_types::models::{User, UserId, Wall, WallId};
use circle_types::{Error, Result, ValidationErrors};
use rusqlite::params;

use crate::models::format_ts;
use crate::queries::{user_exists, user_row_by_email};
use crate::{Database, SqlResultExt};

/// A validated user, ready to insert. Email must already be lower-cased.
pub struct InsertUser<'a> {
    pub id: UserId,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password_digest: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Columns to overwrite; `None` keeps the stored value.
#[derive(Default)]
pub struct UserChanges<'a> {
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password_digest: Option<&'a str>,
}

fn email_taken() -> Error {
    ValidationErrors::single("email", "has already been taken").into()
}

impl Database {
    /// Inserts the user and their wall together.
    pub fn create_user(&self, user: &InsertUser<'_>, wall_id: WallId) -> Result<(User, Wall)> {
        self.with_conn_mut(|tx| {
            if user_row_by_email(tx, user.email)?.is_some() {
                return Err(email_taken());
            }

            let created_at = format_ts(user.created_at);
            tx.execute(
                "INSERT INTO users (id, first_name, last_name, email, password_digest, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id.to_string(),
                    user.first_name,
                    user.last_name,
                    user.email,
                    user.password_digest,
                    created_at,
                ],
            )
            .store()?;

            tx.execute(
                "INSERT INTO walls (id, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![wall_id.to_string(), user.id.to_string(), created_at],
            )
            .store()?;

            Ok((
                User {
                    id: user.id,
                    first_name: user.first_name.to_string(),
                    last_name: user.last_name.to_string(),
                    email: user.email.to_string(),
                    created_at: user.created_at,
                },
                Wall {
                    id: wall_id,
                    user_id: user.id,
                    created_at: user.created_at,
                },
            ))
        })
    }

    pub fn update_user(&self, id: UserId, changes: &UserChanges<'_>) -> Result<()> {
        self.with_conn_mut(|tx| {
            if !user_exists(tx, id)? {
                return Err(Error::not_found("user", id));
            }
            if let Some(email) = changes.email {
                if let Some(existing) = user_row_by_email(tx, email)? {
                    if existing.id != id.to_string() {
                        return Err(email_taken());
                    }
                }
            }

            tx.execute(
                "UPDATE users SET
                    first_name      = COALESCE(?2, first_name),
                    last_name       = COALESCE(?3, last_name),
                    email           = COALESCE(?4, email),
                    password_digest = COALESCE(?5, password_digest)
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    changes.first_name,
                    changes.last_name,
                    changes.email,
                    changes.password_digest,
                ],
            )
            .store()?;
            Ok(())
        })
    }

    /// Removes the user and everything they own in one transaction: their
    /// comments, their microposts, every relationship touching them, their
    /// wall, then the user row. Content others wrote on their wall or under
    /// their posts is left alone.
    pub fn destroy_user(&self, id: UserId) -> Result<DestroyedCounts> {
        self.with_conn_mut(|tx| {
            if !user_exists(tx, id)? {
                return Err(Error::not_found("user", id));
            }
            let key = id.to_string();

            let comments = tx
                .execute("DELETE FROM comments WHERE author_id = ?1", [&key])
                .store()?;
            let microposts = tx
                .execute("DELETE FROM microposts WHERE author_id = ?1", [&key])
                .store()?;
            let relationships = tx
                .execute(
                    "DELETE FROM relationships WHERE requester_id = ?1 OR recipient_id = ?1",
                    [&key],
                )
                .store()?;
            tx.execute("DELETE FROM walls WHERE user_id = ?1", [&key])
                .store()?;
            tx.execute("DELETE FROM users WHERE id = ?1", [&key])
                .store()?;

            Ok(DestroyedCounts {
                microposts,
                comments,
                relationships,
            })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyedCounts {
    pub microposts: usize,
    pub comments: usize,
    pub relationships: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn insert(db: &Database, email: &str) -> Result<(User, Wall)> {
        let user = InsertUser {
            id: UserId::generate(),
            first_name: "Example",
            last_name: "User",
            email,
            password_digest: "$argon2id$stub",
            created_at: testing::now(),
        };
        db.create_user(&user, WallId::generate())
    }

    #[test]
    fn user_and_wall_are_created_together() {
        let t = testing::open();
        let (user, wall) = insert(&t.db, "user@example.com").unwrap();

        let stored = t.db.read(|r| r.user(user.id)).unwrap().unwrap();
        assert_eq!(stored, user);
        let stored_wall = t.db.read(|r| r.wall_for(user.id)).unwrap().unwrap();
        assert_eq!(stored_wall, wall);
    }

    #[test]
    fn duplicate_email_is_rejected_before_insert() {
        let t = testing::open();
        insert(&t.db, "user@example.com").unwrap();
        match insert(&t.db, "USER@example.com") {
            Err(Error::Validation(errors)) => assert!(errors.has("email")),
            other => panic!("expected validation error, got {:?}", other.map(|(u, _)| u)),
        }
    }

    #[test]
    fn update_keeps_untouched_columns() {
        let t = testing::open();
        let (user, _) = insert(&t.db, "user@example.com").unwrap();

        t.db.update_user(
            user.id,
            &UserChanges {
                first_name: Some("Renamed"),
                ..Default::default()
            },
        )
        .unwrap();

        let stored = t.db.read(|r| r.user(user.id)).unwrap().unwrap();
        assert_eq!(stored.first_name, "Renamed");
        assert_eq!(stored.last_name, "User");
        assert_eq!(stored.email, "user@example.com");
    }

    #[test]
    fn update_may_keep_own_email() {
        let t = testing::open();
        let (user, _) = insert(&t.db, "user@example.com").unwrap();
        let (_other, _) = insert(&t.db, "other@example.com").unwrap();

        t.db.update_user(
            user.id,
            &UserChanges {
                email: Some("user@example.com"),
                ..Default::default()
            },
        )
        .unwrap();

        let taken = t.db.update_user(
            user.id,
            &UserChanges {
                email: Some("other@example.com"),
                ..Default::default()
            },
        );
        assert!(matches!(taken, Err(Error::Validation(_))));
    }

    #[test]
    fn failed_write_leaves_rows_intact() {
        let t = testing::open();
        let (user, _) = insert(&t.db, "user@example.com").unwrap();

        let res: Result<()> = t.db.with_conn_mut(|tx| {
            tx.execute("DELETE FROM walls WHERE user_id = ?1", [user.id.to_string()])
                .store()?;
            Err(Error::Internal("interrupted".into()))
        });
        assert!(res.is_err());

        assert!(t.db.read(|r| r.wall_for(user.id)).unwrap().is_some());
        t.db.destroy_user(user.id).unwrap();
        assert!(t.db.read(|r| r.user(user.id)).unwrap().is_none());
        assert!(t.db.read(|r| r.wall_for(user.id)).unwrap().is_none());
    }

    #[test]
    fn destroying_unknown_user_is_not_found() {
        let t = testing::open();
        let err = t.db.destroy_user(UserId::generate()).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "user", .. }));
    }
}
