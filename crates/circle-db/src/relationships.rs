use chrono::{DateTime, Utc};
use circle_types::models::{Relationship, RelationshipId, RelationshipStatus, UserId};
use circle_types::{Error, Result};
use rusqlite::params;

use crate::models::{format_ts, pair_key};
use crate::queries::{relationship_row, user_exists};
use crate::{Database, SqlResultExt};

impl Database {
    /// Inserts a pending edge. The canonical pair key is unique, so if any
    /// edge between the two users already exists (in either direction) the
    /// insert fails with `Conflict`.
    pub fn insert_pending_relationship(
        &self,
        id: RelationshipId,
        requester: UserId,
        recipient: UserId,
        requested_at: DateTime<Utc>,
    ) -> Result<Relationship> {
        self.with_conn_mut(|tx| {
            for user in [requester, recipient] {
                if !user_exists(tx, user)? {
                    return Err(Error::not_found("user", user));
                }
            }

            let (low, high) = pair_key(requester, recipient);
            tx.execute(
                "INSERT INTO relationships
                    (id, requester_id, recipient_id, user_low, user_high, status, requested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
                params![
                    id.to_string(),
                    requester.to_string(),
                    recipient.to_string(),
                    low,
                    high,
                    format_ts(requested_at),
                ],
            )
            .store()?;

            Ok(Relationship {
                id,
                requester_id: requester,
                recipient_id: recipient,
                status: RelationshipStatus::Pending,
                requested_at,
                accepted_at: None,
            })
        })
    }

    /// Flips a pending edge addressed to `recipient` to accepted. Fails with
    /// `Conflict` if the edge is no longer pending for that recipient.
    pub fn accept_pending_relationship(
        &self,
        id: RelationshipId,
        recipient: UserId,
        accepted_at: DateTime<Utc>,
    ) -> Result<Relationship> {
        self.with_conn_mut(|tx| {
            let row = tx
                .query_row(
                    "UPDATE relationships SET status = 'accepted', accepted_at = ?3
                     WHERE id = ?1 AND recipient_id = ?2 AND status = 'pending'
                     RETURNING id, requester_id, recipient_id, status, requested_at, accepted_at",
                    params![id.to_string(), recipient.to_string(), format_ts(accepted_at)],
                    relationship_row,
                )
                .optional()?
                .ok_or_else(|| Error::Conflict(format!("relationship {} changed concurrently", id)))?;

            Relationship::try_from(row)
        })
    }

    /// Deletes whatever edge joins the pair, pending or accepted.
    /// Returns the removed edge, or `None` if there was none.
    pub fn delete_relationship_between(&self, a: UserId, b: UserId) -> Result<Option<Relationship>> {
        self.with_conn_mut(|tx| {
            let (low, high) = pair_key(a, b);
            tx.query_row(
                "DELETE FROM relationships WHERE user_low = ?1 AND user_high = ?2
                 RETURNING id, requester_id, recipient_id, status, requested_at, accepted_at",
                [low, high],
                relationship_row,
            )
            .optional()?
            .map(Relationship::try_from)
            .transpose()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::users::InsertUser;
    use circle_types::models::WallId;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn user(db: &Database, email: &str) -> UserId {
        let id = UserId::generate();
        db.create_user(
            &InsertUser {
                id,
                first_name: "Example",
                last_name: "User",
                email,
                password_digest: "$argon2id$stub",
                created_at: testing::now(),
            },
            WallId::generate(),
        )
        .unwrap();
        id
    }

    #[test]
    fn second_edge_for_pair_conflicts() {
        let t = testing::open();
        let a = user(&t.db, "a@example.com");
        let b = user(&t.db, "b@example.com");

        t.db.insert_pending_relationship(RelationshipId::generate(), a, b, testing::now())
            .unwrap();
        let err = t
            .db
            .insert_pending_relationship(RelationshipId::generate(), b, a, testing::now())
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn racing_requests_leave_one_edge() {
        let t = testing::open();
        let a = user(&t.db, "a@example.com");
        let b = user(&t.db, "b@example.com");
        let db = Arc::new(t.db);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [(a, b), (b, a)]
            .into_iter()
            .map(|(from, to)| {
                let db = Arc::clone(&db);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    db.insert_pending_relationship(RelationshipId::generate(), from, to, testing::now())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(Error::Conflict(_)))));

        let edge = db.read(|r| r.relationship_between(a, b)).unwrap();
        assert!(edge.is_some());
    }

    #[test]
    fn accept_only_applies_to_the_recipient() {
        let t = testing::open();
        let a = user(&t.db, "a@example.com");
        let b = user(&t.db, "b@example.com");
        let edge = t
            .db
            .insert_pending_relationship(RelationshipId::generate(), a, b, testing::now())
            .unwrap();

        let wrong = t.db.accept_pending_relationship(edge.id, a, testing::now());
        assert!(matches!(wrong, Err(Error::Conflict(_))));

        let accepted = t.db.accept_pending_relationship(edge.id, b, testing::now()).unwrap();
        assert_eq!(accepted.status, RelationshipStatus::Accepted);
        assert!(accepted.accepted_at.is_some());

        // Already accepted
        let again = t.db.accept_pending_relationship(edge.id, b, testing::now());
        assert!(matches!(again, Err(Error::Conflict(_))));
    }

    #[test]
    fn delete_returns_removed_edge() {
        let t = testing::open();
        let a = user(&t.db, "a@example.com");
        let b = user(&t.db, "b@example.com");
        t.db.insert_pending_relationship(RelationshipId::generate(), a, b, testing::now())
            .unwrap();

        let removed = t.db.delete_relationship_between(b, a).unwrap().unwrap();
        assert_eq!(removed.requester_id, a);
        assert!(t.db.delete_relationship_between(a, b).unwrap().is_none());
    }

    #[test]
    fn unknown_user_cannot_be_requested() {
        let t = testing::open();
        let a = user(&t.db, "a@example.com");
        let err = t
            .db
            .insert_pending_relationship(RelationshipId::generate(), a, UserId::generate(), testing::now())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "user", .. }));
    }
}
