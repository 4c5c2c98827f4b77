//! Friendship state machine.
//!
//! Per unordered pair of users the edge is absent, pending in one
//! direction, or accepted. Only the recipient of a pending edge can accept
//! it; either side can remove any edge.

use circle_types::models::{
    FriendState, Relationship, RelationshipId, RelationshipStatus, UserId,
};
use circle_types::{Error, Result};
use tracing::{debug, info};

use crate::Circle;
use crate::queries::ensure_user;

impl Circle {
    /// none -> pending(requester -> recipient).
    pub fn request_friend(&self, requester: UserId, recipient: UserId) -> Result<Relationship> {
        if requester == recipient {
            return Err(Error::invalid_transition("cannot send a friend request to yourself"));
        }

        let existing = self.db.read(|r| {
            ensure_user(r, requester)?;
            ensure_user(r, recipient)?;
            r.relationship_between(requester, recipient)
        })?;

        if let Some(edge) = existing {
            debug!(
                "Rejected friend request {} -> {}: edge {} is {}",
                requester,
                recipient,
                edge.id,
                edge.status.as_str()
            );
            return Err(Error::invalid_transition(match edge.state_for(requester) {
                FriendState::OutgoingPending => "friend request already sent",
                FriendState::IncomingPending => {
                    "a request from this user is pending; accept it instead"
                }
                FriendState::Friends => "already friends",
                FriendState::None => "relationship already exists",
            }));
        }

        // If another request for the pair commits between the read above
        // and this insert, the pair key rejects ours with Conflict.
        let edge = self.db.insert_pending_relationship(
            RelationshipId::generate(),
            requester,
            recipient,
            self.now(),
        )?;

        info!("Friend request {} -> {}", requester, recipient);
        Ok(edge)
    }

    /// pending(requester -> recipient) -> accepted. Must be called by the recipient.
    pub fn accept_friend(&self, recipient: UserId, requester: UserId) -> Result<Relationship> {
        if requester == recipient {
            return Err(Error::invalid_transition("cannot accept yourself as a friend"));
        }

        let existing = self.db.read(|r| {
            ensure_user(r, recipient)?;
            ensure_user(r, requester)?;
            r.relationship_between(recipient, requester)
        })?;

        let edge = match existing {
            Some(edge) if edge.status == RelationshipStatus::Accepted => {
                return Err(Error::invalid_transition("already friends"));
            }
            Some(edge) if edge.requester_id != requester => {
                debug!(
                    "Rejected accept by {}: they sent request {}",
                    recipient, edge.id
                );
                return Err(Error::invalid_transition(
                    "only the recipient of a friend request can accept it",
                ));
            }
            Some(edge) => edge,
            None => return Err(Error::invalid_transition("no pending friend request")),
        };

        let accepted = self
            .db
            .accept_pending_relationship(edge.id, recipient, self.now())?;

        info!("Friend request {} -> {} accepted", requester, recipient);
        Ok(accepted)
    }

    /// Removes the edge between `a` and `b` whatever its state. Either side may call it.
    pub fn unfriend(&self, a: UserId, b: UserId) -> Result<()> {
        self.db.read(|r| {
            ensure_user(r, a)?;
            ensure_user(r, b)
        })?;

        match self.db.delete_relationship_between(a, b)? {
            Some(edge) => {
                info!(
                    "Relationship {} between {} and {} removed (was {})",
                    edge.id,
                    a,
                    b,
                    edge.status.as_str()
                );
                Ok(())
            }
            None => Err(Error::not_found("relationship", format!("{}:{}", a, b))),
        }
    }

    pub fn relationship_between(&self, a: UserId, b: UserId) -> Result<Option<Relationship>> {
        self.db.read(|r| r.relationship_between(a, b))
    }

    /// How `b` relates to `a`, from `a`'s side.
    pub fn friend_state(&self, a: UserId, b: UserId) -> Result<FriendState> {
        Ok(self
            .relationship_between(a, b)?
            .map_or(FriendState::None, |edge| edge.state_for(a)))
    }
}
