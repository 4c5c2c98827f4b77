use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(UserId);
entity_id!(WallId);
entity_id!(MicropostId);
entity_id!(CommentId);
entity_id!(RelationshipId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    /// Always lower-case.
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Every user owns exactly one wall, created together with the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    pub id: WallId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Micropost {
    pub id: MicropostId,
    pub author_id: UserId,
    /// Usually the author's own wall, but any wall may be posted to.
    pub wall_id: WallId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author_id: UserId,
    pub micropost_id: MicropostId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    Pending,
    Accepted,
}

impl RelationshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }
}

impl FromStr for RelationshipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            other => Err(format!("unknown relationship status '{}'", other)),
        }
    }
}

/// A friendship edge. Direction only carries meaning while pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub requester_id: UserId,
    pub recipient_id: UserId,
    pub status: RelationshipStatus,
    pub requested_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Relationship {
    pub fn involves(&self, user: UserId) -> bool {
        self.requester_id == user || self.recipient_id == user
    }

    /// The endpoint that is not `user`, or `None` if `user` is not on this edge.
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if self.requester_id == user {
            Some(self.recipient_id)
        } else if self.recipient_id == user {
            Some(self.requester_id)
        } else {
            None
        }
    }

    /// How the pair looks from `user`'s side.
    pub fn state_for(&self, user: UserId) -> FriendState {
        match self.status {
            RelationshipStatus::Accepted => FriendState::Friends,
            RelationshipStatus::Pending if self.requester_id == user => {
                FriendState::OutgoingPending
            }
            RelationshipStatus::Pending => FriendState::IncomingPending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendState {
    None,
    OutgoingPending,
    IncomingPending,
    Friends,
}

/// A user's page, read from a single snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: User,
    pub wall: Wall,
    pub friends: Vec<UserId>,
    pub incoming_pending: Vec<UserId>,
    pub outgoing_pending: Vec<UserId>,
    pub microposts: Vec<Micropost>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(requester: UserId, recipient: UserId) -> Relationship {
        Relationship {
            id: RelationshipId::generate(),
            requester_id: requester,
            recipient_id: recipient,
            status: RelationshipStatus::Pending,
            requested_at: Utc::now(),
            accepted_at: None,
        }
    }

    #[test]
    fn pending_edge_is_directional() {
        let a = UserId::generate();
        let b = UserId::generate();
        let edge = pending(a, b);

        assert_eq!(edge.state_for(a), FriendState::OutgoingPending);
        assert_eq!(edge.state_for(b), FriendState::IncomingPending);
        assert_eq!(edge.other(a), Some(b));
        assert_eq!(edge.other(UserId::generate()), None);
    }

    #[test]
    fn accepted_edge_is_symmetric() {
        let a = UserId::generate();
        let b = UserId::generate();
        let mut edge = pending(a, b);
        edge.status = RelationshipStatus::Accepted;

        assert_eq!(edge.state_for(a), FriendState::Friends);
        assert_eq!(edge.state_for(b), FriendState::Friends);
    }

    #[test]
    fn ids_serialize_as_bare_uuids() {
        let id = UserId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
        assert_eq!(id.to_string().parse::<UserId>().unwrap(), id);
    }

    #[test]
    fn status_parses_its_own_name() {
        for status in [RelationshipStatus::Pending, RelationshipStatus::Accepted] {
            assert_eq!(status.as_str().parse::<RelationshipStatus>(), Ok(status));
        }
        assert!("blocked".parse::<RelationshipStatus>().is_err());
    }
}
