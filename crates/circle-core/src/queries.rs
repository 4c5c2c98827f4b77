//! Read-only composition over relationships and content. Each call runs
//! inside one read snapshot, so lists that span tables never mix states
//! from before and after a concurrent write.

use std::collections::HashSet;

use circle_db::Reader;
use circle_types::models::{Comment, Micropost, MicropostId, Profile, UserId, WallId};
use circle_types::{Error, Result};

use crate::Circle;

pub(crate) fn ensure_user(r: &Reader<'_>, id: UserId) -> Result<()> {
    if r.user_exists(id)? {
        Ok(())
    } else {
        Err(Error::not_found("user", id))
    }
}

impl Circle {
    pub fn friends(&self, user: UserId) -> Result<Vec<UserId>> {
        self.db.read(|r| {
            ensure_user(r, user)?;
            r.friends(user)
        })
    }

    /// Users who have asked `user` and are waiting for an answer.
    pub fn incoming_pending(&self, user: UserId) -> Result<Vec<UserId>> {
        self.db.read(|r| {
            ensure_user(r, user)?;
            r.incoming_pending(user)
        })
    }

    /// Users `user` has asked.
    pub fn outgoing_pending(&self, user: UserId) -> Result<Vec<UserId>> {
        self.db.read(|r| {
            ensure_user(r, user)?;
            r.outgoing_pending(user)
        })
    }

    /// Friends of both `a` and `b`, in `a`'s friend-list order.
    pub fn mutual_friends(&self, a: UserId, b: UserId) -> Result<Vec<UserId>> {
        self.db.read(|r| {
            ensure_user(r, a)?;
            ensure_user(r, b)?;
            let of_b: HashSet<UserId> = r.friends(b)?.into_iter().collect();
            Ok(r
                .friends(a)?
                .into_iter()
                .filter(|friend| of_b.contains(friend))
                .collect())
        })
    }

    /// Everything `user` has posted, newest first.
    pub fn microposts_by_user(&self, user: UserId) -> Result<Vec<Micropost>> {
        self.db.read(|r| {
            ensure_user(r, user)?;
            r.microposts_by_author(user)
        })
    }

    /// Everything `user` has commented, newest first.
    pub fn comments_by_user(&self, user: UserId) -> Result<Vec<Comment>> {
        self.db.read(|r| {
            ensure_user(r, user)?;
            r.comments_by_author(user)
        })
    }

    /// Posts made to a wall by anyone, newest first.
    pub fn wall_microposts(&self, wall: WallId) -> Result<Vec<Micropost>> {
        self.db.read(|r| {
            if r.wall(wall)?.is_none() {
                return Err(Error::not_found("wall", wall));
            }
            r.microposts_on_wall(wall)
        })
    }

    /// Comments under a micropost, oldest first.
    pub fn comments_on(&self, micropost: MicropostId) -> Result<Vec<Comment>> {
        self.db.read(|r| {
            if r.micropost(micropost)?.is_none() {
                return Err(Error::not_found("micropost", micropost));
            }
            r.comments_on(micropost)
        })
    }

    /// Home feed: `user`'s posts plus their friends' posts, newest first.
    /// Pending requests do not count.
    pub fn feed(&self, user: UserId) -> Result<Vec<Micropost>> {
        self.db.read(|r| {
            ensure_user(r, user)?;
            r.feed(user)
        })
    }

    pub fn profile(&self, user: UserId) -> Result<Profile> {
        self.db.read(|r| {
            let Some(found) = r.user(user)? else {
                return Err(Error::not_found("user", user));
            };
            let wall = r
                .wall_for(user)?
                .ok_or_else(|| Error::Internal(format!("user {} has no wall", user)))?;

            Ok(Profile {
                user: found,
                wall,
                friends: r.friends(user)?,
                incoming_pending: r.incoming_pending(user)?,
                outgoing_pending: r.outgoing_pending(user)?,
                microposts: r.microposts_by_author(user)?,
            })
        })
    }
}
