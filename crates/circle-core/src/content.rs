use circle_types::models::{Comment, CommentId, Micropost, MicropostId, UserId, WallId};
use circle_types::{Error, Result};
use tracing::info;

use crate::Circle;
use crate::validation::{COMMENT_MAX_LEN, MICROPOST_MAX_LEN, validate_body};

impl Circle {
    /// Posts `body` to `wall` as `author`. The wall need not be the author's own.
    pub fn create_micropost(&self, author: UserId, wall: WallId, body: &str) -> Result<Micropost> {
        validate_body(body, MICROPOST_MAX_LEN).into_result()?;

        let post = self.db.insert_micropost(
            MicropostId::generate(),
            author,
            wall,
            body,
            self.now(),
        )?;

        info!("Micropost {} by {} on wall {}", post.id, author, wall);
        Ok(post)
    }

    /// Comments on any micropost, whoever owns it.
    pub fn create_comment(
        &self,
        author: UserId,
        micropost: MicropostId,
        body: &str,
    ) -> Result<Comment> {
        validate_body(body, COMMENT_MAX_LEN).into_result()?;

        let comment = self.db.insert_comment(
            CommentId::generate(),
            author,
            micropost,
            body,
            self.now(),
        )?;

        info!("Comment {} by {} on micropost {}", comment.id, author, micropost);
        Ok(comment)
    }

    pub fn find_micropost(&self, id: MicropostId) -> Result<Micropost> {
        self.db
            .read(|r| r.micropost(id))?
            .ok_or_else(|| Error::not_found("micropost", id))
    }

    pub fn find_comment(&self, id: CommentId) -> Result<Comment> {
        self.db
            .read(|r| r.comment(id))?
            .ok_or_else(|| Error::not_found("comment", id))
    }

    /// Whether the caller may destroy it is decided before calling.
    pub fn destroy_micropost(&self, id: MicropostId) -> Result<()> {
        self.db.delete_micropost(id)?;
        info!("Micropost {} destroyed", id);
        Ok(())
    }

    pub fn destroy_comment(&self, id: CommentId) -> Result<()> {
        self.db.delete_comment(id)?;
        info!("Comment {} destroyed", id);
        Ok(())
    }

    /// Deletes the user with their microposts, comments, relationships and
    /// wall, all or nothing.
    pub fn destroy_user(&self, id: UserId) -> Result<()> {
        let removed = self.db.destroy_user(id)?;
        info!(
            "User {} destroyed ({} microposts, {} comments, {} relationships)",
            id, removed.microposts, removed.comments, removed.relationships
        );
        Ok(())
    }
}
