use circle_db::{InsertUser, UserChanges};
use circle_types::api::{NewUser, UserUpdate};
use circle_types::models::{User, UserId, Wall, WallId};
use circle_types::{Error, Result};
use tracing::info;

use crate::Circle;
use crate::password::{hash_password, verify_password};
use crate::validation::{normalize_email, validate_new_user, validate_update};

impl Circle {
    /// Registers a user. Their wall is created in the same transaction.
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let email = normalize_email(&new.email);
        validate_new_user(new, &email).into_result()?;

        let digest = hash_password(&new.password)?;
        let (user, wall) = self.db.create_user(
            &InsertUser {
                id: UserId::generate(),
                first_name: new.first_name.trim(),
                last_name: new.last_name.trim(),
                email: &email,
                password_digest: &digest,
                created_at: self.now(),
            },
            WallId::generate(),
        )?;

        info!("User {} created with wall {}", user.id, wall.id);
        Ok(user)
    }

    pub fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<User> {
        let email = update.email.as_deref().map(normalize_email);
        validate_update(update, email.as_deref()).into_result()?;

        if !update.is_empty() {
            let digest = update.password.as_deref().map(hash_password).transpose()?;
            self.db.update_user(
                id,
                &UserChanges {
                    first_name: update.first_name.as_deref().map(str::trim),
                    last_name: update.last_name.as_deref().map(str::trim),
                    email: email.as_deref(),
                    password_digest: digest.as_deref(),
                },
            )?;
            info!("User {} updated", id);
        }

        self.find_user(id)
    }

    pub fn find_user(&self, id: UserId) -> Result<User> {
        self.db
            .read(|r| r.user(id))?
            .ok_or_else(|| Error::not_found("user", id))
    }

    /// Case-insensitive.
    pub fn find_user_by_email(&self, email: &str) -> Result<User> {
        let email = normalize_email(email);
        self.db
            .read(|r| r.user_row_by_email(&email))?
            .map(User::try_from)
            .transpose()?
            .ok_or_else(|| Error::not_found("user", &email))
    }

    pub fn user_exists(&self, id: UserId) -> Result<bool> {
        self.db.read(|r| r.user_exists(id))
    }

    /// `Some(user)` when the password matches, `None` for an unknown email
    /// or a wrong password.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        let Some(row) = self.db.read(|r| r.user_row_by_email(&email))? else {
            return Ok(None);
        };
        if !verify_password(password, &row.password_digest)? {
            return Ok(None);
        }
        User::try_from(row).map(Some)
    }

    pub fn wall_for(&self, user: UserId) -> Result<Wall> {
        self.db
            .read(|r| r.wall_for(user))?
            .ok_or_else(|| Error::not_found("wall", user))
    }
}
