//! Input checks run before any write is attempted.

use std::sync::LazyLock;

use circle_types::ValidationErrors;
use circle_types::api::{NewUser, UserUpdate};
use regex::Regex;

pub const NAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const MICROPOST_MAX_LEN: usize = 140;
pub const COMMENT_MAX_LEN: usize = 140;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_+\-.]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]+$").expect("email pattern compiles")
});

/// Trimmed and lower-cased, the form emails are stored and compared in.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn check_name(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "can't be blank");
    } else if value.trim().chars().count() > NAME_MAX_LEN {
        errors.add(field, format!("is too long (maximum is {} characters)", NAME_MAX_LEN));
    }
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.is_empty() {
        errors.add("email", "can't be blank");
    } else if !is_valid_email(email) {
        errors.add("email", "is invalid");
    }
}

fn check_password(errors: &mut ValidationErrors, password: &str, confirmation: Option<&str>) {
    if password.trim().is_empty() {
        errors.add("password", "can't be blank");
    } else if password.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            "password",
            format!("is too short (minimum is {} characters)", PASSWORD_MIN_LEN),
        );
    }
    match confirmation {
        Some(c) if c == password => {}
        Some(_) => errors.add("password_confirmation", "doesn't match password"),
        None => errors.add("password_confirmation", "can't be blank"),
    }
}

/// Checks a registration. `email` is the normalized address.
pub fn validate_new_user(user: &NewUser, email: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "first_name", &user.first_name);
    check_name(&mut errors, "last_name", &user.last_name);
    check_email(&mut errors, email);
    check_password(&mut errors, &user.password, Some(&user.password_confirmation));
    errors
}

/// Checks only the fields present in the update.
pub fn validate_update(update: &UserUpdate, email: Option<&str>) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if let Some(first) = &update.first_name {
        check_name(&mut errors, "first_name", first);
    }
    if let Some(last) = &update.last_name {
        check_name(&mut errors, "last_name", last);
    }
    if let Some(email) = email {
        check_email(&mut errors, email);
    }
    match (&update.password, &update.password_confirmation) {
        (Some(password), confirmation) => {
            check_password(&mut errors, password, confirmation.as_deref())
        }
        (None, Some(_)) => errors.add("password", "can't be blank"),
        (None, None) => {}
    }
    errors
}

/// Micropost and comment bodies: non-blank, at most `max` characters.
pub fn validate_body(body: &str, max: usize) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if body.trim().is_empty() {
        errors.add("body", "can't be blank");
    } else if body.chars().count() > max {
        errors.add("body", format!("is too long (maximum is {} characters)", max));
    }
    errors
}
