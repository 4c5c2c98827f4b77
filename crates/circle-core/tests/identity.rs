mod common;

use circle_core::{Error, UserUpdate};

use common::{harness, new_user};

#[test]
fn email_is_stored_lower_case() {
    let h = harness();
    let mut input = new_user("mixed");
    input.email = "Foo@ExAMPle.CoM".into();

    let user = h.circle.create_user(&input).unwrap();
    assert_eq!(user.email, "foo@example.com");
    assert_eq!(h.circle.find_user(user.id).unwrap().email, "foo@example.com");
    assert_eq!(h.circle.find_user_by_email("FOO@example.com").unwrap(), user);
    assert_eq!(user.name(), "Example mixed");
}

#[test]
fn email_taken_ignoring_case() {
    let h = harness();
    let first = h.circle.create_user(&new_user("user")).unwrap();

    let mut dup = new_user("user");
    dup.email = "USER@EXAMPLE.COM".into();
    match h.circle.create_user(&dup) {
        Err(Error::Validation(errors)) => assert!(errors.has("email")),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(h.circle.find_user_by_email("user@example.com").unwrap(), first);
}

#[test]
fn every_user_gets_a_wall() {
    let h = harness();
    let user = h.user("user");
    let wall = h.circle.wall_for(user.id).unwrap();
    assert_eq!(wall.user_id, user.id);
    assert!(h.circle.user_exists(user.id).unwrap());
    assert!(!h.circle.user_exists(circle_core::UserId::generate()).unwrap());
    assert!(h.circle.wall_microposts(wall.id).unwrap().is_empty());
}

#[test]
fn invalid_registration_stores_nothing() {
    let h = harness();
    let mut input = new_user("user");
    input.first_name = " ".into();
    input.password_confirmation = "mismatch".into();

    match h.circle.create_user(&input) {
        Err(Error::Validation(errors)) => {
            assert!(errors.has("first_name"));
            assert!(errors.has("password_confirmation"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(matches!(
        h.circle.find_user_by_email("user@example.com"),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn authenticate_checks_password() {
    let h = harness();
    let user = h.user("user");

    assert_eq!(
        h.circle.authenticate("User@Example.com", "foobar").unwrap(),
        Some(user)
    );
    assert_eq!(h.circle.authenticate("user@example.com", "invalid").unwrap(), None);
    assert_eq!(h.circle.authenticate("nobody@example.com", "foobar").unwrap(), None);
}

#[test]
fn update_changes_only_given_fields() {
    let h = harness();
    let user = h.user("user");

    let updated = h
        .circle
        .update_user(
            user.id,
            &UserUpdate {
                first_name: Some("Renamed".into()),
                email: Some("New@Example.com".into()),
                password: Some("newsecret".into()),
                password_confirmation: Some("newsecret".into()),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(updated.first_name, "Renamed");
    assert_eq!(updated.last_name, user.last_name);
    assert_eq!(updated.email, "new@example.com");
    assert!(h.circle.authenticate("new@example.com", "newsecret").unwrap().is_some());
    assert!(h.circle.authenticate("new@example.com", "foobar").unwrap().is_none());
}

#[test]
fn update_validates_before_writing() {
    let h = harness();
    let user = h.user("user");
    h.user("other");

    let err = h
        .circle
        .update_user(
            user.id,
            &UserUpdate {
                last_name: Some("a".repeat(51)),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = h
        .circle
        .update_user(
            user.id,
            &UserUpdate {
                email: Some("OTHER@example.com".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(h.circle.find_user(user.id).unwrap(), user);
}
