#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use circle_core::clock::ManualClock;
use circle_core::config::Config;
use circle_core::{Circle, NewUser, User};
use tempfile::TempDir;

pub struct Harness {
    pub circle: Circle,
    pub clock: Arc<ManualClock>,
    _dir: TempDir,
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let dir = TempDir::new().unwrap();
    let config = Config {
        db_path: dir.path().join("circle.db"),
        ..Config::default()
    };
    let clock = Arc::new(ManualClock::new(start()));
    let circle = Circle::open_with_clock(&config, clock.clone()).unwrap();

    Harness {
        circle,
        clock,
        _dir: dir,
    }
}

pub fn new_user(handle: &str) -> NewUser {
    NewUser {
        first_name: "Example".into(),
        last_name: handle.into(),
        email: format!("{}@example.com", handle),
        password: "foobar".into(),
        password_confirmation: "foobar".into(),
    }
}

impl Harness {
    pub fn user(&self, handle: &str) -> User {
        self.circle.create_user(&new_user(handle)).unwrap()
    }

    /// `a` asks, `b` accepts.
    pub fn befriend(&self, a: &User, b: &User) {
        self.circle.request_friend(a.id, b.id).unwrap();
        self.circle.accept_friend(b.id, a.id).unwrap();
    }
}
