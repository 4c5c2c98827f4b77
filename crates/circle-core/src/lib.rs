//! Friend relationships and user-owned content.
//!
//! [`Circle`] is the single entry point. Callers resolve who the acting user
//! is and whether they may act; every operation here takes explicit user ids
//! and never consults session state. Writes are one transaction each, and
//! reads that touch several tables run against one snapshot.

pub mod clock;
pub mod config;
pub mod content;
pub mod identity;
pub mod password;
pub mod queries;
pub mod relationships;
pub mod validation;

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Timelike, Utc};
use circle_db::Database;
use tracing::info;

pub use circle_types::api::{NewUser, UserUpdate};
pub use circle_types::models::*;
pub use circle_types::{Error, ValidationErrors};

use clock::{Clock, SystemClock};
use config::Config;

pub struct Circle {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl Circle {
    pub fn open(config: &Config) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let db = Database::open(&config.db_path, &config.db_options())?;
        info!("Circle ready ({})", config.db_path.display());
        Ok(Self::new(db, clock))
    }

    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Current time, truncated to the microsecond precision the store keeps.
    fn now(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
            .unwrap_or(now)
    }
}
