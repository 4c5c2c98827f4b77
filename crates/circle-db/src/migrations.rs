use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        // Content tables carry an AUTOINCREMENT `seq` that breaks timestamp
        // ties. comments.micropost_id and microposts.wall_id are plain
        // references: content is owned by its author, not by what it targets.
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                first_name      TEXT NOT NULL,
                last_name       TEXT NOT NULL,
                email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_digest TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE walls (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL UNIQUE REFERENCES users(id),
                created_at  TEXT NOT NULL
            );

            CREATE TABLE relationships (
                seq           INTEGER PRIMARY KEY AUTOINCREMENT,
                id            TEXT NOT NULL UNIQUE,
                requester_id  TEXT NOT NULL REFERENCES users(id),
                recipient_id  TEXT NOT NULL REFERENCES users(id),
                user_low      TEXT NOT NULL,
                user_high     TEXT NOT NULL,
                status        TEXT NOT NULL CHECK (status IN ('pending', 'accepted')),
                requested_at  TEXT NOT NULL,
                accepted_at   TEXT,
                CHECK (requester_id <> recipient_id),
                CHECK (user_low < user_high),
                UNIQUE (user_low, user_high)
            );

            CREATE INDEX idx_relationships_requester
                ON relationships(requester_id, status);
            CREATE INDEX idx_relationships_recipient
                ON relationships(recipient_id, status);

            CREATE TABLE microposts (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT NOT NULL UNIQUE,
                author_id   TEXT NOT NULL REFERENCES users(id),
                wall_id     TEXT NOT NULL,
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_microposts_author
                ON microposts(author_id, created_at, seq);
            CREATE INDEX idx_microposts_wall
                ON microposts(wall_id, created_at, seq);

            CREATE TABLE comments (
                seq           INTEGER PRIMARY KEY AUTOINCREMENT,
                id            TEXT NOT NULL UNIQUE,
                author_id     TEXT NOT NULL REFERENCES users(id),
                micropost_id  TEXT NOT NULL,
                body          TEXT NOT NULL,
                created_at    TEXT NOT NULL
            );

            CREATE INDEX idx_comments_author
                ON comments(author_id, created_at, seq);
            CREATE INDEX idx_comments_micropost
                ON comments(micropost_id, created_at, seq);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
