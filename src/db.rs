use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Logical schema: three relations plus the per-poll option rows. The
/// composite primary key on `votes` is the enforcement point for one vote per
/// identity per poll.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS polls (
    id          TEXT PRIMARY KEY,
    question    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    votes_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS poll_options (
    id        TEXT PRIMARY KEY,
    poll_id   TEXT NOT NULL REFERENCES polls(id),
    position  INTEGER NOT NULL,
    text      TEXT NOT NULL,
    image_url TEXT,
    votes     INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_poll_options_poll_id ON poll_options(poll_id);

CREATE TABLE IF NOT EXISTS votes (
    poll_id     TEXT NOT NULL,
    identity_id TEXT NOT NULL,
    option_id   TEXT NOT NULL,
    cast_at     TEXT NOT NULL,
    PRIMARY KEY (poll_id, identity_id)
);

CREATE INDEX IF NOT EXISTS idx_votes_poll_id ON votes(poll_id);

CREATE TABLE IF NOT EXISTS identities (
    id       TEXT PRIMARY KEY,
    username TEXT NOT NULL
);
";

/// Open the SQLite pool and bootstrap the schema.
///
/// A single connection keeps all backend operations sequenced, which is the
/// whole concurrency model here: one logical writer, multi-step mutations
/// wrapped in transactions. It also keeps `sqlite::memory:` databases alive
/// for the lifetime of the pool.
pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::raw_sql(SCHEMA).execute(&pool).await?;
    info!(%url, "database ready");

    Ok(pool)
}
