use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::db;
use crate::error::{is_unique_violation, StoreError};
use crate::models::{Identity, Poll, PollOption, VoteRecord};

/// The storage backend. Owns the persisted medium exclusively; every
/// application-level operation goes through here.
///
/// The pool is initialized lazily: the first operation to arrive runs
/// connect-and-bootstrap, and concurrent first calls share that single
/// in-flight initialization rather than opening the database twice.
#[derive(Clone)]
pub struct Store {
    url: String,
    pool: Arc<OnceCell<SqlitePool>>,
}

#[derive(sqlx::FromRow)]
struct PollRow {
    id: String,
    question: String,
    created_at: DateTime<Utc>,
    votes_count: i64,
}

impl PollRow {
    fn into_poll(self, options: Vec<PollOption>, has_voted: bool) -> Poll {
        Poll {
            id: self.id,
            question: self.question,
            options,
            created_at: self.created_at,
            votes_count: self.votes_count,
            has_voted,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OptionRow {
    id: String,
    poll_id: String,
    text: String,
    image_url: Option<String>,
    votes: i64,
}

impl OptionRow {
    fn into_option(self) -> PollOption {
        PollOption {
            id: self.id,
            text: self.text,
            votes: self.votes,
            image_url: self.image_url,
        }
    }
}

impl Store {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool: Arc::new(OnceCell::new()),
        }
    }

    /// Store backed by a private in-memory database. Used by tests.
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    async fn pool(&self) -> Result<&SqlitePool, StoreError> {
        Ok(self
            .pool
            .get_or_try_init(|| db::connect(&self.url))
            .await?)
    }

    /// Force initialization up front so configuration problems surface at
    /// startup instead of on the first request.
    pub async fn init(&self) -> Result<(), StoreError> {
        self.pool().await.map(|_| ())
    }

    /// Insert a new poll with zero votes on every option. Rejects an id that
    /// already exists rather than overwriting it.
    pub async fn create_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        let mut tx = pool.begin().await?;

        sqlx::query("INSERT INTO polls (id, question, created_at, votes_count) VALUES (?, ?, ?, 0)")
            .bind(&poll.id)
            .bind(&poll.question)
            .bind(poll.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::DuplicateId
                } else {
                    err.into()
                }
            })?;

        for (position, option) in poll.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO poll_options (id, poll_id, position, text, image_url, votes) \
                 VALUES (?, ?, ?, ?, ?, 0)",
            )
            .bind(&option.id)
            .bind(&poll.id)
            .bind(position as i64)
            .bind(&option.text)
            .bind(&option.image_url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(poll_id = %poll.id, "poll created");
        Ok(())
    }

    /// All polls, newest first, each annotated with whether `identity_id`
    /// has voted on it.
    pub async fn list_polls(&self, identity_id: &str) -> Result<Vec<Poll>, StoreError> {
        let pool = self.pool().await?;

        let polls: Vec<PollRow> = sqlx::query_as(
            "SELECT id, question, created_at, votes_count FROM polls \
             ORDER BY created_at DESC, id",
        )
        .fetch_all(pool)
        .await?;

        let options: Vec<OptionRow> = sqlx::query_as(
            "SELECT id, poll_id, text, image_url, votes FROM poll_options \
             ORDER BY poll_id, position",
        )
        .fetch_all(pool)
        .await?;

        let voted: HashSet<String> =
            sqlx::query_scalar("SELECT poll_id FROM votes WHERE identity_id = ?")
                .bind(identity_id)
                .fetch_all(pool)
                .await?
                .into_iter()
                .collect();

        let mut options_by_poll: HashMap<String, Vec<PollOption>> = HashMap::new();
        for row in options {
            options_by_poll
                .entry(row.poll_id.clone())
                .or_default()
                .push(row.into_option());
        }

        Ok(polls
            .into_iter()
            .map(|row| {
                let has_voted = voted.contains(&row.id);
                let opts = options_by_poll.remove(&row.id).unwrap_or_default();
                row.into_poll(opts, has_voted)
            })
            .collect())
    }

    pub async fn get_poll(&self, poll_id: &str, identity_id: &str) -> Result<Poll, StoreError> {
        let pool = self.pool().await?;

        let row: PollRow =
            sqlx::query_as("SELECT id, question, created_at, votes_count FROM polls WHERE id = ?")
                .bind(poll_id)
                .fetch_optional(pool)
                .await?
                .ok_or(StoreError::NotFound)?;

        let options: Vec<OptionRow> = sqlx::query_as(
            "SELECT id, poll_id, text, image_url, votes FROM poll_options \
             WHERE poll_id = ? ORDER BY position",
        )
        .bind(poll_id)
        .fetch_all(pool)
        .await?;

        let has_voted: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM votes WHERE poll_id = ? AND identity_id = ?)",
        )
        .bind(poll_id)
        .bind(identity_id)
        .fetch_one(pool)
        .await?;

        Ok(row.into_poll(options.into_iter().map(OptionRow::into_option).collect(), has_voted))
    }

    /// Cast a vote. One transaction covers the duplicate check, the vote
    /// record insert, the option increment and the aggregate increment;
    /// any failure rolls the whole unit back, so no partial state is ever
    /// observable.
    pub async fn vote(
        &self,
        poll_id: &str,
        option_id: &str,
        identity_id: &str,
    ) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        let mut tx = pool.begin().await?;

        let poll_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM polls WHERE id = ?)")
            .bind(poll_id)
            .fetch_one(&mut *tx)
            .await?;
        if !poll_exists {
            return Err(StoreError::NotFound);
        }

        let already_voted: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM votes WHERE poll_id = ? AND identity_id = ?)",
        )
        .bind(poll_id)
        .bind(identity_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_voted {
            return Err(StoreError::AlreadyVoted);
        }

        let updated = sqlx::query("UPDATE poll_options SET votes = votes + 1 WHERE id = ? AND poll_id = ?")
            .bind(option_id)
            .bind(poll_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::OptionNotFound);
        }

        // The composite primary key backs up the check above: even if a
        // duplicate slipped past it, the insert itself would refuse.
        sqlx::query("INSERT INTO votes (poll_id, identity_id, option_id, cast_at) VALUES (?, ?, ?, ?)")
            .bind(poll_id)
            .bind(identity_id)
            .bind(option_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::AlreadyVoted
                } else {
                    err.into()
                }
            })?;

        sqlx::query("UPDATE polls SET votes_count = votes_count + 1 WHERE id = ?")
            .bind(poll_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(poll_id, option_id, identity_id, "vote recorded");
        Ok(())
    }

    /// Remove a poll together with its options and vote records in one
    /// transaction. Returns `Ok(false)` when the poll does not exist.
    pub async fn delete_poll(&self, poll_id: &str) -> Result<bool, StoreError> {
        let pool = self.pool().await?;
        let mut tx = pool.begin().await?;

        let poll_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM polls WHERE id = ?)")
            .bind(poll_id)
            .fetch_one(&mut *tx)
            .await?;
        if !poll_exists {
            return Ok(false);
        }

        sqlx::query("DELETE FROM votes WHERE poll_id = ?")
            .bind(poll_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM poll_options WHERE poll_id = ?")
            .bind(poll_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM polls WHERE id = ?")
            .bind(poll_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(poll_id, "poll deleted");
        Ok(true)
    }

    /// Vote records for a poll, oldest first.
    pub async fn votes_for_poll(&self, poll_id: &str) -> Result<Vec<VoteRecord>, StoreError> {
        let pool = self.pool().await?;
        let votes = sqlx::query_as(
            "SELECT poll_id, identity_id, option_id, cast_at FROM votes \
             WHERE poll_id = ? ORDER BY cast_at, identity_id",
        )
        .bind(poll_id)
        .fetch_all(pool)
        .await?;
        Ok(votes)
    }

    /// Stored identity, or a default-named one when nothing is stored. The
    /// fallback also covers lookup faults: this call always yields a usable
    /// identity.
    pub async fn get_user_info(&self, identity_id: &str) -> Identity {
        let lookup = async {
            let pool = self.pool().await?;
            let identity: Option<Identity> =
                sqlx::query_as("SELECT id, username FROM identities WHERE id = ?")
                    .bind(identity_id)
                    .fetch_optional(pool)
                    .await?;
            Ok::<_, StoreError>(identity)
        };

        match lookup.await {
            Ok(Some(identity)) => identity,
            Ok(None) => Identity::default_for(identity_id),
            Err(err) => {
                warn!(%err, identity_id, "identity lookup failed, using default identity");
                Identity::default_for(identity_id)
            }
        }
    }

    pub async fn update_username(&self, identity_id: &str, username: &str) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        sqlx::query(
            "INSERT INTO identities (id, username) VALUES (?, ?) \
             ON CONFLICT(id) DO UPDATE SET username = excluded.username",
        )
        .bind(identity_id)
        .bind(username)
        .execute(pool)
        .await?;
        Ok(())
    }
}
