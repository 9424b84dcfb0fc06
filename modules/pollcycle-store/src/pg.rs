//! Postgres-backed PollStore.
//!
//! The `status` column on the poll row is the single source of truth; the
//! "status index" is a btree index over that column, so listing by status
//! can never disagree with the record. This is what makes the one-status-
//! collection invariant crash-safe: there is no separate membership set to
//! drift.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use pollcycle_common::{AppSettings, PollRecord, PollStatistics, PollStatus};

use crate::store::PollStore;

#[derive(Clone)]
pub struct PgPollStore {
    pool: PgPool,
}

impl PgPollStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS polls (
                id                 TEXT         PRIMARY KEY,
                data               JSONB        NOT NULL,
                status             TEXT         NOT NULL,
                grounding_post_ids TEXT[]       NOT NULL DEFAULT '{}',
                created_at         TIMESTAMPTZ  NOT NULL,
                updated_at         TIMESTAMPTZ  NOT NULL,
                moderated_at       TIMESTAMPTZ,
                moderator_notes    TEXT         NOT NULL DEFAULT '',
                published_poll_ref TEXT,
                published_url      TEXT,
                publish_error      TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS polls_status_idx ON polls (status)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS polls_created_at_idx ON polls (created_at DESC)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS used_posts (
                post_id   TEXT         PRIMARY KEY,
                marked_at TIMESTAMPTZ  NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS app_settings (
                id   BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (id),
                data JSONB   NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_poll(row: &PgRow) -> Result<PollRecord> {
    let data: serde_json::Value = row.try_get("data")?;
    let status: String = row.try_get("status")?;
    Ok(PollRecord {
        id: row.try_get("id")?,
        data: serde_json::from_value(data).context("Invalid poll data payload")?,
        status: status.parse()?,
        grounding_post_ids: row.try_get("grounding_post_ids")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        moderated_at: row.try_get("moderated_at")?,
        moderator_notes: row.try_get("moderator_notes")?,
        published_poll_ref: row.try_get("published_poll_ref")?,
        published_url: row.try_get("published_url")?,
        publish_error: row.try_get("publish_error")?,
    })
}

#[async_trait]
impl PollStore for PgPollStore {
    async fn save_poll(&self, poll: &PollRecord) -> Result<()> {
        let data = serde_json::to_value(&poll.data).context("Failed to serialize poll data")?;
        sqlx::query(
            r#"
            INSERT INTO polls (
                id, data, status, grounding_post_ids, created_at, updated_at,
                moderated_at, moderator_notes, published_poll_ref, published_url,
                publish_error
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                data               = EXCLUDED.data,
                status             = EXCLUDED.status,
                grounding_post_ids = EXCLUDED.grounding_post_ids,
                updated_at         = EXCLUDED.updated_at,
                moderated_at       = EXCLUDED.moderated_at,
                moderator_notes    = EXCLUDED.moderator_notes,
                published_poll_ref = EXCLUDED.published_poll_ref,
                published_url      = EXCLUDED.published_url,
                publish_error      = EXCLUDED.publish_error
            "#,
        )
        .bind(&poll.id)
        .bind(data)
        .bind(poll.status.as_str())
        .bind(&poll.grounding_post_ids)
        .bind(poll.created_at)
        .bind(poll.updated_at)
        .bind(poll.moderated_at)
        .bind(&poll.moderator_notes)
        .bind(&poll.published_poll_ref)
        .bind(&poll.published_url)
        .bind(&poll.publish_error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_poll(&self, id: &str) -> Result<Option<PollRecord>> {
        let row = sqlx::query("SELECT * FROM polls WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_poll).transpose()
    }

    async fn delete_poll(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn polls_by_status(&self, status: PollStatus) -> Result<Vec<PollRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM polls WHERE status = $1 ORDER BY created_at DESC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_poll).collect()
    }

    async fn list_polls(&self, page: u32, page_size: u32) -> Result<Vec<PollRecord>> {
        let offset = (page.max(1) as i64 - 1) * page_size as i64;
        let rows = sqlx::query(
            "SELECT * FROM polls ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_poll).collect()
    }

    async fn statistics(&self) -> Result<PollStatistics> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM polls GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut stats = PollStatistics::default();
        for row in &rows {
            let status: String = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;
            match status.parse::<PollStatus>() {
                Ok(status) => stats.set_count(status, count as u64),
                Err(_) => tracing::warn!(status = %status, "Unknown status in polls table, skipping"),
            }
            stats.total_polls += count as u64;
        }
        Ok(stats)
    }

    async fn mark_posts_used(&self, post_ids: &[String]) -> Result<()> {
        if post_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            INSERT INTO used_posts (post_id)
            SELECT unnest($1::TEXT[])
            ON CONFLICT (post_id) DO NOTHING
            "#,
        )
        .bind(post_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn used_posts(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT post_id FROM used_posts")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| Ok(row.try_get("post_id")?))
            .collect()
    }

    async fn clear_used_posts(&self) -> Result<()> {
        sqlx::query("DELETE FROM used_posts")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_settings(&self) -> Result<AppSettings> {
        let row = sqlx::query("SELECT data FROM app_settings WHERE id = TRUE")
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let data: serde_json::Value = row.try_get("data")?;
                serde_json::from_value(data).context("Invalid settings payload")
            }
            None => Ok(AppSettings::default()),
        }
    }

    async fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let data = serde_json::to_value(settings).context("Failed to serialize settings")?;
        sqlx::query(
            r#"
            INSERT INTO app_settings (id, data) VALUES (TRUE, $1)
            ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data
            "#,
        )
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
