//! The PollStore trait.
//!
//! Implemented by PgPollStore (production — postgres) and MemoryPollStore
//! (tests). Also implemented for `Arc<S>` so one store can be shared
//! between the orchestrator and the lifecycle controller.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use pollcycle_common::{AppSettings, PollRecord, PollStatistics, PollStatus};

/// Persistence boundary for poll records, the used-post set, and settings.
///
/// Invariant held by every implementation: a record belongs to exactly one
/// status collection at a time, and the record's own `status` field is
/// authoritative over any derived index.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Upsert a record. A status change atomically (from the caller's
    /// perspective) moves the record between status collections.
    async fn save_poll(&self, poll: &PollRecord) -> Result<()>;

    async fn get_poll(&self, id: &str) -> Result<Option<PollRecord>>;

    /// Remove a record and its index membership. Returns false when the id
    /// was not present. Lifecycle rules are enforced upstream, not here.
    async fn delete_poll(&self, id: &str) -> Result<bool>;

    /// All records currently in `status`, newest first.
    async fn polls_by_status(&self, status: PollStatus) -> Result<Vec<PollRecord>>;

    /// Paginated listing across all statuses, newest first. `page` is
    /// 1-indexed.
    async fn list_polls(&self, page: u32, page_size: u32) -> Result<Vec<PollRecord>>;

    /// Total and per-status counts, derived from the status index.
    async fn statistics(&self) -> Result<PollStatistics>;

    // --- Used-post tracking ---

    async fn mark_posts_used(&self, post_ids: &[String]) -> Result<()>;

    async fn used_posts(&self) -> Result<HashSet<String>>;

    /// Maintenance reset of the used-post set.
    async fn clear_used_posts(&self) -> Result<()>;

    // --- Settings ---

    /// Stored settings, or defaults when none were saved yet.
    async fn get_settings(&self) -> Result<AppSettings>;

    async fn save_settings(&self, settings: &AppSettings) -> Result<()>;
}

#[async_trait]
impl<S: PollStore + ?Sized> PollStore for Arc<S> {
    async fn save_poll(&self, poll: &PollRecord) -> Result<()> {
        (**self).save_poll(poll).await
    }

    async fn get_poll(&self, id: &str) -> Result<Option<PollRecord>> {
        (**self).get_poll(id).await
    }

    async fn delete_poll(&self, id: &str) -> Result<bool> {
        (**self).delete_poll(id).await
    }

    async fn polls_by_status(&self, status: PollStatus) -> Result<Vec<PollRecord>> {
        (**self).polls_by_status(status).await
    }

    async fn list_polls(&self, page: u32, page_size: u32) -> Result<Vec<PollRecord>> {
        (**self).list_polls(page, page_size).await
    }

    async fn statistics(&self) -> Result<PollStatistics> {
        (**self).statistics().await
    }

    async fn mark_posts_used(&self, post_ids: &[String]) -> Result<()> {
        (**self).mark_posts_used(post_ids).await
    }

    async fn used_posts(&self) -> Result<HashSet<String>> {
        (**self).used_posts().await
    }

    async fn clear_used_posts(&self) -> Result<()> {
        (**self).clear_used_posts().await
    }

    async fn get_settings(&self) -> Result<AppSettings> {
        (**self).get_settings().await
    }

    async fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        (**self).save_settings(settings).await
    }
}
