//! In-memory store for tests. No database required.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use pollcycle_common::{AppSettings, PollRecord, PollStatistics, PollStatus};

use crate::store::PollStore;

#[derive(Default)]
struct Inner {
    polls: HashMap<String, PollRecord>,
    by_status: HashMap<PollStatus, HashSet<String>>,
    used_posts: HashSet<String>,
    settings: Option<AppSettings>,
}

/// Thread-safe in-memory PollStore. A single lock makes every status-index
/// move atomic to callers, and reads reconcile index membership against the
/// record's own `status` field, which is authoritative.
#[derive(Default)]
pub struct MemoryPollStore {
    inner: RwLock<Inner>,
}

impl MemoryPollStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corrupt the status index on purpose, to exercise reconciliation.
    #[cfg(test)]
    fn inject_index_entry(&self, status: PollStatus, id: &str) {
        let mut inner = self.inner.write().unwrap();
        inner
            .by_status
            .entry(status)
            .or_default()
            .insert(id.to_string());
    }
}

#[async_trait]
impl PollStore for MemoryPollStore {
    async fn save_poll(&self, poll: &PollRecord) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        for ids in inner.by_status.values_mut() {
            ids.remove(&poll.id);
        }
        inner
            .by_status
            .entry(poll.status)
            .or_default()
            .insert(poll.id.clone());
        inner.polls.insert(poll.id.clone(), poll.clone());
        Ok(())
    }

    async fn get_poll(&self, id: &str) -> Result<Option<PollRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.polls.get(id).cloned())
    }

    async fn delete_poll(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        for ids in inner.by_status.values_mut() {
            ids.remove(id);
        }
        Ok(inner.polls.remove(id).is_some())
    }

    async fn polls_by_status(&self, status: PollStatus) -> Result<Vec<PollRecord>> {
        let inner = self.inner.read().unwrap();
        let ids = match inner.by_status.get(&status) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        // The record is authoritative: ignore index entries whose record is
        // missing or disagrees about its status.
        let mut polls: Vec<PollRecord> = ids
            .iter()
            .filter_map(|id| inner.polls.get(id))
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(polls)
    }

    async fn list_polls(&self, page: u32, page_size: u32) -> Result<Vec<PollRecord>> {
        let inner = self.inner.read().unwrap();
        let mut polls: Vec<PollRecord> = inner.polls.values().cloned().collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let page = page.max(1) as usize;
        let page_size = page_size as usize;
        let offset = (page - 1) * page_size;
        Ok(polls.into_iter().skip(offset).take(page_size).collect())
    }

    async fn statistics(&self) -> Result<PollStatistics> {
        let inner = self.inner.read().unwrap();
        let mut stats = PollStatistics {
            total_polls: inner.polls.len() as u64,
            ..Default::default()
        };
        for status in PollStatus::ALL {
            let count = inner
                .by_status
                .get(&status)
                .map(|ids| ids.len() as u64)
                .unwrap_or(0);
            stats.set_count(status, count);
        }
        Ok(stats)
    }

    async fn mark_posts_used(&self, post_ids: &[String]) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.used_posts.extend(post_ids.iter().cloned());
        Ok(())
    }

    async fn used_posts(&self) -> Result<HashSet<String>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.used_posts.clone())
    }

    async fn clear_used_posts(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.used_posts.clear();
        Ok(())
    }

    async fn get_settings(&self) -> Result<AppSettings> {
        let inner = self.inner.read().unwrap();
        Ok(inner.settings.clone().unwrap_or_default())
    }

    async fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.settings = Some(settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pollcycle_common::{PollData, PollOption};

    fn record(question: &str) -> PollRecord {
        PollRecord::new(
            PollData {
                question: question.to_string(),
                options: vec![PollOption::new("Yes"), PollOption::new("No")],
                duration_hours: 24,
                hashtags: vec![],
                rationale: None,
            },
            vec!["post-1".to_string()],
        )
    }

    #[tokio::test]
    async fn save_and_get_round_trip() {
        let store = MemoryPollStore::new();
        let poll = record("Round trip?");
        store.save_poll(&poll).await.unwrap();

        let loaded = store.get_poll(&poll.id).await.unwrap().unwrap();
        assert_eq!(loaded.data.question, "Round trip?");
        assert_eq!(loaded.status, PollStatus::Pending);
    }

    #[tokio::test]
    async fn status_change_moves_index_membership() {
        let store = MemoryPollStore::new();
        let mut poll = record("Move me?");
        store.save_poll(&poll).await.unwrap();

        poll.status = PollStatus::Approved;
        store.save_poll(&poll).await.unwrap();

        let pending = store.polls_by_status(PollStatus::Pending).await.unwrap();
        assert!(pending.is_empty(), "old status set must be vacated");
        let approved = store.polls_by_status(PollStatus::Approved).await.unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].id, poll.id);
    }

    #[tokio::test]
    async fn stale_index_entry_is_reconciled_away() {
        let store = MemoryPollStore::new();
        let poll = record("Authoritative?");
        store.save_poll(&poll).await.unwrap();

        // Simulate a crash mid-transition: index says approved, record says
        // pending. The record must win.
        store.inject_index_entry(PollStatus::Approved, &poll.id);

        let approved = store.polls_by_status(PollStatus::Approved).await.unwrap();
        assert!(approved.is_empty());
        let pending = store.polls_by_status(PollStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_paginated() {
        let store = MemoryPollStore::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut poll = record(&format!("Q{i}?"));
            // Spread creation times so ordering is deterministic.
            poll.created_at = Utc::now() - Duration::minutes(5 - i);
            store.save_poll(&poll).await.unwrap();
            ids.push(poll.id.clone());
        }

        let page1 = store.list_polls(1, 2).await.unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].id, ids[4], "newest first");
        assert_eq!(page1[1].id, ids[3]);

        let page3 = store.list_polls(3, 2).await.unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].id, ids[0]);

        let beyond = store.list_polls(9, 2).await.unwrap();
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn statistics_track_index_sizes() {
        let store = MemoryPollStore::new();
        let mut a = record("A?");
        store.save_poll(&a).await.unwrap();
        let b = record("B?");
        store.save_poll(&b).await.unwrap();

        a.status = PollStatus::Rejected;
        store.save_poll(&a).await.unwrap();

        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.total_polls, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.posted, 0);
    }

    #[tokio::test]
    async fn delete_removes_record_and_index() {
        let store = MemoryPollStore::new();
        let poll = record("Gone?");
        store.save_poll(&poll).await.unwrap();

        assert!(store.delete_poll(&poll.id).await.unwrap());
        assert!(!store.delete_poll(&poll.id).await.unwrap());
        assert!(store.get_poll(&poll.id).await.unwrap().is_none());
        let pending = store.polls_by_status(PollStatus::Pending).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn used_posts_accumulate_and_clear() {
        let store = MemoryPollStore::new();
        store
            .mark_posts_used(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        store.mark_posts_used(&["b".to_string()]).await.unwrap();

        let used = store.used_posts().await.unwrap();
        assert_eq!(used.len(), 2);

        store.clear_used_posts().await.unwrap();
        assert!(store.used_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn settings_default_until_saved() {
        let store = MemoryPollStore::new();
        let defaults = store.get_settings().await.unwrap();
        assert_eq!(defaults.hashtags, vec!["#uspol"]);

        let mut settings = AppSettings::default();
        settings.hashtags = vec!["#rustlang".to_string()];
        store.save_settings(&settings).await.unwrap();

        let loaded = store.get_settings().await.unwrap();
        assert_eq!(loaded.hashtags, vec!["#rustlang"]);
    }
}
