// Trait abstractions for the pipeline's external collaborators.
//
// PostSource — fetches hashtag timelines (Mastodon in production).
// CandidateGenerator — one LLM call in, raw text out; shape parsing
//   stays in the core (see generate.rs).
// PollPublisher — posts an approved poll back to the network.
//
// These enable deterministic testing with static sources and canned
// generator output: no network, no API keys. `cargo test` in seconds.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use llm_client::OpenAiClient;
use mastodon_client::{MastodonClient, Status};
use pollcycle_common::{AppSettings, Post};

// ---------------------------------------------------------------------------
// PostSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch recent posts for one hashtag (leading `#` optional).
    async fn posts_for_hashtag(&self, hashtag: &str, limit: u32) -> Result<Vec<Post>>;
}

#[async_trait]
impl<T: PostSource + ?Sized> PostSource for Arc<T> {
    async fn posts_for_hashtag(&self, hashtag: &str, limit: u32) -> Result<Vec<Post>> {
        (**self).posts_for_hashtag(hashtag, limit).await
    }
}

#[async_trait]
impl PostSource for MastodonClient {
    async fn posts_for_hashtag(&self, hashtag: &str, limit: u32) -> Result<Vec<Post>> {
        let statuses = self.timeline_hashtag(hashtag, limit).await?;
        Ok(statuses.into_iter().map(status_to_post).collect())
    }
}

/// Normalize a raw API status into the pipeline's Post shape: lowercase
/// author handle, UTC timestamp (or None when unparseable — the filter
/// fails open on those), plain tag names.
pub fn status_to_post(status: Status) -> Post {
    let handle = if status.account.acct.is_empty() {
        status.account.username
    } else {
        status.account.acct
    };
    Post {
        id: status.id,
        body: status.content,
        created_at: status.created_at.as_deref().and_then(parse_timestamp),
        url: status.url,
        author: handle.trim_start_matches('@').to_lowercase(),
        tags: status.tags.into_iter().map(|t| t.name).collect(),
    }
}

/// Lenient timestamp parse: RFC 3339 first, then a couple of common naive
/// layouts treated as UTC. Returns None rather than guessing.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// CandidateGenerator
// ---------------------------------------------------------------------------

/// Generation tunables, snapshotted from settings at each cycle.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            model: settings.llm_model.clone(),
            temperature: settings.llm_temperature,
            max_tokens: settings.llm_max_tokens,
        }
    }
}

#[async_trait]
pub trait CandidateGenerator: Send + Sync {
    /// Run one completion and return the raw response text.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &GenerationParams,
    ) -> Result<String>;
}

#[async_trait]
impl CandidateGenerator for OpenAiClient {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &GenerationParams,
    ) -> Result<String> {
        self.complete_json(
            &params.model,
            system_prompt,
            user_prompt,
            params.temperature,
            params.max_tokens,
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// PollPublisher
// ---------------------------------------------------------------------------

/// What a successful publish hands back for the record.
#[derive(Debug, Clone)]
pub struct PublishedPoll {
    pub poll_ref: Option<String>,
    pub url: Option<String>,
}

#[async_trait]
pub trait PollPublisher: Send + Sync {
    /// Post `status_text` with an attached single-choice poll.
    async fn publish(
        &self,
        status_text: &str,
        options: &[String],
        duration_hours: i64,
    ) -> Result<PublishedPoll>;
}

#[async_trait]
impl PollPublisher for MastodonClient {
    async fn publish(
        &self,
        status_text: &str,
        options: &[String],
        duration_hours: i64,
    ) -> Result<PublishedPoll> {
        let expires_in_seconds = duration_hours.max(1) as u64 * 3600;
        let status = self
            .post_poll(status_text, options.to_vec(), expires_in_seconds)
            .await?;
        Ok(PublishedPoll {
            poll_ref: status.poll.map(|p| p.id),
            url: status.url,
        })
    }
}
