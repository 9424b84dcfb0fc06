//! The news-cycle orchestrator: fetch → filter → generate → build.
//!
//! Each run goes to completion or stops at the first failing stage; the
//! outcome is always a CycleReport, never an error — retry policy belongs
//! to whatever scheduled the cycle.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use pollcycle_common::AppSettings;
use pollcycle_store::PollStore;

use crate::builder::build_candidate;
use crate::filter::{filter_posts, FilterOutcome};
use crate::generate::{build_prompt, parse_candidates, SYSTEM_PROMPT};
use crate::traits::{CandidateGenerator, GenerationParams, PostSource};

/// Pipeline stage names for failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Generate,
    Build,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => f.write_str("fetch"),
            Self::Generate => f.write_str("generate"),
            Self::Build => f.write_str("build"),
        }
    }
}

/// Outcome of one cycle run.
#[derive(Debug)]
pub struct CycleReport {
    pub success: bool,
    pub stage: Option<Stage>,
    pub error: Option<String>,
    /// Eligible posts forwarded to generation.
    pub posts_fetched: u32,
    /// Posts dropped by the filter.
    pub posts_filtered: u32,
    pub polls_generated: u32,
    pub poll_ids: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl CycleReport {
    fn failed(stage: Stage, error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            stage: Some(stage),
            error: Some(error.to_string()),
            posts_fetched: 0,
            posts_filtered: 0,
            polls_generated: 0,
            poll_ids: Vec::new(),
            completed_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== News Cycle Complete ===")?;
        writeln!(f, "Success:         {}", self.success)?;
        if let Some(stage) = self.stage {
            writeln!(f, "Failed stage:    {stage}")?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "Error:           {error}")?;
        }
        writeln!(f, "Posts eligible:  {}", self.posts_fetched)?;
        writeln!(f, "Posts filtered:  {}", self.posts_filtered)?;
        writeln!(f, "Polls generated: {}", self.polls_generated)?;
        for id in &self.poll_ids {
            writeln!(f, "  {id}")?;
        }
        Ok(())
    }
}

pub struct CycleRunner<S, F, G> {
    store: S,
    source: F,
    generator: G,
    bot_handle: String,
}

impl<S, F, G> CycleRunner<S, F, G>
where
    S: PollStore,
    F: PostSource,
    G: CandidateGenerator,
{
    pub fn new(store: S, source: F, generator: G, bot_handle: impl Into<String>) -> Self {
        Self {
            store,
            source,
            generator,
            bot_handle: bot_handle.into(),
        }
    }

    /// Run one cycle. Settings are re-read from the store every run so
    /// watchlist or prompt changes apply without a restart; the overrides
    /// take precedence for this run only.
    pub async fn run(
        &self,
        hashtags_override: Option<Vec<String>>,
        post_limit_override: Option<u32>,
    ) -> CycleReport {
        let mut settings = match self.store.get_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Failed to load settings, using defaults");
                AppSettings::default()
            }
        };
        if let Some(hashtags) = hashtags_override {
            settings.hashtags = hashtags;
        }
        if let Some(limit) = post_limit_override {
            settings.post_limit = limit;
        }

        // --- Fetch ---
        let limit = settings.effective_post_limit();
        let mut raw_posts = Vec::new();
        for hashtag in &settings.hashtags {
            match self.source.posts_for_hashtag(hashtag, limit).await {
                Ok(mut posts) => {
                    info!(hashtag = %hashtag, count = posts.len(), "Fetched posts");
                    raw_posts.append(&mut posts);
                }
                Err(e) => {
                    error!(hashtag = %hashtag, error = %e, "Fetching posts failed");
                    return CycleReport::failed(Stage::Fetch, e);
                }
            }
        }
        // A post can surface under several watched hashtags; keep the first.
        let mut seen_ids = HashSet::new();
        raw_posts.retain(|post| seen_ids.insert(post.id.clone()));

        // --- Filter ---
        let used = if settings.exclude_used_posts {
            match self.store.used_posts().await {
                Ok(used) => used,
                Err(e) => {
                    warn!(error = %e, "Failed to load used posts, proceeding without exclusion");
                    HashSet::new()
                }
            }
        } else {
            HashSet::new()
        };

        let FilterOutcome { eligible, filtered } =
            filter_posts(raw_posts, &settings, &used, &self.bot_handle);
        info!(eligible = eligible.len(), filtered, "Filtered post batch");

        if eligible.is_empty() {
            return CycleReport {
                success: true,
                stage: None,
                error: None,
                posts_fetched: 0,
                posts_filtered: filtered,
                polls_generated: 0,
                poll_ids: Vec::new(),
                completed_at: Utc::now(),
            };
        }

        // --- Generate ---
        let prompt = build_prompt(&eligible, &settings.poll_prompt_template);
        let params = GenerationParams::from_settings(&settings);
        let response = match self.generator.generate(SYSTEM_PROMPT, &prompt, &params).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Generation call failed");
                let mut report = CycleReport::failed(Stage::Generate, e);
                report.posts_fetched = eligible.len() as u32;
                report.posts_filtered = filtered;
                return report;
            }
        };
        let (candidates, shape) = match parse_candidates(&response) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, "Generation output unparseable");
                let mut report = CycleReport::failed(Stage::Generate, e);
                report.posts_fetched = eligible.len() as u32;
                report.posts_filtered = filtered;
                return report;
            }
        };
        info!(count = candidates.len(), shape = %shape, "Parsed generation output");

        // --- Build ---
        let mut poll_ids = Vec::new();
        for raw_candidate in candidates {
            let Some(record) = build_candidate(raw_candidate, &eligible, &settings) else {
                debug!("Candidate rejected by validation");
                continue;
            };

            if let Err(e) = self.store.save_poll(&record).await {
                error!(poll_id = %record.id, error = %e, "Failed to save poll, dropping candidate");
                continue;
            }

            // Quality, not correctness: a failure here only risks duplicate
            // grounding in a later cycle.
            if let Err(e) = self.store.mark_posts_used(&record.grounding_post_ids).await {
                warn!(poll_id = %record.id, error = %e, "Failed to mark grounding posts used");
            }

            poll_ids.push(record.id);
        }

        info!(polls = poll_ids.len(), "News cycle complete");
        CycleReport {
            success: true,
            stage: None,
            error: None,
            posts_fetched: eligible.len() as u32,
            posts_filtered: filtered,
            polls_generated: poll_ids.len() as u32,
            poll_ids,
            completed_at: Utc::now(),
        }
    }
}
