//! Hot-reloadable application settings.
//!
//! Unlike [`Config`](crate::Config), which holds secrets and endpoints from
//! the environment, these settings live in the store and are re-read at the
//! start of every pipeline stage, so moderators can retune the watchlist or
//! the prompt between cycles without a restart.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PROMPT_TEMPLATE: &str = r##"Analyze the following Mastodon posts about current events and news:

{posts}

Based on these posts, generate poll topics that would engage the community. For each poll:
1. Create a clear, concise question
2. Provide 2-4 answer options
3. Focus on current events, news, or political topics mentioned in the posts
4. Make the poll balanced and non-partisan

Return your response as a JSON array of poll objects with this structure:
[
  {
    "question": "Poll question here?",
    "options": ["Option 1", "Option 2", "Option 3"],
    "hashtags": ["#topic"],
    "reasoning": "Brief explanation of why this poll is relevant"
  }
]

Generate up to 5 poll ideas.
"##;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Hashtags to watch. Also the fallback pool for composed poll hashtags.
    pub hashtags: Vec<String>,
    /// Maximum posts fetched per hashtag, clamped to [10, 500] at use.
    pub post_limit: u32,
    /// Posts older than this many hours are dropped by the filter.
    pub time_window_hours: i64,
    /// Author handles whose posts are never used (case-insensitive,
    /// with or without a leading `@`).
    pub excluded_accounts: Vec<String>,
    /// Skip posts already consumed as grounding evidence.
    pub exclude_used_posts: bool,
    /// Prompt template; `{posts}` is replaced with the formatted batch.
    pub poll_prompt_template: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            hashtags: vec!["#uspol".to_string()],
            post_limit: 100,
            time_window_hours: 24,
            excluded_accounts: Vec::new(),
            exclude_used_posts: true,
            poll_prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 1500,
        }
    }
}

impl AppSettings {
    /// Post limit clamped to the range the fetch API tolerates.
    pub fn effective_post_limit(&self) -> u32 {
        self.post_limit.clamp(10, 500)
    }

    /// Load settings from a TOML seed file (operator bootstrap path).
    pub fn from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let settings: AppSettings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
        Ok(settings)
    }
}
